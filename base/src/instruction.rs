//! Binary representation of PDP-10 instructions.
//!
//! An instruction occupies a 36-bit word.  The fields look like this
//! (most significant bit on the left, bits numbered 0 to 35 from the
//! left as in the processor reference manual):
//!
//! |Opcode |AC     |Indirect|Index  |Address (Y)|
//! |-------|-------|--------|-------|-----------|
//! |9 bits |4 bits |1 bit   |4 bits |18 bits    |
//! |(0-8)  |(9-12) |(13)    |(14-17)|(18-35)    |
//!
//! In-out instructions (opcodes 700 through 777) reinterpret the
//! opcode and AC fields:
//!
//! |111  |Device |IO op  |Indirect|Index  |Address (Y)|
//! |-----|-------|-------|--------|-------|-----------|
//! |(0-2)|(3-9)  |(10-12)|(13)    |(14-17)|(18-35)    |
//!
//! The device field selects one of 128 device codes (the manual
//! writes them as multiples of 4, so device 0004 is field value 1);
//! the three-bit IO op selects BLKI, DATAI, BLKO, DATAO, CONO, CONI,
//! CONSZ or CONSO.

use std::fmt::{self, Debug, Display, Formatter};

use serde::Serialize;

use super::word;

/// Bit 13, the indirect ("@") bit.
pub const IND_BIT: u64 = 0o20_000_000;

/// A machine instruction, newly fetched and undecoded.
#[derive(Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Instruction(u64);

impl Instruction {
    pub fn from_word(w: u64) -> Instruction {
        Instruction(w & word::FMASK)
    }

    pub fn word(&self) -> u64 {
        self.0
    }

    /// The 9-bit operation code.
    pub fn opcode(&self) -> u64 {
        (self.0 >> 27) & 0o777
    }

    /// The 4-bit accumulator field.
    pub fn ac(&self) -> u64 {
        (self.0 >> 23) & 0o17
    }

    /// True when the indirect bit is set.
    pub fn is_indirect(&self) -> bool {
        self.0 & IND_BIT != 0
    }

    /// The 4-bit index register field; 0 means no indexing.
    pub fn index(&self) -> u64 {
        (self.0 >> 18) & 0o17
    }

    /// The 18-bit address field, Y.
    pub fn address(&self) -> u64 {
        self.0 & word::RMASK
    }

    /// True for the in-out opcodes 700 through 777.
    pub fn is_io(&self) -> bool {
        self.opcode() & 0o700 == 0o700
    }

    /// The 7-bit device field of an in-out instruction, straddling
    /// the opcode and AC fields.
    pub fn io_device(&self) -> u64 {
        ((self.opcode() & 0o77) << 1) | ((self.ac() >> 3) & 1)
    }

    /// The 3-bit operation field of an in-out instruction.
    pub fn io_op(&self) -> u64 {
        self.ac() & 0o7
    }
}

impl Debug for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Instruction {{ opcode: {:03o}, ac: {:02o}, i: {}, x: {:02o}, y: {:06o} }}",
            self.opcode(),
            self.ac(),
            u8::from(self.is_indirect()),
            self.index(),
            self.address()
        )
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:012o}", self.0)
    }
}

impl From<u64> for Instruction {
    fn from(w: u64) -> Instruction {
        Instruction::from_word(w)
    }
}
