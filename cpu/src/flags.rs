//! The processor flags.
//!
//! The thirteen flags live in bits 0 through 12 of a PC word (the
//! word stored by JSR and friends, and restored by JRSTF), so a flag
//! value here must be shifted left 23 places to land in a stored
//! 36-bit word.  The engine reads and writes flags through the named
//! accessors on [`Flags`]; the mask constants document the
//! guest-visible bit layout and serve the encode/decode boundary (PC
//! words, the APR CONI word, trace output).
use base::word::RMASK;

/// Arithmetic overflow (also set by trap-producing conditions).
pub const OV: u32 = 0o10_000;
/// Carry out of bit 0.
pub const CRY0: u32 = 0o04_000;
/// Carry out of bit 1.
pub const CRY1: u32 = 0o02_000;
/// Floating overflow.
pub const FOV: u32 = 0o01_000;
/// First part done; set between the two halves of an interrupted
/// byte instruction.
pub const FPD: u32 = 0o00_400;
/// User mode.
pub const USER: u32 = 0o00_200;
/// User in-out: IO instructions stay legal in user mode.
pub const USERIO: u32 = 0o00_100;
/// Public mode (KI10 only).
pub const PUBLIC: u32 = 0o00_040;
/// Address failure inhibit (KI10 only).
pub const AFI: u32 = 0o00_020;
/// Trap 2, pushdown overflow (KI10 only).
pub const TRP2: u32 = 0o00_010;
/// Trap 1, arithmetic overflow trap (KI10 only).
pub const TRP1: u32 = 0o00_004;
/// Floating underflow.
pub const FXU: u32 = 0o00_002;
/// No divide: a division was abandoned.
pub const DCK: u32 = 0o00_001;

/// All thirteen flag bits.
pub const MASK: u32 = 0o17_777;

/// Shift distance from the right-justified flag value to its home in
/// the left half of a stored PC word.
pub const WORD_SHIFT: u32 = 23;

/// The arithmetic flags an add-class instruction reports afresh.
const ARITH: u32 = OV | CRY0 | CRY1;

/// The flags JRSTF replaces wholesale from the stored word.
const RESTORED: u32 = OV | CRY0 | CRY1 | FOV | FPD | FXU | DCK;

/// The flag register.
///
/// A value type: the [`Machine`](crate::Machine) holds one and hands
/// out copies.  Single flags are read with the predicates and written
/// with the setters; the grouped operations the instruction set
/// performs as a unit (clearing the arithmetic flags, storing and
/// restoring PC words) each have one method so their composition is
/// written down exactly once.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flags(u32);

impl Flags {
    /// The raw 13-bit value, right justified, laid out per the mask
    /// constants in this module.
    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Flags {
        Flags(bits & MASK)
    }

    pub const fn is_clear(self) -> bool {
        self.0 == 0
    }

    pub const fn overflow(self) -> bool {
        self.0 & OV != 0
    }

    pub const fn carry0(self) -> bool {
        self.0 & CRY0 != 0
    }

    pub const fn carry1(self) -> bool {
        self.0 & CRY1 != 0
    }

    pub const fn float_overflow(self) -> bool {
        self.0 & FOV != 0
    }

    pub const fn float_underflow(self) -> bool {
        self.0 & FXU != 0
    }

    pub const fn no_divide(self) -> bool {
        self.0 & DCK != 0
    }

    pub const fn first_part_done(self) -> bool {
        self.0 & FPD != 0
    }

    pub const fn user(self) -> bool {
        self.0 & USER != 0
    }

    pub const fn user_io(self) -> bool {
        self.0 & USERIO != 0
    }

    /// User mode without in-out privileges: the state in which the
    /// privileged instructions trap.
    pub const fn user_without_io(self) -> bool {
        self.0 & (USER | USERIO) == USER
    }

    pub const fn public(self) -> bool {
        self.0 & PUBLIC != 0
    }

    pub const fn trap1(self) -> bool {
        self.0 & TRP1 != 0
    }

    pub const fn trap2(self) -> bool {
        self.0 & TRP2 != 0
    }

    /// Either trap arm is up.
    pub const fn trap_pending(self) -> bool {
        self.0 & (TRP1 | TRP2) != 0
    }

    pub fn set_overflow(&mut self) {
        self.0 |= OV;
    }

    pub fn clear_overflow(&mut self) {
        self.0 &= !OV;
    }

    pub fn set_carry0(&mut self) {
        self.0 |= CRY0;
    }

    pub fn set_carry1(&mut self) {
        self.0 |= CRY1;
    }

    pub fn clear_float_overflow(&mut self) {
        self.0 &= !FOV;
    }

    pub fn set_float_underflow(&mut self) {
        self.0 |= FXU;
    }

    pub fn set_no_divide(&mut self) {
        self.0 |= DCK;
    }

    pub fn set_trap1(&mut self) {
        self.0 |= TRP1;
    }

    pub fn set_trap2(&mut self) {
        self.0 |= TRP2;
    }

    pub fn set_first_part_done(&mut self) {
        self.0 |= FPD;
    }

    pub fn clear_first_part_done(&mut self) {
        self.0 &= !FPD;
    }

    pub fn set_user(&mut self) {
        self.0 |= USER;
    }

    pub fn clear_user(&mut self) {
        self.0 &= !USER;
    }

    pub fn clear_user_io(&mut self) {
        self.0 &= !USERIO;
    }

    pub fn clear_public(&mut self) {
        self.0 &= !PUBLIC;
    }

    /// An add-class instruction clears the arithmetic flags before
    /// reporting new ones.
    pub fn start_arithmetic(&mut self) {
        self.0 &= !ARITH;
    }

    /// Overflow that also arms the KI10 arithmetic trap.
    pub fn set_overflow_trap(&mut self) {
        self.0 |= OV | TRP1;
    }

    /// Floating overflow raises OV and FOV and arms the trap.
    pub fn set_float_overflow_trap(&mut self) {
        self.0 |= OV | FOV | TRP1;
    }

    /// Storing a PC word clears first-part-done, the address failure
    /// inhibit and both trap arms.
    pub fn clear_on_pc_store(&mut self) {
        self.0 &= !(FPD | AFI | TRP1 | TRP2);
    }

    /// Pack above `addr` into a full PC word.
    pub fn pc_word(self, addr: u64) -> u64 {
        (u64::from(self.0) << WORD_SHIFT) | (addr & RMASK)
    }

    /// The flag half of a stored PC word.
    pub fn from_pc_word(word: u64) -> Flags {
        Flags(((word >> WORD_SHIFT) as u32) & MASK)
    }

    /// OR another flag set in; the KI10 monitor-UUO entry merges the
    /// new PC word's flags over the old ones.
    pub fn merge(&mut self, other: Flags) {
        self.0 |= other.0;
    }

    /// JFCL: test the four arithmetic flags selected by the AC field,
    /// clear them, and report whether any was set.
    pub fn test_and_clear_selected(&mut self, selector: u32) -> bool {
        let mask = (selector & 0o17) << 9;
        let hit = self.0 & mask != 0;
        self.0 &= !mask;
        hit
    }

    /// JRSTF: replace the arithmetic and byte-phase flags from a
    /// stored PC word.  Only executive mode may set USER and USERIO,
    /// but anyone may clear USERIO.
    pub fn restore_from_pc_word(&mut self, word: u64) {
        let new = Flags::from_pc_word(word);
        self.0 &= !RESTORED;
        if !self.user() {
            self.0 |= new.0 & (USER | USERIO);
        }
        if !new.user_io() {
            self.0 &= !USERIO;
        }
        self.0 |= new.0 & RESTORED;
    }
}

const NAMES: [(u32, &str); 13] = [
    (OV, "OV"),
    (CRY0, "CRY0"),
    (CRY1, "CRY1"),
    (FOV, "FOV"),
    (FPD, "FPD"),
    (USER, "USER"),
    (USERIO, "USERIO"),
    (PUBLIC, "PUBLIC"),
    (AFI, "AFI"),
    (TRP2, "TRP2"),
    (TRP1, "TRP1"),
    (FXU, "FXU"),
    (DCK, "DCK"),
];

/// Names of the flags set in `flags`, most significant first, for
/// trace output and history listings.
pub fn describe(flags: u32) -> String {
    let mut out = String::new();
    for (bit, name) in NAMES {
        if flags & bit != 0 {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(name);
        }
    }
    out
}
