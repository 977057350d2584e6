use base::prelude::*;

use crate::control::{After, Machine};

/// ## Boolean operations
///
/// Opcodes 400-477, all sixteen functions of two variables.  Bits 3
/// and 4 of the opcode select the function; the mode columns are
/// pure profile.
impl Machine {
    pub(super) fn op_boolean(&mut self) -> After {
        match (self.ir >> 2) & 0o17 {
            0 => self.ar = 0,                                 // SETZ
            1 => self.ar &= self.br,                          // AND
            2 => self.ar &= cm(self.br),                      // ANDCA
            3 => {}                                           // SETM
            4 => self.ar = cm(self.ar) & self.br,             // ANDCM
            5 => self.ar = self.br,                           // SETA
            6 => self.ar ^= self.br,                          // XOR
            7 => self.ar = cm(cm(self.ar) & cm(self.br)),     // IOR
            8 => self.ar = cm(self.ar) & cm(self.br),         // ANDCB
            9 => self.ar = cm(self.ar ^ self.br),             // EQV
            10 => self.ar = cm(self.br),                      // SETCA
            11 => self.ar = cm(cm(self.ar) & self.br),        // ORCA
            12 => self.ar = cm(self.ar),                      // SETCM
            13 => self.ar = cm(self.ar & cm(self.br)),        // ORCM
            14 => self.ar = cm(self.ar & self.br),            // ORCB
            _ => self.ar = FMASK,                             // SETO
        }
        After::Store
    }
}
