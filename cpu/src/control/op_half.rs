use base::prelude::*;

use crate::control::{After, Machine};

/// ## Halfword transfers
///
/// Opcodes 500-577.  The operand profile has already put the source
/// halfword in place (swapped for the 504/514/... columns), so each
/// row only merges, clears, sets or sign-extends the other half.
impl Machine {
    pub(super) fn op_halfword(&mut self) -> After {
        match self.ir & 0o770 {
            0o500 => self.ar = (self.ar & LMASK) | (self.br & RMASK),
            0o510 => self.ar &= LMASK,
            0o520 => self.ar = (self.ar & LMASK) | RMASK,
            0o530 => {
                let ad = if self.ar & SMASK != 0 { RMASK } else { 0 };
                self.ar = (self.ar & LMASK) | ad;
            }
            0o540 => self.ar = (self.br & LMASK) | (self.ar & RMASK),
            0o550 => self.ar &= RMASK,
            0o560 => self.ar = LMASK | (self.ar & RMASK),
            _ => {
                let ad = if self.ar & LSIGN != 0 { LMASK } else { 0 };
                self.ar = ad | (self.ar & RMASK);
            }
        }
        After::Store
    }
}
