use base::prelude::*;
use base::word::PMASK;

use crate::control::{After, Machine};

/// ## Byte instructions
///
/// Opcodes 133-137.  A byte instruction runs in up to three passes
/// through the execute cycle: pointer increment, shift count setup,
/// then the load or deposit once the word under the pointer has been
/// fetched.  The first-part-done flag marks an increment that has
/// already happened so an interrupt between passes cannot bump the
/// pointer twice.
impl Machine {
    pub(super) fn op_byte(&mut self) -> After {
        if matches!(self.ir & 0o7, 3 | 4 | 6) && !self.flags.first_part_done() {
            // Step the position field down by the byte size, moving
            // to the next word when the byte no longer fits.
            self.sc = ((self.ar >> 24) & 0o77) as i32;
            let scad = ((((self.ar >> 30) & 0o77) as i32) + (0o777 ^ self.sc) + 1) & 0o777;
            if scad & 0o400 != 0 {
                self.sc = ((0o777 ^ (((self.ar >> 24) & 0o77) as i32)) + 0o44 + 1) & 0o777;
                if self.is_ki() {
                    self.ar = (self.ar & LMASK) | ((self.ar + 1) & RMASK);
                } else {
                    self.ar = (self.ar + 1) & FMASK;
                }
            } else {
                self.sc = scad;
            }
            self.ar &= PMASK;
            self.ar |= ((self.sc & 0o77) as u64) << 30;
            if self.ir & 0o4 == 0 {
                // IBP adjusts the pointer and nothing else.
                return After::Store;
            }
        }
        if !self.flags.first_part_done() || !self.byf5 {
            // Hold the shift count and mask, then come around again
            // to fetch the word the pointer addresses.
            self.sc = ((self.ar >> 30) & 0o77) as i32;
            self.mq = (1u64 << (0o77 & (self.ar >> 24))) - 1;
            self.sc = ((0o777 ^ self.sc) + 1) & 0o777;
            self.f_load_pc = false;
            self.f_inst_fetch = false;
            self.f_pc_inh = true;
            self.flags.set_first_part_done();
            self.byf5 = true;
            return After::Store;
        }
        if self.ir & 0o6 == 4 {
            // ILDB, LDB
            self.ar = self.mb;
            while self.sc != 0 {
                self.ar >>= 1;
                self.sc = (self.sc + 1) & 0o777;
            }
            self.ar &= self.mq;
            let byte = self.ar;
            self.set_reg(self.ac, byte, false);
        } else {
            // IDPB, DPB
            self.br = self.mb;
            self.ar = self.get_reg(self.ac) & self.mq;
            while self.sc != 0 {
                self.ar <<= 1;
                self.mq <<= 1;
                self.sc = (self.sc + 1) & 0o777;
            }
            self.br &= cm(self.mq);
            self.ar &= FMASK;
            self.br |= self.ar & self.mq;
            self.mb = self.br;
            let _ = self.mem_write(false);
        }
        self.flags.clear_first_part_done();
        self.byf5 = false;
        After::Store
    }
}
