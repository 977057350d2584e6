use base::prelude::*;

use crate::control::{After, Machine};
use crate::flags::Flags;

/// ## Programmed operators
///
/// Opcodes 000 through 077 trap through location 40: the processor
/// stores the offending instruction word there and executes the word
/// at 41 in its place.  Codes 040 through 077 (and code 000) are
/// always an executive-mode trap; 001 through 037 are local
/// operators, stored through the user map when user mode is on.  On
/// the KI10 the monitor set additionally saves and reloads the whole
/// PC word through the user process table.
impl Machine {
    /// Opcodes 000-077.
    pub(super) fn op_uuo(&mut self) -> After {
        if self.ir == 0 || self.ir >= 0o040 {
            self.uuo_cycle = true;
        }
        self.f_pc_inh = true;
        self.trap_uuo()
    }

    /// Monitor UUOs: opcode 100 and, on the KI10, the codes the
    /// hardware does not implement.
    pub(super) fn op_muuo(&mut self) -> After {
        self.uuo_cycle = true;
        self.f_pc_inh = true;
        self.trap_uuo()
    }

    /// Unassigned codes.  The KA10 stores them at 60 and executes
    /// the word at 61; the KI10 hands them to the monitor.
    pub(super) fn op_unassigned(&mut self) -> After {
        if self.is_ki() {
            return self.op_muuo();
        }
        self.mb = (self.ir << 27) | (self.ac << 23) | self.ab;
        self.ab = 0o60;
        self.uuo_cycle = true;
        let _ = self.mem_write(true);
        self.ab += 1;
        self.f_load_pc = false;
        self.f_pc_inh = true;
        After::Store
    }

    /// Common trap tail.  Entered with the PC treatment already
    /// decided by the caller; JRST re-enters here directly when a
    /// user program tries HALT or JEN.
    pub(super) fn trap_uuo(&mut self) -> After {
        self.mb = (self.ir << 27) | (self.ac << 23) | self.ab;
        if self.is_ki() && (self.ir == 0 || self.ir & 0o40 != 0) {
            // Monitor UUO: old PC word to the user process table,
            // new PC word from it.  The new flags OR over the old.
            self.ab = self.pager.ub_ptr | 0o424;
            self.uuo_cycle = true;
            let _ = self.mem_write(true);
            self.ab |= 1;
            self.mb = self.flags.pc_word(self.pc + 1);
            let _ = self.mem_write(true);
            self.ab = self.pager.ub_ptr | 0o430;
            if self.flags.trap_pending() {
                self.ab |= 1;
            }
            if self.flags.user() {
                self.ab |= 2;
            }
            if self.flags.public() {
                self.ab |= 4;
            }
            let _ = self.mem_read(true);
            self.flags.merge(Flags::from_pc_word(self.mb));
            self.pc = self.mb & RMASK;
            self.f_pc_inh = true;
            return After::Store;
        }
        self.ab = if self.is_ki() && !self.flags.user() {
            self.pager.eb_ptr | 0o40
        } else {
            0o40
        };
        let _ = self.mem_write(self.uuo_cycle);
        self.ab += 1;
        self.f_load_pc = false;
        After::Store
    }
}
