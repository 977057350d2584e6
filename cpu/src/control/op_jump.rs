use base::prelude::*;
use base::word::{add_one_both, add_one_both_halves, sub_one_both, sub_one_both_halves};

use crate::control::{After, Machine};
use crate::stop::StopReason;

/// ## Jumps and the push-down stack
///
/// Opcodes 252-267 plus JFCL, XCT and MAP.  Stack pointers count in
/// both halves at once; the KA10 lets a carry ripple across the
/// half boundary while the KI10 keeps the halves separate.  A carry
/// out of the left half signals pushdown overflow either way.
impl Machine {
    /// Increment both halves of a stack or loop pointer.
    pub(super) fn aob(&self, w: u64) -> u64 {
        if self.is_ki() {
            add_one_both_halves(w)
        } else {
            add_one_both(w)
        }
    }

    /// Decrement both halves of a stack pointer.
    pub(super) fn sob(&self, w: u64) -> u64 {
        if self.is_ki() {
            sub_one_both_halves(w)
        } else {
            sub_one_both(w)
        }
    }

    fn push_overflow(&mut self) {
        self.push_ovf = true;
        if self.is_ki() {
            self.flags.set_trap2();
        }
        self.check_apr_irq();
    }

    /// Opcodes 252 and 253: AOBJP and AOBJN.
    pub(super) fn op_aobj(&mut self) -> After {
        self.ar = self.aob(self.ar);
        let jump = if self.ir & 1 != 0 {
            self.ar & SMASK != 0
        } else {
            self.ar & SMASK == 0
        };
        if jump {
            self.pc = self.ab;
            self.f_pc_inh = true;
        }
        self.ar &= FMASK;
        After::Store
    }

    /// Opcode 254: JRST and its decorated forms.  The AC field picks
    /// dismiss, halt, flag restore and user entry; in user mode the
    /// privileged forms trap as unimplemented operations.
    pub(super) fn op_jrst(&mut self) -> After {
        self.pc = self.ar & RMASK;
        if self.uuo_cycle || self.pi_cycle {
            self.flags.clear_user();
        }
        // JEN
        if self.ac & 0o10 != 0 {
            if self.flags.user_without_io() {
                return self.op_muuo();
            }
            self.pi_restore = true;
        }
        // HALT
        if self.ac & 0o4 != 0 {
            if self.flags.user_without_io() {
                return self.op_muuo();
            }
            self.stop = Some(StopReason::Halted {
                at: self.inst_addr,
            });
        }
        // JRSTF
        if self.ac & 0o2 != 0 {
            self.flags.restore_from_pc_word(self.ar);
            self.check_apr_irq();
        }
        // PORTAL
        if self.ac & 0o1 != 0 {
            self.flags.set_user();
            if self.is_ki() {
                self.flags.clear_public();
            }
        }
        self.f_pc_inh = true;
        After::Store
    }

    /// Opcode 255: JFCL.  Tests and clears the flags selected by the
    /// AC field.
    pub(super) fn op_jfcl(&mut self) -> After {
        if self.flags.test_and_clear_selected(self.ac as u32) {
            self.pc = self.ar;
            self.f_pc_inh = true;
        }
        After::Store
    }

    /// Opcode 256: XCT.  The next fetch comes from the effective
    /// address without touching PC.
    pub(super) fn op_xct(&mut self) -> After {
        self.f_load_pc = false;
        self.f_pc_inh = true;
        if self.is_ki() && !self.flags.user() {
            self.xct_flag = self.ac;
        }
        After::Store
    }

    /// Opcode 257: MAP.  The KI10 reads the page table the same way
    /// the hardware would and hands back the mapping word; the KA10
    /// treats it as a no-op that stores whatever the operand cycle
    /// fetched.
    pub(super) fn op_map(&mut self) -> After {
        if !self.is_ki() {
            return After::Store;
        }
        let mut f = self.ab >> 9;
        if self.flags.user() {
            if self.pager.small_user && f & 0o340 != 0 {
                // Page failure, no match.
                self.ar = 0o420_000;
                return After::Store;
            }
            self.ar = self.pager.ub_ptr;
        } else {
            if !self.pager.enabled {
                self.ar = 0o020_000 + f;
                return After::Store;
            }
            // Per-process area of the executive maps through the
            // user base; the executive high segment through the
            // executive base.
            if f & 0o340 == 0o340 {
                self.ar = self.pager.ub_ptr;
                f += 0o1000 - 0o340;
            } else if f & 0o400 != 0 {
                self.ar = self.pager.eb_ptr;
            } else {
                self.ar = 0o020_000 + f;
                return After::Store;
            }
        }
        self.ab = self.ar + (f >> 1);
        let _ = self.mem_read(false);
        self.ar = self.mb;
        if f & 1 != 0 {
            self.ar >>= 18;
        }
        self.ar &= 0o357_777;
        After::Store
    }

    /// Opcode 260: PUSHJ.
    pub(super) fn op_pushj(&mut self) -> After {
        self.br = self.ab;
        self.ar = self.aob(self.ar);
        self.ab = self.ar & RMASK;
        if self.ar & C1 != 0 {
            self.push_overflow();
        }
        self.ar &= FMASK;
        self.mb = self.flags.pc_word(self.pc + u64::from(!self.pi_cycle));
        self.flags.clear_on_pc_store();
        if self.uuo_cycle || self.pi_cycle {
            self.flags.clear_user();
        }
        let _ = self.mem_write(self.uuo_cycle || self.pi_cycle);
        self.pc = self.br & RMASK;
        self.f_pc_inh = true;
        After::Store
    }

    /// Opcode 261: PUSH.
    pub(super) fn op_push(&mut self) -> After {
        self.ar = self.aob(self.ar);
        self.ab = self.ar & RMASK;
        if self.ar & C1 != 0 {
            self.push_overflow();
        }
        self.ar &= FMASK;
        self.mb = self.br;
        let _ = self.mem_write(false);
        After::Store
    }

    /// Opcode 262: POP.
    pub(super) fn op_pop(&mut self) -> After {
        self.ab = self.ar & RMASK;
        if self.mem_read(false).is_err() {
            return After::Store;
        }
        self.ar = self.sob(self.ar);
        self.ab = self.br;
        if self.mem_write(false).is_err() {
            return After::Store;
        }
        if self.ar & C1 == 0 {
            self.push_overflow();
        }
        self.ar &= FMASK;
        After::Store
    }

    /// Opcode 263: POPJ.
    pub(super) fn op_popj(&mut self) -> After {
        self.ab = self.ar & RMASK;
        if self.mem_read(false).is_err() {
            return After::Store;
        }
        self.pc = self.mb & RMASK;
        self.ar = self.sob(self.ar);
        if self.ar & C1 == 0 {
            self.push_overflow();
        }
        self.ar &= FMASK;
        self.f_pc_inh = true;
        After::Store
    }

    /// Opcode 264: JSR.  The flag and PC word replaces AR so the
    /// store cycle writes it to the effective address.
    pub(super) fn op_jsr(&mut self) -> After {
        let ad = self.flags.pc_word(self.pc + u64::from(!self.pi_cycle));
        self.flags.clear_on_pc_store();
        if self.uuo_cycle || self.pi_cycle {
            self.flags.clear_user();
        }
        self.pc = (self.ar + u64::from(self.pi_cycle)) & RMASK;
        self.ar = ad;
        After::Store
    }

    /// Opcode 265: JSP.
    pub(super) fn op_jsp(&mut self) -> After {
        let ad = self.flags.pc_word(self.pc + u64::from(!self.pi_cycle));
        self.flags.clear_on_pc_store();
        if self.uuo_cycle || self.pi_cycle {
            self.flags.clear_user();
        }
        self.pc = self.ar & RMASK;
        self.ar = ad;
        self.f_pc_inh = true;
        After::Store
    }

    /// Opcode 266: JSA.
    pub(super) fn op_jsa(&mut self) -> After {
        let word = (self.ar << 18) | ((self.pc + 1) & RMASK);
        self.set_reg(self.ac, word, false);
        if self.uuo_cycle || self.pi_cycle {
            self.flags.clear_user();
        }
        self.pc = self.ar & RMASK;
        self.ar = self.br;
        After::Store
    }

    /// Opcode 267: JRA.
    pub(super) fn op_jra(&mut self) -> After {
        let ad = self.ab;
        self.ab = (self.get_reg(self.ac) >> 18) & RMASK;
        if self.mem_read(self.uuo_cycle || self.pi_cycle).is_err() {
            return After::Store;
        }
        let word = self.mb;
        self.set_reg(self.ac, word, false);
        self.pc = ad & RMASK;
        self.f_pc_inh = true;
        After::Store
    }
}
