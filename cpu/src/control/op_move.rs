use base::prelude::*;

use crate::control::{After, Machine};

/// ## Full word transfers
///
/// The MOVE, MOVS, MOVN and MOVM families are driven almost
/// entirely by the operand and store profiles; only negation touches
/// the adder.  EXCH, BLT and the KI10 doubleword moves live here
/// too.
impl Machine {
    /// Opcodes 200-217: MOVE, MOVS, MOVN, MOVM with their immediate,
    /// memory and self modes.
    pub(super) fn op_move(&mut self) -> After {
        if self.ir & 0o10 == 0 {
            // MOVE and MOVS are all profile.
            return After::Store;
        }
        // MOVM of a positive word is a plain move.
        if self.ir & 0o4 != 0 && self.ar & SMASK == 0 {
            return After::Store;
        }
        self.flags.start_arithmetic();
        let mut flag1 = false;
        let mut flag3 = false;
        if (((self.ar & CMASK) ^ CMASK) + 1) & SMASK != 0 {
            self.flags.set_carry1();
            flag1 = true;
        }
        let ad = cm(self.ar) + 1;
        if ad & C1 != 0 {
            self.flags.set_carry0();
            flag3 = true;
        }
        if flag1 != flag3 && !self.pi_cycle {
            self.flags.set_overflow_trap();
            self.check_apr_irq();
        }
        if self.is_ki() && self.ar == SMASK && !self.pi_cycle {
            self.flags.set_trap1();
        }
        self.ar = ad & FMASK;
        After::Store
    }

    /// Opcode 250: EXCH.  The store cycle writes AR to memory; the
    /// AC half happens here.
    pub(super) fn op_exch(&mut self) -> After {
        self.set_reg(self.ac, self.br, false);
        After::Store
    }

    /// Opcode 251: BLT.  Words move one per pass around the loop so
    /// an interrupt can break in; the updated pointer goes back to
    /// the AC when one does.
    pub(super) fn op_blt(&mut self) -> After {
        self.br = self.ab;
        loop {
            self.process_events();
            if self.pi.enabled && self.pi.pending && self.pi.check_irq_level() {
                self.f_pc_inh = true;
                self.f_load_pc = false;
                self.f_inst_fetch = false;
                self.set_reg(self.ac, self.ar, false);
                break;
            }
            self.ab = (self.ar >> 18) & RMASK;
            if self.mem_read(false).is_err() {
                break;
            }
            self.ab = self.ar & RMASK;
            if self.mem_write(false).is_err() {
                break;
            }
            let ad = (self.ar & RMASK) + cm(self.br) + 1;
            self.ar = (self.ar + 0o1_000_001) & FMASK;
            if ad & C1 != 0 {
                break;
            }
        }
        After::Store
    }

    /// Opcodes 120-127: the KI10 doubleword moves.  FIX, FIXR and
    /// FLTR share the row; EXTEND does not exist and traps.
    pub(super) fn op_double_move(&mut self) -> After {
        match self.ir & 0o7 {
            0 => {
                // DMOVE
                self.ab = (self.ab + 1) & RMASK;
                if self.mem_read(false).is_err() {
                    return After::Store;
                }
                self.mq = self.mb;
                After::Store
            }
            1 => {
                // DMOVN
                self.ab = (self.ab + 1) & RMASK;
                if self.mem_read(false).is_err() {
                    return After::Store;
                }
                self.mq = ((self.mb & CMASK) ^ CMASK) + 1;
                self.ar = (cm(self.ar) + u64::from(self.mq & SMASK != 0)) & FMASK;
                self.mq &= CMASK;
                After::Store
            }
            4 => {
                // DMOVEM writes its two halves as separate memory
                // instructions, restartable on the second.
                if !self.flags.first_part_done() || self.pi_cycle {
                    self.mb = self.ar;
                    if self.mem_write(false).is_err() {
                        return After::Store;
                    }
                    if !self.pi_cycle {
                        self.flags.set_first_part_done();
                        self.f_pc_inh = true;
                        return After::Store;
                    }
                }
                if self.flags.first_part_done() || self.pi_cycle {
                    if !self.pi_cycle {
                        self.flags.clear_first_part_done();
                    }
                    self.ab = (self.ab + 1) & RMASK;
                    self.mb = self.mq;
                    let _ = self.mem_write(false);
                }
                After::Store
            }
            5 => {
                // DMOVNM
                if !self.flags.first_part_done() || self.pi_cycle {
                    self.ar = cm(self.ar);
                    self.br = self.ar + 1;
                    self.mq = ((self.mq & CMASK) ^ CMASK) + 1;
                    if self.mq & SMASK != 0 {
                        self.ar = self.br;
                    }
                    self.ar &= FMASK;
                    self.mb = self.ar;
                    if self.mem_write(false).is_err() {
                        return After::Store;
                    }
                    if !self.pi_cycle {
                        self.flags.set_first_part_done();
                        self.f_pc_inh = true;
                        return After::Store;
                    }
                }
                if self.flags.first_part_done() || self.pi_cycle {
                    if !self.pi_cycle {
                        self.flags.clear_first_part_done();
                    }
                    self.mq = (cm(self.mq) + 1) & CMASK;
                    self.ab = (self.ab + 1) & RMASK;
                    self.mb = self.mq;
                    let _ = self.mem_write(false);
                }
                After::Store
            }
            2 | 6 => self.op_fix(),
            7 => self.op_fltr(),
            _ => self.op_muuo(),
        }
    }
}
