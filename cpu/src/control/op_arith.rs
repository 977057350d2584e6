use base::prelude::*;

use crate::control::{After, Machine};

/// ## Fixed point arithmetic
///
/// Two's complement add, subtract, multiply and divide.  The add
/// path reports both carries so the program can tell overflow (the
/// carries disagree) from a benign wrap.  Multiply builds the 70-bit
/// product from halfword partial products; divide is the hardware's
/// non-restoring bit loop.
impl Machine {
    /// Opcodes 270-277: ADD and SUB in all modes.
    pub(super) fn op_add_sub(&mut self) -> After {
        let mut flag1 = false;
        let mut flag3 = false;
        self.flags.start_arithmetic();
        if self.ir & 0o4 != 0 {
            // SUB
            if (((self.ar & CMASK) ^ CMASK) + (self.br & CMASK) + 1) & SMASK != 0 {
                self.flags.set_carry1();
                flag1 = true;
            }
            self.br = cm(self.ar) + self.br + 1;
        } else {
            if ((self.ar & CMASK) + (self.br & CMASK)) & SMASK != 0 {
                self.flags.set_carry1();
                flag1 = true;
            }
            self.br += self.ar;
        }
        if self.br & C1 != 0 {
            self.flags.set_carry0();
            flag3 = true;
        }
        if flag1 != flag3 {
            self.flags.set_overflow();
            self.check_apr_irq();
        }
        self.br &= FMASK;
        self.ar = self.br;
        After::Store
    }

    /// Opcodes 220-227: IMUL and MUL.
    pub(super) fn op_multiply(&mut self) -> After {
        let mut flag3 = false;
        if self.ar & SMASK != 0 {
            self.ar = negate(self.ar);
            flag3 = true;
        }
        if self.br & SMASK != 0 {
            self.br = negate(self.br);
            flag3 = !flag3;
        }
        if self.ar == 0 || self.br == 0 {
            self.ar = 0;
            self.mq = 0;
            return After::Store;
        }
        if !self.is_ki() && self.br == SMASK {
            // Negating the most negative number leaves it alone.
            flag3 = !flag3;
        }
        self.mq = self.ar * (self.br & RMASK);
        self.ar *= (self.br >> 18) & RMASK;
        self.mq += (self.ar << 18) & LMASK;
        self.ar >>= 18;
        self.ar = (self.ar << 1) + (self.mq >> 35);
        self.mq &= CMASK;
        if self.ir & 0o4 == 0 {
            // IMUL: product must fit one word.
            if self.ar > u64::from(flag3) {
                self.flags.set_overflow();
                self.check_apr_irq();
            }
            if flag3 {
                self.mq ^= CMASK;
                self.mq += 1;
                self.mq |= SMASK;
            }
            self.ar = self.mq;
            return After::Store;
        }
        if self.ar & SMASK != 0 {
            self.flags.set_overflow();
            self.check_apr_irq();
        }
        if flag3 {
            self.ar ^= FMASK;
            self.mq ^= CMASK;
            self.mq += 1;
            if self.mq & SMASK != 0 {
                self.ar += 1;
                self.mq &= CMASK;
            }
        }
        self.ar &= FMASK;
        self.mq = (self.mq & !SMASK) | (self.ar & SMASK);
        After::Store
    }

    /// Opcodes 230-237: IDIV and DIV.
    pub(super) fn op_divide(&mut self) -> After {
        let mut flag1 = false;
        if self.ir & 0o4 == 0 {
            // IDIV
            if self.br & SMASK != 0 {
                self.br = negate(self.br);
                flag1 = !flag1;
            }
            if self.br == 0 {
                self.flags.set_overflow();
                self.flags.set_no_divide();
                self.sac_inh = true;
                self.check_apr_irq();
                return After::Store;
            }
            let mut flag3 = false;
            if self.ar & SMASK != 0 {
                self.ar = negate(self.ar);
                flag1 = !flag1;
                flag3 = true;
            }
            self.mq = self.ar % self.br;
            self.ar /= self.br;
            if flag1 {
                self.ar = negate(self.ar);
            }
            if flag3 {
                self.mq = negate(self.mq);
            }
        } else {
            // DIV: double length dividend in AC, AC+1.
            self.mq = self.get_reg(self.ac + 1);
            if self.ar & SMASK != 0 {
                let mut ad = negate(self.mq);
                self.mq = self.ar;
                self.ar = ad;
                ad = cm(self.mq) & FMASK;
                self.mq = self.ar;
                self.ar = ad;
                if self.mq & CMASK == 0 {
                    self.ar = (self.ar + 1) & FMASK;
                }
                flag1 = true;
            }
            let mut ad = if self.br & SMASK != 0 {
                (self.ar + self.br) & FMASK
            } else {
                (self.ar + cm(self.br) + 1) & FMASK
            };
            self.mq = (self.mq << 1) & FMASK;
            self.mq |= u64::from(ad & SMASK != 0);
            self.sc = 35;
            if ad & SMASK == 0 {
                self.flags.set_overflow();
                self.flags.set_no_divide();
                self.sac_inh = true;
                self.check_apr_irq();
                return After::Store;
            }
            while self.sc != 0 {
                ad = if (self.br & SMASK != 0) ^ (self.mq & 1 != 0) {
                    self.ar + cm(self.br) + 1
                } else {
                    self.ar + self.br
                };
                self.ar = (ad << 1) | u64::from(self.mq & SMASK != 0);
                self.ar &= FMASK;
                self.mq = (self.mq << 1) & FMASK;
                self.mq |= u64::from(ad & SMASK == 0);
                self.sc -= 1;
            }
            ad = if (self.br & SMASK != 0) ^ (self.mq & 1 != 0) {
                self.ar + cm(self.br) + 1
            } else {
                self.ar + self.br
            };
            self.ar = ad & FMASK;
            self.mq = (self.mq << 1) & FMASK;
            self.mq |= u64::from(ad & SMASK == 0);
            if self.ar & SMASK != 0 {
                // Final remainder correction.
                self.ar = if self.br & SMASK != 0 {
                    (self.ar + cm(self.br) + 1) & FMASK
                } else {
                    (self.ar + self.br) & FMASK
                };
            }
            if flag1 {
                self.ar = negate(self.ar);
            }
            if flag1 ^ (self.br & SMASK != 0) {
                let ad = negate(self.mq);
                self.mq = self.ar;
                self.ar = ad;
            } else {
                let ad = self.mq;
                self.mq = self.ar;
                self.ar = ad;
            }
        }
        After::Store
    }
}
