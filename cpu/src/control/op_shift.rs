use base::prelude::*;

use crate::control::{After, Machine};

/// Shift left by a possibly out-of-range count, as if the word were
/// arbitrarily wide and then truncated to 64 bits.  Shift counts
/// reach 255 here; the datapath just shifts everything out.
pub(super) fn lshift(w: u64, n: i32) -> u64 {
    if (0..64).contains(&n) {
        w << n
    } else {
        0
    }
}

/// Companion right shift with the same out-of-range rule.
pub(super) fn rshift(w: u64, n: i32) -> u64 {
    if (0..64).contains(&n) {
        w >> n
    } else {
        0
    }
}

/// ## Shifts and rotates
///
/// Opcodes 240-247.  The count is the effective address taken as a
/// signed halfword: negative means right.  The combined forms treat
/// AC and AC+1 as one 72-bit register.  JFFO rides along in this
/// row.
impl Machine {
    pub(super) fn op_shift(&mut self) -> After {
        self.br = self.ab;
        match self.ir & 0o7 {
            0 => {
                // ASH: arithmetic, sign sticks.
                self.sc = ((if self.ab & LSIGN != 0 {
                    (0o377 ^ self.ab) + 1
                } else {
                    self.ab
                }) & 0o377) as i32;
                if self.sc == 0 {
                    return After::Store;
                }
                let ad = if self.ar & SMASK != 0 { FMASK } else { 0 };
                if self.ab & LSIGN != 0 {
                    if self.sc < 35 {
                        self.ar =
                            ((self.ar >> self.sc) | (ad << (36 - self.sc))) & FMASK;
                    } else {
                        self.ar = ad;
                    }
                } else {
                    if lshift(ad, self.sc) & !CMASK != lshift(self.ar, self.sc) & !CMASK {
                        self.flags.set_overflow();
                        self.check_apr_irq();
                    }
                    self.ar = (lshift(self.ar, self.sc) & CMASK) | (self.ar & SMASK);
                }
            }
            1 => {
                // ROT
                self.sc = self.rotate_count(0o377);
                if self.sc == 0 {
                    return After::Store;
                }
                self.sc %= 36;
                if self.ab & LSIGN != 0 {
                    self.sc = 36 - self.sc;
                }
                self.ar = ((self.ar << self.sc) | (self.ar >> (36 - self.sc))) & FMASK;
            }
            2 => {
                // LSH
                self.sc = ((if self.ab & LSIGN != 0 {
                    (0o377 ^ self.ab) + 1
                } else {
                    self.ab
                }) & 0o377) as i32;
                if self.sc == 0 {
                    return After::Store;
                }
                if self.ab & LSIGN != 0 {
                    self.ar = rshift(self.ar, self.sc);
                } else {
                    self.ar = lshift(self.ar, self.sc) & FMASK;
                }
            }
            3 => {
                // JFFO
                self.sc = 0;
                if self.ar != 0 {
                    self.pc = self.ab;
                    self.f_pc_inh = true;
                    self.sc = leading_zeros(self.ar) as i32;
                }
                let count = self.sc as u64;
                self.set_reg(self.ac + 1, count, false);
            }
            4 => {
                // ASHC
                self.sc = ((if self.ab & LSIGN != 0 {
                    (0o377 ^ self.ab) + 1
                } else {
                    self.ab
                }) & 0o377) as i32;
                if self.sc == 0 {
                    return After::Store;
                }
                if self.sc > 70 {
                    self.sc = 70;
                }
                let ad = if self.ar & SMASK != 0 { FMASK } else { 0 };
                self.ar &= CMASK;
                self.mq &= CMASK;
                if self.ab & LSIGN != 0 {
                    if self.sc >= 35 {
                        self.mq =
                            ((self.ar >> (self.sc - 35)) | (ad << (70 - self.sc))) & FMASK;
                        self.ar = ad;
                    } else {
                        self.mq = (ad & SMASK)
                            | (self.mq >> self.sc)
                            | ((self.ar << (35 - self.sc)) & CMASK);
                        self.ar = (ad & SMASK)
                            | (((self.ar >> self.sc) | (ad << (35 - self.sc))) & FMASK);
                    }
                } else if self.sc >= 35 {
                    if lshift(ad, self.sc) & !CMASK != lshift(self.ar, self.sc) & !CMASK {
                        self.flags.set_overflow();
                        self.check_apr_irq();
                    }
                    self.ar = (ad & SMASK) | ((self.ar << (self.sc - 35)) & CMASK);
                    self.mq = ad & SMASK;
                } else {
                    if ((ad & CMASK) << self.sc) & !CMASK != (self.ar << self.sc) & !CMASK {
                        self.flags.set_overflow();
                        self.check_apr_irq();
                    }
                    self.ar = (ad & SMASK)
                        | ((self.ar << self.sc) & CMASK)
                        | (self.mq >> (35 - self.sc));
                    self.mq = (ad & SMASK) | ((self.mq << self.sc) & CMASK);
                }
            }
            5 => {
                // ROTC
                self.sc = self.rotate_count(0o777);
                if self.sc == 0 {
                    return After::Store;
                }
                self.sc %= 72;
                if self.ab & LSIGN != 0 {
                    self.sc = 72 - self.sc;
                }
                if self.sc >= 36 {
                    std::mem::swap(&mut self.ar, &mut self.mq);
                    self.sc -= 36;
                }
                let ad = ((self.ar << self.sc) | (self.mq >> (36 - self.sc))) & FMASK;
                self.mq = ((self.mq << self.sc) | (self.ar >> (36 - self.sc))) & FMASK;
                self.ar = ad;
            }
            6 => {
                // LSHC
                self.sc = ((if self.ab & LSIGN != 0 {
                    (0o377 ^ self.ab) + 1
                } else {
                    self.ab
                }) & 0o377) as i32;
                if self.sc == 0 {
                    return After::Store;
                }
                if self.sc > 71 {
                    self.ar = 0;
                    self.mq = 0;
                } else {
                    if self.sc > 36 {
                        if self.ab & LSIGN != 0 {
                            self.ar = self.mq;
                            self.mq = 0;
                        } else {
                            self.mq = self.ar;
                            self.ar = 0;
                        }
                        self.sc -= 36;
                    }
                    if self.ab & LSIGN != 0 {
                        self.mq =
                            ((self.mq >> self.sc) | (self.ar << (36 - self.sc))) & FMASK;
                        self.ar >>= self.sc;
                    } else {
                        self.ar =
                            ((self.ar << self.sc) | (self.mq >> (36 - self.sc))) & FMASK;
                        self.mq = (self.mq << self.sc) & FMASK;
                    }
                }
            }
            _ => return self.op_unassigned(),
        }
        After::Store
    }

    /// Rotate counts treat a count of exactly -256 specially on the
    /// KI10; the KA10 just folds the magnitude.  `mask` is 0377 for
    /// the single rotate, 0777 for the combined one.
    fn rotate_count(&self, mask: u64) -> i32 {
        if self.is_ki() {
            if self.ab & LSIGN != 0 {
                if self.ab & 0o377 != 0 {
                    (((0o377 ^ self.ab) + 1) & 0o377) as i32
                } else {
                    0o400
                }
            } else {
                (self.ab & 0o377) as i32
            }
        } else {
            ((if self.ab & LSIGN != 0 {
                (mask ^ self.ab) + 1
            } else {
                self.ab
            }) & mask) as i32
        }
    }
}
