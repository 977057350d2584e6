use base::prelude::*;
use base::word::{fp_exponent, smear_sign, BIT8, BIT9, MANT, PMASK};

use crate::control::{After, Machine};

use super::op_shift::{lshift, rshift};

/// Single precision intermediates carry the sign and mantissa
/// shifted up 27 places, leaving room below for the low half of a
/// long result.
const FP_SMASK: u64 = SMASK << 27;
const FP_NMASK: u64 = !((1u64 << 54) - 1);
const FP_CMASK: u64 = (1u64 << 54) - 1;

/// Double precision intermediates shift up 35 places instead.  The
/// top two bits are the sign and overflow positions; bit 61 is where
/// the normalized bit of the mantissa lands.
const DF_SMASK: u64 = 1 << 63;
const DF_NMASK: u64 = 1 << 62;
const DF_XMASK: u64 = 1 << 61;

/// ## Floating point
///
/// Opcodes 110-132 and 140-177.  A floating point word is sign,
/// eight exponent bits in excess 200 and a 27 bit fraction, with the
/// exponent field complemented when the word is negative.  Negative
/// operands are made positive up front and the result sign is
/// reapplied at the end, so the normalize paths only ever see
/// positive fractions.
impl Machine {
    /// Opcodes 140-157 plus UFA: the add and subtract family.
    pub(super) fn op_fadd(&mut self) -> After {
        if self.ir & 0o770 == 0o150 {
            // FSB negates the AC operand and proceeds as FAD.
            let ad = negate(self.ar);
            self.ar = self.br;
            self.br = ad;
        }
        self.sc = ((self.br >> 27) & 0o777) as i32;
        let mut scad = if (self.br & SMASK) == (self.ar & SMASK) {
            self.sc + ((((self.ar >> 27) & 0o777) as i32) ^ 0o777) + 1
        } else {
            self.sc + (((self.ar >> 27) & 0o777) as i32)
        };
        scad &= 0o777;
        // Keep the larger operand in AR.
        if (self.br & SMASK != 0) == (scad & 0o400 != 0) {
            std::mem::swap(&mut self.ar, &mut self.br);
        }
        if scad & 0o400 == 0 {
            if (self.ar & SMASK) == (self.br & SMASK) {
                scad = ((scad ^ 0o777) + 1) & 0o777;
            } else {
                scad ^= 0o777;
            }
        } else if (self.ar & SMASK) != (self.br & SMASK) {
            scad = (scad + 1) & 0o777;
        }
        self.sc = fp_exponent(self.ar);
        self.br = smear_sign(self.br) << 27;
        self.ar = smear_sign(self.ar) << 27;
        // Shift the smaller fraction into alignment, with sign fill.
        if scad & 0o400 != 0 {
            scad = 0o1000 - scad;
            if scad < 28 {
                let ad = if self.br & FP_SMASK != 0 {
                    (FMASK << 27) | MANT
                } else {
                    0
                };
                self.br = (self.br >> scad) | (ad << (54 - scad));
            } else {
                self.br = 0;
            }
        }
        self.ar = self.ar.wrapping_add(self.br);
        let mut flag1 = false;
        if self.ar & FP_SMASK != 0 {
            self.ar = self.ar.wrapping_neg();
            flag1 = true;
        }
        self.fnorm(flag1)
    }

    /// Normalize, round and pack a single precision result held in
    /// the shifted-up AR domain.  UFA skips the normalize cascade;
    /// the long forms give the low word its own exponent 27 smaller.
    fn fnorm(&mut self, flag1: bool) -> After {
        if self.ar != 0 {
            loop {
                if self.ar & FP_NMASK != 0 {
                    self.sc += 1;
                    self.ar >>= 1;
                }
                if (self.sc & 0o400 != 0) ^ (self.sc & 0o200 != 0) {
                    self.fxu_hold_set = true;
                }
                if self.ir != 0o130 {
                    if self.ar & 0o777_777_777_000_000_000 == 0 {
                        self.sc -= 27;
                        self.ar <<= 27;
                    }
                    if self.ar & 0o777_760_000_000_000_000 == 0 {
                        self.sc -= 14;
                        self.ar <<= 14;
                    }
                    if self.ar & 0o777_000_000_000_000_000 == 0 {
                        self.sc -= 9;
                        self.ar <<= 9;
                    }
                    if self.ar & 0o770_000_000_000_000_000 == 0 {
                        self.sc -= 6;
                        self.ar <<= 6;
                    }
                    if self.ar & 0o740_000_000_000_000_000 == 0 {
                        self.sc -= 4;
                        self.ar <<= 4;
                    }
                    if self.ar & 0o600_000_000_000_000_000 == 0 {
                        self.sc -= 2;
                        self.ar <<= 2;
                    }
                    if self.ar & 0o400_000_000_000_000_000 == 0 {
                        self.sc -= 1;
                        self.ar <<= 1;
                    }
                    // Rounding can carry all the way up, so normalize
                    // once more after it.
                    if !self.nrf && !flag1 && self.ir & 0o4 != 0 && self.ar & BIT9 != 0 {
                        self.ar += BIT8;
                        self.nrf = true;
                        continue;
                    }
                }
                break;
            }
            if flag1 {
                self.ar = (self.ar ^ FP_CMASK) + 1;
            }
            self.mq = self.ar & MANT;
            self.ar >>= 27;
            if flag1 {
                self.ar |= SMASK;
                self.mq |= SMASK;
            }
        } else if flag1 {
            self.ar = BIT9 | SMASK;
            self.mq = SMASK;
            self.sc += 1;
        } else {
            self.ar = 0;
            self.mq = 0;
            self.sc = 0;
        }
        if self.sc & 0o400 != 0 {
            self.flags.set_float_overflow_trap();
            if !self.fxu_hold_set {
                self.flags.set_float_underflow();
            }
            self.check_apr_irq();
        }
        let scad = self.sc ^ if self.ar & SMASK != 0 { 0o377 } else { 0 };
        self.ar &= SMASK | MANT;
        self.ar |= ((scad & 0o377) as u64) << 27;
        if self.ir & 0o7 == 1 {
            // FADL, FSBL, FMPL
            self.sc = (self.sc + (0o777 ^ 26)) & 0o777;
            if self.mq != 0 {
                self.mq &= MANT;
                self.mq |= ((self.sc & 0o377) as u64) << 27;
            }
        }
        if self.ir == 0o130 {
            // UFA leaves its result in AC+1.
            let word = self.ar;
            self.set_reg((self.ac + 1) & 0o17, word, false);
        }
        After::Store
    }

    /// Opcodes 160-167: FMP.
    pub(super) fn op_fmp(&mut self) -> After {
        self.sc = (fp_exponent(self.br) + fp_exponent(self.ar) + 0o600) & 0o777;
        let mut flag1 = false;
        if self.ar & SMASK != 0 {
            self.ar = cm(self.ar) + 1;
            flag1 = true;
        }
        if self.br & SMASK != 0 {
            self.br = cm(self.br) + 1;
            flag1 = !flag1;
        }
        self.ar &= MANT;
        self.br &= MANT;
        self.ar *= self.br;
        self.fnorm(flag1)
    }

    /// Opcodes 170-177: FDV.  FDVL divides a double length dividend
    /// and leaves the remainder in AC+1 with its exponent 26 down.
    pub(super) fn op_fdv(&mut self) -> After {
        let mut flag1 = false;
        self.sc = fp_exponent(self.br) + (0o777 ^ fp_exponent(self.ar));
        self.sc = (self.sc + 0o201) & 0o777;
        let mut fe = 0;
        if self.ir & 0o7 == 1 {
            fe = fp_exponent(self.br) - 26;
            if self.br & SMASK != 0 {
                self.mq = (cm(self.mq) + 1) & MANT;
                self.br = cm(self.br);
                if self.mq == 0 {
                    self.br += 1;
                }
                flag1 = true;
            }
            self.mq &= MANT;
        } else if self.br & SMASK != 0 {
            self.br = cm(self.br) + 1;
            flag1 = true;
        }
        if self.ar & SMASK != 0 {
            self.ar = cm(self.ar) + 1;
            flag1 = !flag1;
        }
        self.ar &= MANT;
        self.br &= MANT;
        if self.br >= (self.ar << 1) {
            self.flags.set_float_overflow_trap();
            self.flags.set_no_divide();
            self.check_apr_irq();
            self.sac_inh = true;
            return After::Store;
        }
        self.br = (self.br << 27) + self.mq;
        self.mb = self.ar;
        if self.ir & 0o7 == 1 {
            self.ar <<= 27;
            let mut ad: u64 = 0;
            if self.br < self.ar {
                self.br <<= 1;
                self.sc -= 1;
            }
            for _ in 0..27 {
                ad <<= 1;
                if self.br >= self.ar {
                    self.br -= self.ar;
                    ad |= 1;
                }
                self.br <<= 1;
            }
            self.mq = self.br >> 28;
            self.ar = ad;
            self.sc += 1;
        } else {
            self.ar = self.br / self.ar;
        }
        if self.ar != 0 {
            if self.ir & 0o4 != 0 {
                self.ar += 1;
            }
            if self.ar & BIT8 != 0 {
                self.sc += 1;
                self.ar >>= 1;
            }
            if self.sc >= 0o600 {
                self.fxu_hold_set = true;
            }
            if flag1 {
                self.ar = (self.ar ^ MANT) + 1;
                self.ar |= SMASK;
            }
        } else if flag1 {
            self.ar = SMASK | BIT9;
            self.sc += 1;
        } else {
            self.sc = 0;
        }
        if self.sc & 0o400 != 0 {
            self.flags.set_float_overflow_trap();
            if !self.fxu_hold_set {
                self.flags.set_float_underflow();
            }
            self.check_apr_irq();
        }
        let scad = self.sc ^ if self.ar & SMASK != 0 { 0o377 } else { 0 };
        self.ar &= SMASK | MANT;
        self.ar |= ((scad & 0o377) as u64) << 27;
        if self.ir & 0o7 == 1 && self.mq != 0 {
            self.mq &= MANT;
            if self.sc & 0o400 != 0 {
                fe -= 1;
            }
            fe ^= if self.ar & SMASK != 0 { 0o377 } else { 0 };
            self.mq |= ((fe & 0o377) as u64) << 27;
        }
        After::Store
    }

    /// Opcode 131: DFN.  Negates the KA10 software double held in AC
    /// and E, keeping the low word's exponent field intact.
    pub(super) fn op_dfn(&mut self) -> After {
        let mut ad = (cm(self.br) + 1) & FMASK;
        self.sc = ((self.br >> 27) & 0o777) as i32;
        self.br = self.ar;
        self.ar = ad;
        ad = (cm(self.br) + u64::from(ad & MANT == 0)) & FMASK;
        self.ar &= MANT;
        self.ar |= ((self.sc & 0o777) as u64) << 27;
        self.br = self.ar;
        self.ar = ad;
        self.mb = self.br;
        if self.mem_write(false).is_err() {
            return After::Store;
        }
        let high = self.ar;
        self.set_reg(self.ac, high, false);
        After::Store
    }

    /// Opcode 132: FSC.
    pub(super) fn op_fsc(&mut self) -> After {
        self.sc = ((if self.ab & LSIGN != 0 { 0o400 } else { 0 }) | (self.ab & 0o377)) as i32;
        let scad = fp_exponent(self.ar);
        self.sc = (scad + self.sc) & 0o777;
        let flag1 = self.ar & SMASK != 0;
        if flag1 {
            self.ar = cm(self.ar) + 1;
        }
        self.ar &= MANT;
        if self.ar != 0 {
            if self.ar & 0o777_770_000 == 0 {
                self.sc -= 12;
                self.ar <<= 12;
            }
            if self.ar & 0o777_000_000 == 0 {
                self.sc -= 6;
                self.ar <<= 6;
            }
            if self.ar & 0o740_000_000 == 0 {
                self.sc -= 4;
                self.ar <<= 4;
            }
            if self.ar & 0o600_000_000 == 0 {
                self.sc -= 2;
                self.ar <<= 2;
            }
            if self.ar & 0o400_000_000 == 0 {
                self.sc -= 1;
                self.ar <<= 1;
            }
        } else if flag1 {
            self.ar = BIT9;
            self.sc += 1;
        }
        if (self.sc & 0o400 != 0) ^ (self.sc & 0o200 != 0) {
            self.fxu_hold_set = true;
        }
        if self.sc & 0o400 != 0 {
            self.flags.set_float_overflow_trap();
            if !self.fxu_hold_set {
                self.flags.set_float_underflow();
            }
            self.check_apr_irq();
        }
        if flag1 {
            self.ar = SMASK | ((cm(self.ar) + 1) & MANT);
            self.sc ^= 0o377;
        } else if self.ar == 0 {
            self.sc = 0;
        }
        self.ar |= ((self.sc & 0o377) as u64) << 27;
        After::Store
    }

    /// Opcodes 122 and 126: FIX and FIXR.
    pub(super) fn op_fix(&mut self) -> After {
        self.mq = 0;
        self.sc = (fp_exponent(self.ar) + 0o600) & 0o777;
        let flag1 = self.ar & SMASK != 0;
        if flag1 {
            self.ar ^= MANT;
            self.ar += 1;
            self.ar &= MANT;
        } else {
            self.ar &= MANT;
        }
        self.sc -= 27;
        self.sc &= 0o777;
        if self.sc < 9 {
            self.ar = (self.ar << self.sc) & FMASK;
        } else if self.sc & 0o400 != 0 {
            self.sc = 0o1000 - self.sc;
            self.mq = lshift(self.ar, 36 - self.sc).wrapping_sub(u64::from(flag1));
            self.ar = rshift(self.ar, self.sc);
            // FIXR rounds on the discarded fraction bits.
            if self.ir & 0o4 != 0 && self.mq & SMASK != 0 {
                self.ar += 1;
            }
        } else if !self.pi_cycle {
            self.flags.set_overflow_trap();
            self.sac_inh = true;
        }
        if flag1 {
            self.ar = (cm(self.ar) + 1) & FMASK;
        }
        After::Store
    }

    /// Opcode 127: FLTR.
    pub(super) fn op_fltr(&mut self) -> After {
        let flag1 = self.ar & SMASK != 0;
        if flag1 {
            self.ar = (cm(self.ar) + 1) & CMASK;
        }
        self.ar <<= 19;
        self.sc = 163;
        self.fnorm(flag1)
    }

    /// Opcodes 110-113: the KI10 hardware doubles.  DADD through
    /// DDIV do not exist on this machine and trap.
    pub(super) fn op_double_fp(&mut self) -> After {
        match self.ir & 0o7 {
            0 | 1 => {
                // DFAD, DFSB
                self.ab = (self.ab + 1) & RMASK;
                if self.mem_read(false).is_err() {
                    return After::Store;
                }
                self.sc = fp_exponent(self.br);
                self.br = smear_sign(self.br) << 35;
                self.br |= self.mb & CMASK;
                let mut fe = fp_exponent(self.ar);
                self.ar = smear_sign(self.ar) << 35;
                self.ar |= self.mq & CMASK;
                if self.ir & 0o1 != 0 {
                    self.br = self.br.wrapping_neg();
                }
                let mut scad = self.sc - fe;
                if scad < 0 {
                    std::mem::swap(&mut self.ar, &mut self.br);
                    std::mem::swap(&mut self.sc, &mut fe);
                    scad = self.sc - fe;
                }
                while scad > 0 {
                    self.ar = (self.ar & (DF_SMASK | DF_NMASK)) | (self.ar >> 1);
                    scad -= 1;
                }
                let mut ad = self.ar.wrapping_add(self.br);
                let mut flag1 = false;
                if (self.ar & DF_SMASK) != (self.br & DF_SMASK) {
                    if ad & DF_SMASK != 0 {
                        ad = ad.wrapping_neg();
                        flag1 = true;
                    }
                } else {
                    if self.ar & DF_SMASK != 0 {
                        ad = ad.wrapping_neg();
                        flag1 = true;
                    }
                    if ad & DF_NMASK != 0 {
                        ad = ad.wrapping_add(1);
                        ad = (ad & DF_SMASK) | (ad >> 1);
                        self.sc += 1;
                    }
                }
                self.ar = ad;
                while self.ar != 0 && self.ar & DF_XMASK == 0 {
                    self.ar <<= 1;
                    self.sc -= 1;
                    self.fxu_hold_set = true;
                }
                self.dpnorm(flag1)
            }
            2 => {
                // DFMP
                self.ab = (self.ab + 1) & RMASK;
                if self.mem_read(false).is_err() {
                    return After::Store;
                }
                self.sc = fp_exponent(self.ar);
                self.ar = smear_sign(self.ar) << 35;
                self.ar |= self.mq & CMASK;
                let fe = fp_exponent(self.br);
                self.br = smear_sign(self.br) << 35;
                self.br |= self.mb & CMASK;
                let mut flag1 = false;
                if self.ar & DF_SMASK != 0 {
                    self.ar = self.ar.wrapping_neg();
                    flag1 = true;
                }
                if self.br & DF_SMASK != 0 {
                    self.br = self.br.wrapping_neg();
                    flag1 = !flag1;
                }
                self.sc = self.sc + fe - 0o201;
                if self.sc < 0 {
                    self.fxu_hold_set = true;
                }
                // Three partial products cover the 62 significant
                // bits; the low-by-low term never reaches them.
                let mut ad = (self.ar >> 30).wrapping_mul(self.br >> 30);
                ad = ad.wrapping_add(((self.ar >> 30).wrapping_mul(self.br & PMASK)) >> 30);
                ad = ad.wrapping_add(((self.ar & PMASK).wrapping_mul(self.br >> 30)) >> 30);
                self.ar = ad >> 1;
                if self.ar & DF_NMASK != 0 {
                    self.ar >>= 1;
                    self.sc += 1;
                }
                self.dpnorm(flag1)
            }
            3 => {
                // DFDV
                self.ab = (self.ab + 1) & RMASK;
                if self.mem_read(false).is_err() {
                    return After::Store;
                }
                self.sc = fp_exponent(self.ar);
                self.ar = smear_sign(self.ar) << 35;
                self.ar |= self.mq & CMASK;
                let fe = fp_exponent(self.br);
                self.br = smear_sign(self.br) << 35;
                self.br |= self.mb & CMASK;
                let mut flag1 = false;
                if self.ar & DF_SMASK != 0 {
                    self.ar = self.ar.wrapping_neg();
                    flag1 = true;
                }
                if self.br & DF_SMASK != 0 {
                    self.br = self.br.wrapping_neg();
                    flag1 = !flag1;
                }
                if self.ar >= (self.br << 1) {
                    self.flags.set_float_overflow_trap();
                    self.flags.set_no_divide();
                    // Zero keeps the history readable.
                    self.ar = 0;
                    self.sac_inh = true;
                    self.check_apr_irq();
                    return After::Store;
                }
                if self.ar == 0 {
                    self.sac_inh = true;
                    return After::Store;
                }
                self.sc = self.sc - fe + 0o201;
                if self.ar < self.br {
                    self.ar <<= 1;
                    self.sc -= 1;
                }
                if self.sc < 0 {
                    self.fxu_hold_set = true;
                }
                let mut ad: u64 = 0;
                for _ in 0..62 {
                    ad <<= 1;
                    if self.ar >= self.br {
                        self.ar -= self.br;
                        ad |= 1;
                    }
                    self.ar <<= 1;
                }
                self.ar = ad;
                self.dpnorm(flag1)
            }
            _ => self.op_muuo(),
        }
    }

    /// Split a normalized double precision intermediate back into
    /// its high and low words.  Unlike the single case, underflow
    /// only reports when the normalize step saw the exponent cross.
    fn dpnorm(&mut self, mut flag1: bool) -> After {
        if self.ar == 0 {
            flag1 = false;
        }
        let mut arx = self.ar & CMASK;
        self.ar >>= 35;
        self.ar &= MANT;
        if flag1 {
            arx = (arx ^ CMASK) + 1;
            self.ar = (self.ar ^ MANT) + u64::from(arx & SMASK != 0);
            arx &= CMASK;
            self.ar &= MANT;
            self.ar |= SMASK;
        }
        if self.sc & 0o400 != 0 {
            self.flags.set_float_overflow_trap();
            if self.fxu_hold_set {
                self.flags.set_float_underflow();
            }
            self.check_apr_irq();
        }
        let scad = self.sc ^ if self.ar & SMASK != 0 { 0o377 } else { 0 };
        self.ar &= SMASK | MANT;
        if self.ar != 0 {
            self.ar |= ((scad & 0o377) as u64) << 27;
        }
        self.mq = arx;
        After::Store
    }
}
