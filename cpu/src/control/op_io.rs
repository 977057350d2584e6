use base::prelude::*;

use crate::control::{After, Machine, APR, PAG, PI};

/// ## In-out transfers
///
/// Opcodes 700-777.  Bits 3-9 select one of 128 device codes and AC
/// bits 10-12 one of the eight transfer shapes.  The processor
/// answers codes 000 (APR), 004 (PI) and, on the KI10, 010 (the
/// pager) internally; every other code goes out over the bus.  In
/// user mode these trap as MUUOs unless the monitor has granted
/// USERIO.
impl Machine {
    pub(super) fn op_iot(&mut self) -> After {
        if self.flags.user_without_io() && !self.pi_cycle {
            return self.op_muuo();
        }
        let dev = (((self.ir & 0o77) << 1) | u64::from(self.ac & 0o10 != 0)) << 2;
        match self.ac & 0o7 {
            0 | 2 => {
                // BLKI/BLKO: count the pointer word up, then run the
                // transfer through its right half as a DATAI/DATAO.
                if self.mem_read(self.pi_cycle).is_err() {
                    return After::Store;
                }
                self.ar = self.mb;
                if let Some(entry) = self.history.last_mut() {
                    entry.operand = self.ar;
                }
                self.ac |= 1;
                self.f_load_pc = false;
                self.f_inst_fetch = false;
                self.ar = self.aob(self.ar);
                if self.ar & C1 != 0 {
                    self.pi_ov = true;
                    self.f_pc_inh = true;
                } else if !self.pi_cycle {
                    self.pc = (self.pc + 1) & RMASK;
                }
                self.ar &= FMASK;
                self.mb = self.ar;
                if self.mem_write(self.pi_cycle).is_err() {
                    return After::Store;
                }
                self.ab = self.ar & RMASK;
                After::ReOperand
            }
            1 => {
                // DATAI
                self.ar = self.io_datai(dev);
                self.mb = self.ar;
                let _ = self.mem_write(self.pi_cycle);
                After::Store
            }
            3 => {
                // DATAO
                if self.mem_read(self.pi_cycle).is_err() {
                    return After::Store;
                }
                self.ar = self.mb;
                self.io_datao(dev, self.ar);
                After::Store
            }
            4 => {
                // CONO
                self.io_cono(dev, self.ar);
                After::Store
            }
            5 => {
                // CONI
                self.ar = self.io_coni(dev);
                self.mb = self.ar;
                let _ = self.mem_write(self.pi_cycle);
                After::Store
            }
            6 => {
                // CONSZ
                self.ar = self.io_coni(dev) & self.ab;
                if self.ar == 0 {
                    self.pc = (self.pc + 1) & RMASK;
                }
                After::Store
            }
            _ => {
                // CONSO
                self.ar = self.io_coni(dev) & self.ab;
                if self.ar != 0 {
                    self.pc = (self.pc + 1) & RMASK;
                }
                After::Store
            }
        }
    }

    fn io_cono(&mut self, dev: u64, word: u64) {
        match dev {
            APR => self.apr_cono(word),
            PI => self.pi.cono(word),
            PAG if self.is_ki() => self.pager.cono(word),
            _ => self.bus.cono(dev, &mut self.pi, word),
        }
    }

    fn io_coni(&mut self, dev: u64) -> u64 {
        match dev {
            APR => self.apr_coni(),
            PI => self.pi.coni(self.is_ki()),
            PAG if self.is_ki() => 0,
            _ => self.bus.coni(dev, &self.pi),
        }
    }

    fn io_datao(&mut self, dev: u64, word: u64) {
        match dev {
            // On the KA10 this loads the protection and relocation
            // registers; the KI10 moved that to the pager.
            APR => {
                if !self.is_ki() {
                    self.reloc.load(word);
                }
            }
            // Console lights.
            PI => {}
            PAG if self.is_ki() => self.pager.datao(word),
            _ => self.bus.datao(dev, &mut self.pi, word),
        }
    }

    fn io_datai(&mut self, dev: u64) -> u64 {
        match dev {
            // Reading the data switches; without a console panel the
            // word comes back unchanged.
            APR | PI => self.ar,
            PAG if self.is_ki() => self.pager.datai(),
            _ => self.bus.datai(dev, &mut self.pi),
        }
    }

    /// Processor condition word.  The two models lay their error
    /// flags out differently.
    fn apr_coni(&self) -> u64 {
        if self.is_ki() {
            let mut res = u64::from(self.clk_irq) | u64::from(self.apr_irq) << 3;
            res |= u64::from(self.nxm_flag) << 6;
            res |= u64::from(self.inout_fail) << 7;
            res |= u64::from(self.clk_flg) << 9;
            res |= u64::from(self.clk_en) << 10;
            res |= u64::from(self.timer_irq) << 14;
            res |= u64::from(self.pi.parity_irq) << 15;
            res |= u64::from(self.timer_flg) << 17;
            res
        } else {
            let mut res = u64::from(self.apr_irq);
            res |= u64::from(self.flags.overflow()) << 3;
            res |= u64::from(self.ov_irq) << 4;
            res |= u64::from(self.flags.float_overflow()) << 6;
            res |= u64::from(self.fov_irq) << 7;
            res |= u64::from(self.clk_flg) << 9;
            res |= u64::from(self.clk_en) << 10;
            res |= u64::from(self.nxm_flag) << 12;
            res |= u64::from(self.mem_prot) << 13;
            res |= u64::from(self.flags.user_io()) << 15;
            res |= u64::from(self.push_ovf) << 16;
            res
        }
    }

    /// Set and clear the processor's trap conditions.
    fn apr_cono(&mut self, word: u64) {
        if self.is_ki() {
            self.clk_irq = (word & 0o7) as u32;
            self.apr_irq = ((word >> 3) & 0o7) as u32;
            if word & 0o000_100 != 0 {
                self.nxm_flag = false;
            }
            if word & 0o000_200 != 0 {
                self.inout_fail = false;
            }
            if word & 0o001_000 != 0 {
                self.clk_flg = false;
                self.pi.clr_interrupt(PI);
            }
            if word & 0o002_000 != 0 {
                self.clk_en = true;
            }
            if word & 0o004_000 != 0 {
                self.clk_en = false;
            }
            if word & 0o040_000 != 0 {
                self.timer_irq = true;
            }
            if word & 0o100_000 != 0 {
                self.timer_irq = false;
            }
            if word & 0o400_000 != 0 {
                self.timer_flg = false;
            }
        } else {
            self.clk_irq = (word & 0o7) as u32;
            self.apr_irq = self.clk_irq;
            if word & 0o000_010 != 0 {
                self.flags.clear_overflow();
            }
            if word & 0o000_020 != 0 {
                self.ov_irq = true;
            }
            if word & 0o000_040 != 0 {
                self.ov_irq = false;
            }
            if word & 0o000_100 != 0 {
                self.flags.clear_float_overflow();
            }
            if word & 0o000_200 != 0 {
                self.fov_irq = true;
            }
            if word & 0o000_400 != 0 {
                self.fov_irq = false;
            }
            if word & 0o001_000 != 0 {
                self.clk_flg = false;
                self.pi.clr_interrupt(PI);
            }
            if word & 0o002_000 != 0 {
                self.clk_en = true;
            }
            if word & 0o004_000 != 0 {
                self.clk_en = false;
            }
            if word & 0o010_000 != 0 {
                self.nxm_flag = false;
            }
            if word & 0o020_000 != 0 {
                self.mem_prot = false;
            }
            if word & 0o200_000 != 0 {
                self.bus.reset_all(&mut self.pi);
            }
            if word & 0o400_000 != 0 {
                self.push_ovf = false;
            }
        }
        self.check_apr_irq();
    }
}
