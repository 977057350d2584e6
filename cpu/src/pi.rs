//! The priority interrupt system.
//!
//! Seven interrupt levels, level 1 highest.  Levels are carried
//! around as 7-bit masks with level 1 in bit 6 (octal 0100) and
//! level 7 in bit 0, which is how the PI CONO/CONI word lays them
//! out.  Each of the 128 device codes owns one request slot; a
//! device re-raising its interrupt replaces its previous request.
//!
//! A request is granted when its level is on in PIE, no
//! higher-priority level is being serviced (held), and every level
//! above it is completely idle.  Granting moves the level from
//! request to hold; dismissing an interrupt drops the hold and lets
//! the devices re-request.

/// The mask bit for interrupt level `lvl` (1 through 7).
#[inline]
fn level_bit(lvl: u32) -> u32 {
    0o200 >> lvl
}

#[derive(Debug)]
pub struct PiSystem {
    /// Master on/off switch for the whole system.
    pub enabled: bool,
    /// Levels with a pending request (PIR).
    pub pir: u32,
    /// Levels currently being serviced (PIH).
    pub pih: u32,
    /// Levels the program has turned on (PIE).
    pub pie: u32,
    /// At least one device has raised or dropped a request since the
    /// last scan.
    pub pending: bool,
    /// Level selected by the most recent successful scan, 1-7.
    pub enc: u32,
    pub parity_irq: bool,
    dev_irq: [u32; 128],
}

impl Default for PiSystem {
    fn default() -> PiSystem {
        PiSystem {
            enabled: false,
            pir: 0,
            pih: 0,
            pie: 0,
            pending: false,
            enc: 0,
            parity_irq: false,
            dev_irq: [0; 128],
        }
    }
}

impl PiSystem {
    /// Raise the interrupt of device `dev` at level `lvl`; level 0
    /// means no interrupt assigned and is ignored.
    pub fn set_interrupt(&mut self, dev: u64, lvl: u32) {
        let lvl = lvl & 0o7;
        if lvl != 0 {
            self.dev_irq[(dev >> 2) as usize] = level_bit(lvl);
            self.pending = true;
            tracing::event!(
                tracing::Level::TRACE,
                "set irq {:03o} level {}",
                dev & 0o774,
                lvl
            );
        }
    }

    /// Drop any request from device `dev`.
    pub fn clr_interrupt(&mut self, dev: u64) {
        self.dev_irq[(dev >> 2) as usize] = 0;
    }

    /// True when the APR's own slot has a request up.
    pub fn apr_slot_raised(&self) -> bool {
        self.dev_irq[0] != 0
    }

    /// Scan the device requests and decide whether an interrupt can
    /// be granted now.  On success the selected level is left in
    /// [`enc`](PiSystem::enc).
    pub fn check_irq_level(&mut self) -> bool {
        let mut lvl = 0;
        for irq in self.dev_irq.iter() {
            lvl |= irq;
        }
        if lvl == 0 {
            self.pending = false;
        }
        self.pir |= lvl & self.pie;
        // A level may break in only if every level above it is
        // neither requesting nor held.
        let pi_t = (!self.pir & !self.pih) >> 1;
        let mut pi_ok = 0o100 & (self.pir & !self.pih);
        if pi_ok == 0 {
            let mut lvl = 0o040;
            for _ in 2..=7 {
                if lvl & pi_t != 0 {
                    pi_ok |= lvl;
                    lvl >>= 1;
                } else {
                    break;
                }
            }
        }
        let pi_req = self.pir & !self.pih & pi_ok;
        if pi_req != 0 {
            let mut lvl = 1;
            let mut pi_r = pi_req;
            while lvl <= 7 {
                if pi_r & 0o100 != 0 {
                    break;
                }
                pi_r <<= 1;
                lvl += 1;
            }
            self.enc = lvl;
            true
        } else {
            false
        }
    }

    /// Move the granted level from request to hold.
    pub fn set_hold(&mut self) {
        self.pih |= level_bit(self.enc);
        self.pir &= !level_bit(self.enc);
    }

    /// Dismiss the highest-priority held interrupt (JEN and
    /// interrupt-level skip returns).  Returns true when the APR slot
    /// still has a request, so the caller can re-evaluate the APR
    /// conditions.
    pub fn restore_hold(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        let mut lvl = 0o100;
        for _ in 1..=7 {
            if lvl & self.pih != 0 {
                self.pir &= !lvl;
                self.pih &= !lvl;
                break;
            }
            lvl >>= 1;
        }
        self.pending = true;
        self.apr_slot_raised()
    }

    /// Handle CONO PI.
    pub fn cono(&mut self, word: u64) {
        let w = word as u32;
        if w & 0o10_000 != 0 {
            self.pir = 0;
            self.pih = 0;
            self.pie = 0;
            self.enabled = false;
            self.parity_irq = false;
        }
        if w & 0o200 != 0 {
            self.enabled = true;
        }
        if w & 0o400 != 0 {
            self.enabled = false;
        }
        if w & 0o1_000 != 0 {
            self.pie &= !(w & 0o177);
        }
        if w & 0o2_000 != 0 {
            self.pie |= w & 0o177;
        }
        if w & 0o4_000 != 0 {
            self.pir |= w & 0o177;
            self.pending = true;
        }
        if w & 0o40_000 != 0 {
            self.parity_irq = true;
        }
        if w & 0o100_000 != 0 {
            self.parity_irq = false;
        }
    }

    /// Compose the CONI PI word.  The KI10 reports PIR in the left
    /// half; the KA10 leaves it unreadable.
    pub fn coni(&self, show_pir: bool) -> u64 {
        let mut res = u64::from(self.pie);
        res |= u64::from(self.enabled) << 7;
        res |= u64::from(self.pih) << 8;
        res |= u64::from(self.parity_irq) << 15;
        if show_pir {
            res |= u64::from(self.pir) << 18;
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pi_all_on() -> PiSystem {
        let mut pi = PiSystem::default();
        pi.cono(0o2_000 | 0o177); // levels on
        pi.cono(0o200); // system on
        pi
    }

    #[test]
    fn test_highest_level_wins() {
        let mut pi = pi_all_on();
        pi.set_interrupt(0o010, 5);
        pi.set_interrupt(0o014, 3);
        assert!(pi.check_irq_level());
        assert_eq!(pi.enc, 3);
    }

    #[test]
    fn test_lower_level_waits_while_higher_held() {
        let mut pi = pi_all_on();
        pi.set_interrupt(0o014, 3);
        assert!(pi.check_irq_level());
        assert_eq!(pi.enc, 3);
        pi.set_hold();
        pi.clr_interrupt(0o014);

        // Level 5 must wait for the level 3 service to finish.
        pi.set_interrupt(0o010, 5);
        assert!(!pi.check_irq_level());

        // Level 2 breaks in over the held level 3.
        pi.set_interrupt(0o020, 2);
        assert!(pi.check_irq_level());
        assert_eq!(pi.enc, 2);
        pi.set_hold();
        pi.clr_interrupt(0o020);

        // Dismissal order: level 2 first, then 3, then 5 gets its
        // turn.
        assert!(!pi.restore_hold());
        assert_eq!(pi.pih, level_bit(3));
        assert!(!pi.restore_hold());
        assert_eq!(pi.pih, 0);
        assert!(pi.check_irq_level());
        assert_eq!(pi.enc, 5);
    }

    #[test]
    fn test_disabled_levels_do_not_request() {
        let mut pi = PiSystem::default();
        pi.cono(0o200); // system on, no levels on
        pi.set_interrupt(0o010, 4);
        assert!(!pi.check_irq_level());
        // Turning the level on lets the still-raised request through.
        pi.cono(0o2_000 | 0o010);
        assert!(pi.check_irq_level());
        assert_eq!(pi.enc, 4);
    }

    #[test]
    fn test_software_initiated_request() {
        let mut pi = pi_all_on();
        pi.cono(0o4_000 | level_bit(6) as u64);
        assert!(pi.pending);
        assert!(pi.check_irq_level());
        assert_eq!(pi.enc, 6);
    }

    #[test]
    fn test_cono_reset_clears_everything() {
        let mut pi = pi_all_on();
        pi.set_interrupt(0o010, 1);
        assert!(pi.check_irq_level());
        pi.set_hold();
        pi.cono(0o10_000);
        assert!(!pi.enabled);
        assert_eq!(pi.pir, 0);
        assert_eq!(pi.pih, 0);
        assert_eq!(pi.pie, 0);
    }

    #[test]
    fn test_coni_layout() {
        let mut pi = pi_all_on();
        pi.set_interrupt(0o010, 1);
        pi.check_irq_level();
        pi.set_hold();
        let coni = pi.coni(true);
        assert_eq!(coni & 0o177, 0o177);
        assert_ne!(coni & 0o200, 0);
        assert_eq!((coni >> 8) & 0o177, u64::from(level_bit(1)));
        assert_eq!((coni >> 18) & 0o177, 0);
    }
}
