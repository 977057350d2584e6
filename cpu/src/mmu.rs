//! Address translation.
//!
//! The two processor models relocate user addresses in entirely
//! different ways.  The KA10 has protection/relocation registers: a
//! user address is bounds-checked against a segment length and then
//! offset by a relocation constant, both in 1024-word units.  The
//! KI10 has a pager: the 18-bit virtual space is split into 512-word
//! pages looked up in per-space page tables rooted at the executive
//! and user base registers.
//!
//! Executive-mode addresses on the KA10, and all addresses while the
//! KI10 pager is off, pass through untranslated.  Translation
//! failures abort the current memory reference; what happens next
//! (protection flag and interrupt on the KA10, a recorded page-fail
//! word on the KI10) is the execution loop's business, so the
//! methods here only report the failure.
use base::word::{LSIGN, RMASK, SMASK};

use crate::memory::MemoryUnit;

/// A reference the KA10 protection registers refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemProt;

/// A reference the KI10 pager refused; the page-fail word has
/// already been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFail;

/// KA10 protection and relocation state, loaded by DATAO APR.
///
/// Bounds and relocations are in units of 1024 words.  A user
/// address is valid in the low segment when its 1K page number does
/// not exceed `low_bound`; with two-segment mode on, addresses with
/// bit 18 set get the same treatment against the high registers.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseBounds {
    pub low_bound: u64,
    pub low_reloc: u64,
    pub high_bound: u64,
    pub high_reloc: u64,
    pub high_write_protect: bool,
    pub two_segment: bool,
}

impl BaseBounds {
    /// Load the protection and relocation registers from a DATAO APR
    /// word.
    pub fn load(&mut self, word: u64) {
        self.high_reloc = (word >> 1) & 0o377;
        self.low_reloc = (word >> 10) & 0o377;
        self.high_write_protect = (word >> 18) & 1 != 0;
        self.high_bound = (word >> 19) & 0o377;
        self.low_bound = (word >> 28) & 0o377;
    }

    /// Translate a user-mode address.  Executive references do not
    /// come here at all.
    pub fn translate(&self, addr: u64, write: bool) -> Result<u64, MemProt> {
        if addr <= (self.low_bound << 10) + 0o1777 {
            Ok((addr + (self.low_reloc << 10)) & RMASK)
        } else if self.two_segment
            && !(write && self.high_write_protect)
            && addr & 0o400_000 != 0
            && addr <= (self.high_bound << 10) + 0o1777
        {
            Ok((addr + (self.high_reloc << 10)) & RMASK)
        } else {
            Err(MemProt)
        }
    }
}

/// KI10 pager state, loaded by DATAO and CONO to the paging device.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pager {
    pub enabled: bool,
    /// Physical base of the executive process table.
    pub eb_ptr: u64,
    /// Physical base of the user process table.
    pub ub_ptr: u64,
    /// Restrict user space to 32K split between low and high ends.
    pub small_user: bool,
    pub user_addr_cmp: bool,
    /// Current fast-memory block, pre-shifted: 0o00, 0o20, 0o40 or
    /// 0o60.
    pub ac_block: u64,
    /// Offset in the user process table of the shadow AC stack used
    /// by executive XCT.
    pub ac_stack: u64,
    pub reload_counter: u64,
    /// The page-fail word recorded by the most recent refused
    /// reference.
    pub fault_data: u64,
}

impl Pager {
    /// Handle DATAO to the paging device: the sign bits of each half
    /// select which base register to load.
    pub fn datao(&mut self, word: u64) {
        if word & LSIGN != 0 {
            self.eb_ptr = (word & 0o17_777) << 9;
            self.enabled = word & 0o20_000 != 0;
        }
        if word & SMASK != 0 {
            self.ub_ptr = ((word >> 18) & 0o17_777) << 9;
            self.user_addr_cmp = word & 0o000_020_000_000_000 != 0;
            self.small_user = word & 0o000_040_000_000_000 != 0;
            self.ac_block = (word & 0o000_300_000_000_000) >> 29;
        }
    }

    /// Compose the DATAI word describing the current pager setup.
    pub fn datai(&self) -> u64 {
        let mut res = self.eb_ptr >> 9;
        if self.enabled {
            res |= 0o20_000;
        }
        res |= self.ub_ptr << 9;
        if self.user_addr_cmp {
            res |= 0o000_020_000_000_000;
        }
        if self.small_user {
            res |= 0o000_040_000_000_000;
        }
        res | (self.ac_block << 29)
    }

    /// Handle CONO to the paging device: AC stack base and the page
    /// table reload counter.
    pub fn cono(&mut self, word: u64) {
        self.ac_stack = (word >> 9) & 0o760;
        self.reload_counter = word & 0o37;
    }

    /// Translate one reference.  `user` says which space the
    /// reference belongs to, with any executive-XCT override already
    /// applied by the caller.
    pub fn translate(
        &mut self,
        mem: &MemoryUnit,
        addr: u64,
        user: bool,
        write: bool,
    ) -> Result<u64, PageFail> {
        let mut page = (addr & RMASK) >> 9;
        let base;
        if user {
            base = self.ub_ptr;
            if self.small_user && addr & 0o340_000 != 0 {
                self.fault_data = (page << 18) | (1 << 28);
                return Err(PageFail);
            }
        } else {
            if !self.enabled {
                return Ok(addr);
            }
            if addr & 0o340_000 == 0o340_000 {
                // Pages 340-377 map through the user process table.
                base = self.ub_ptr;
                page += 0o1000 - 0o340;
            } else if addr & 0o400_000 != 0 {
                base = self.eb_ptr;
            } else {
                return Ok(addr);
            }
        }
        // Two halfword entries per table word, even page on the left.
        let mut entry = mem.fetch(base + (page >> 1)).unwrap_or(0);
        if page & 1 == 0 {
            entry >>= 18;
        }
        entry &= RMASK;
        if entry & LSIGN == 0 || (write && entry & 0o100_000 != 0) {
            let mut fault = (page << 18) | 0o20;
            if user {
                fault |= 1 << 28;
            }
            if entry & 0o100_000 != 0 {
                fault |= 0o4;
            }
            if entry & 0o040_000 != 0 {
                fault |= 0o2;
            }
            if write {
                fault |= 1;
            }
            self.fault_data = fault;
            return Err(PageFail);
        }
        Ok(((entry & 0o37_777) << 9) + (addr & 0o777))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConfiguration;

    #[test]
    fn test_base_bounds_low_segment() {
        let mut bb = BaseBounds::default();
        // Pl=1 (2K valid), Rl=4 (relocate by 4K).
        bb.load((1 << 28) | (4 << 10));
        assert_eq!(bb.translate(0o1777, false), Ok(0o11_777));
        assert_eq!(bb.translate(0o3777, false), Ok(0o13_777));
        assert_eq!(bb.translate(0o4000, false), Err(MemProt));
    }

    #[test]
    fn test_base_bounds_high_segment_write_protect() {
        let mut bb = BaseBounds {
            two_segment: true,
            ..BaseBounds::default()
        };
        // Ph covers the whole high moiety, Pflag set, Rh zero.
        bb.load((0o377 << 19) | (1 << 18));
        assert_eq!(bb.translate(0o400_100, false), Ok(0o400_100));
        assert_eq!(bb.translate(0o400_100, true), Err(MemProt));
    }

    fn pager_with_table() -> (Pager, MemoryUnit) {
        let mut mem = MemoryUnit::new(&MemoryConfiguration { k_words: 64 }, 4096)
            .expect("64K fits");
        let mut pager = Pager::default();
        // User process table at physical 1000; map user page 0 to
        // physical page 100 (accessible) and user page 1 to physical
        // page 101 but write-protected.
        pager.datao(SMASK | ((0o1000 >> 9) << 18));
        let even = (LSIGN | 0o100) << 18;
        let odd = LSIGN | 0o100_000 | 0o101;
        mem.store(0o1000, even | odd).expect("table in range");
        (pager, mem)
    }

    #[test]
    fn test_pager_user_translation() {
        let (mut pager, mem) = pager_with_table();
        assert_eq!(pager.translate(&mem, 0o123, true, false), Ok(0o100_123));
        assert_eq!(pager.translate(&mem, 0o777, true, false), Ok(0o100_777));
    }

    #[test]
    fn test_pager_write_refused_records_fail_word() {
        let (mut pager, mem) = pager_with_table();
        // Page 1 reads fine but refuses writes.
        assert_eq!(pager.translate(&mem, 0o1000, true, false), Ok(0o101_000));
        assert_eq!(pager.translate(&mem, 0o1000, true, true), Err(PageFail));
        assert_eq!(
            pager.fault_data,
            (1 << 18) | (1 << 28) | 0o20 | 0o4 | 1
        );
    }

    #[test]
    fn test_pager_no_access_page() {
        let (mut pager, mem) = pager_with_table();
        // Page 2 has no table entry at all.
        assert_eq!(pager.translate(&mem, 0o2000, true, false), Err(PageFail));
        assert_eq!(pager.fault_data, (2 << 18) | (1 << 28) | 0o20);
    }

    #[test]
    fn test_pager_small_user_limit() {
        let (mut pager, mem) = pager_with_table();
        pager.small_user = true;
        assert_eq!(pager.translate(&mem, 0o123, true, false), Ok(0o100_123));
        assert_eq!(pager.translate(&mem, 0o40_000, true, false), Err(PageFail));
        assert_eq!(pager.fault_data, (0o40 << 18) | (1 << 28));
    }

    #[test]
    fn test_pager_exec_untranslated_until_enabled() {
        let (mut pager, mem) = pager_with_table();
        pager.enabled = false;
        assert_eq!(pager.translate(&mem, 0o340_123, false, false), Ok(0o340_123));
        // With paging on, exec pages 0-337 are still direct.
        pager.enabled = true;
        assert_eq!(pager.translate(&mem, 0o1234, false, false), Ok(0o1234));
    }

    #[test]
    fn test_datai_round_trip() {
        let mut pager = Pager::default();
        let word = SMASK | LSIGN | ((0o1000 >> 9) << 18) | 0o20_000 | (0o2000 >> 9);
        pager.datao(word);
        assert!(pager.enabled);
        assert_eq!(pager.eb_ptr, 0o2000);
        assert_eq!(pager.ub_ptr, 0o1000);
        let read_back = pager.datai();
        assert_eq!(read_back & 0o17_777, 0o2000 >> 9);
        assert_ne!(read_back & 0o20_000, 0);
    }
}
