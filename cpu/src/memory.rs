//! Physical core memory.
//!
//! Memory is a flat array of 36-bit words, sized in 16K-word banks
//! the way the real machines were.  Accesses past the configured end
//! report a non-existent memory (NXM) fault; the fault policy (flag
//! and interrupt versus operator error) belongs to the caller, which
//! is why both results are plain `Result`s here.
use std::fmt::{self, Display, Formatter};

use crate::stop::ConfigError;

/// A reference to non-existent memory; carries the failing physical
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nxm(pub u64);

impl Display for Nxm {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "reference to non-existent memory at {:08o}", self.0)
    }
}

/// How much memory to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfiguration {
    /// Size in units of 1024 words.  Must be a positive multiple of
    /// 16 (memory came in 16K banks).
    pub k_words: u64,
}

/// The physical core store.
#[derive(Debug)]
pub struct MemoryUnit {
    words: Vec<u64>,
}

impl MemoryUnit {
    pub fn new(config: &MemoryConfiguration, limit_k_words: u64) -> Result<MemoryUnit, ConfigError> {
        let kw = config.k_words;
        if kw == 0 || kw % 16 != 0 || kw > limit_k_words {
            return Err(ConfigError::MemorySize {
                kwords: kw,
                limit: limit_k_words,
            });
        }
        Ok(MemoryUnit {
            words: vec![0; (kw * 1024) as usize],
        })
    }

    /// Size in words.
    pub fn size(&self) -> u64 {
        self.words.len() as u64
    }

    pub fn fetch(&self, addr: u64) -> Result<u64, Nxm> {
        match self.words.get(addr as usize) {
            Some(w) => Ok(*w),
            None => Err(Nxm(addr)),
        }
    }

    pub fn store(&mut self, addr: u64, value: u64) -> Result<(), Nxm> {
        match self.words.get_mut(addr as usize) {
            Some(w) => {
                *w = value & base::word::FMASK;
                Ok(())
            }
            None => Err(Nxm(addr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_16k() -> MemoryUnit {
        MemoryUnit::new(&MemoryConfiguration { k_words: 16 }, 256)
            .expect("16K fits in any configuration")
    }

    #[test]
    fn test_memory_starts_zeroed() {
        let mem = unit_16k();
        assert_eq!(mem.size(), 0o40_000);
        assert_eq!(mem.fetch(0), Ok(0));
        assert_eq!(mem.fetch(0o37_777), Ok(0));
    }

    #[test]
    fn test_store_and_fetch() {
        let mut mem = unit_16k();
        mem.store(0o1000, 0o123_456_701_234).expect("in range");
        assert_eq!(mem.fetch(0o1000), Ok(0o123_456_701_234));
    }

    #[test]
    fn test_nxm_at_exact_boundary() {
        let mut mem = unit_16k();
        // The last configured word works, the first one past it does
        // not.
        assert_eq!(mem.store(0o37_777, 1), Ok(()));
        assert_eq!(mem.store(0o40_000, 1), Err(Nxm(0o40_000)));
        assert_eq!(mem.fetch(0o40_000), Err(Nxm(0o40_000)));
    }

    #[test]
    fn test_bad_sizes_rejected() {
        for kw in [0, 8, 17, 512] {
            assert!(
                MemoryUnit::new(&MemoryConfiguration { k_words: kw }, 256).is_err(),
                "size {kw}K should have been rejected"
            );
        }
    }
}
