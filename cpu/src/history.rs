//! The instruction history ring.
//!
//! When enabled, every instruction (including aborted ones and
//! interrupt-cycle instructions) leaves one entry.  Entries are
//! written incrementally: the program counter and fetched word at
//! fetch time, the effective address once calculated, the operand
//! and result as they become known.
use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct HistoryEntry {
    pub pc: u64,
    /// Fetched instruction word.
    pub inst: u64,
    /// Effective address.
    pub ea: u64,
    /// Selected AC before execution.
    pub ac: u64,
    /// Flag word at fetch, with the error and clock flags packed
    /// into the low four bits.
    pub flags: u32,
    /// Operand as loaded.
    pub operand: u64,
    /// Result as stored.
    pub result: u64,
}

impl HistoryEntry {
    /// Column header matching [`listing`](HistoryEntry::listing).
    pub const HEADER: &'static str = "PC      AC            EA        AR            RES           FLAGS IR";

    /// One display line: PC, AC, EA, operand, result, flags,
    /// instruction word, all octal.
    pub fn listing(&self) -> String {
        format!(
            "{:06o}  {:012o}  {:06o}    {:012o}  {:012o}  {:06o}  {:012o}",
            self.pc, self.ac, self.ea, self.operand, self.result, self.flags, self.inst
        )
    }
}

#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    size: usize,
    next: usize,
    filled: bool,
}

impl History {
    pub fn new(size: usize) -> History {
        History {
            entries: Vec::with_capacity(size),
            size,
            next: 0,
            filled: false,
        }
    }

    /// Change the ring size.  All recorded entries are dropped; a
    /// size of zero switches recording off.
    pub fn resize(&mut self, size: usize) {
        self.entries = Vec::with_capacity(size);
        self.size = size;
        self.next = 0;
        self.filled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.size != 0
    }

    /// Begin an entry for a newly fetched instruction.
    pub fn record(&mut self, entry: HistoryEntry) {
        if !self.is_enabled() {
            return;
        }
        if self.entries.len() < self.size {
            self.entries.push(entry);
            self.next = self.entries.len() % self.size;
            self.filled = self.next == 0;
        } else {
            self.entries[self.next] = entry;
            self.next = (self.next + 1) % self.size;
            self.filled = true;
        }
    }

    /// The entry most recently begun, for filling in as execution
    /// progresses.
    pub fn last_mut(&mut self) -> Option<&mut HistoryEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = if self.next == 0 {
            self.entries.len() - 1
        } else {
            self.next - 1
        };
        self.entries.get_mut(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        let split = if self.filled { self.next } else { 0 };
        self.entries[split..].iter().chain(self.entries[..split].iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pc: u64) -> HistoryEntry {
        HistoryEntry {
            pc,
            ..HistoryEntry::default()
        }
    }

    #[test]
    fn test_disabled_history_records_nothing() {
        let mut h = History::new(0);
        assert!(!h.is_enabled());
        h.record(entry(0o100));
        assert!(h.is_empty());
        assert!(h.last_mut().is_none());
    }

    #[test]
    fn test_ring_keeps_newest() {
        let mut h = History::new(3);
        for pc in [1, 2, 3, 4, 5] {
            h.record(entry(pc));
        }
        let pcs: Vec<u64> = h.iter().map(|e| e.pc).collect();
        assert_eq!(pcs, vec![3, 4, 5]);
    }

    #[test]
    fn test_partial_fill_in_order() {
        let mut h = History::new(8);
        h.record(entry(7));
        h.record(entry(8));
        let pcs: Vec<u64> = h.iter().map(|e| e.pc).collect();
        assert_eq!(pcs, vec![7, 8]);
    }

    #[test]
    fn test_last_mut_patches_current_entry() {
        let mut h = History::new(2);
        h.record(entry(1));
        h.record(entry(2));
        if let Some(e) = h.last_mut() {
            e.result = 0o42;
        }
        let got: Vec<(u64, u64)> = h.iter().map(|e| (e.pc, e.result)).collect();
        assert_eq!(got, vec![(1, 0), (2, 0o42)]);
    }

    #[test]
    fn test_resize_drops_entries() {
        let mut h = History::new(4);
        h.record(entry(1));
        h.resize(2);
        assert!(h.is_empty());
        h.resize(0);
        assert!(!h.is_enabled());
    }

    #[test]
    fn test_listing_format() {
        let e = HistoryEntry {
            pc: 0o1000,
            inst: 0o254_200_001_000,
            ea: 0o1000,
            ac: 0,
            flags: 0,
            operand: 0o42,
            result: 0o42,
        };
        assert_eq!(
            e.listing(),
            "001000  000000000000  001000    000000000042  000000000042  000000  254200001000"
        );
    }
}
