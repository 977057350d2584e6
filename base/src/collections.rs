use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::{self, Debug, Formatter};
use std::hash::Hash;

use keyed_priority_queue::KeyedPriorityQueue;

#[derive(Debug)]
struct ReverseOrdered<T> {
    inner: T,
}

impl<T> From<T> for ReverseOrdered<T> {
    fn from(inner: T) -> ReverseOrdered<T> {
        ReverseOrdered { inner }
    }
}

impl<T: Ord> PartialOrd for ReverseOrdered<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Eq> Eq for ReverseOrdered<T> {}

impl<T: Eq> PartialEq for ReverseOrdered<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T: Ord> Ord for ReverseOrdered<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.inner.cmp(&other.inner) {
            Ordering::Less => Ordering::Greater,
            Ordering::Equal => Ordering::Equal,
            Ordering::Greater => Ordering::Less,
        }
    }
}

#[test]
fn test_reverse_order() {
    assert_eq!(ReverseOrdered::from(1), ReverseOrdered::from(1));
    assert_ne!(ReverseOrdered::from(1), ReverseOrdered::from(0));
    assert!(ReverseOrdered::from(1) < ReverseOrdered::from(0));
}

/// A queue of keyed items due at simulated-time ticks, earliest
/// first.  Re-scheduling a key replaces its previous due time.
/// Cancellation is lazy: cancelled keys are remembered and discarded
/// when they surface, so `cancel` never pays for a queue rebuild.
pub struct TickQueue<K: Hash + Eq + Ord> {
    items: KeyedPriorityQueue<K, ReverseOrdered<u64>>,
    dead: HashSet<K>,
}

impl<K> TickQueue<K>
where
    K: Hash + Eq + Ord + Clone,
{
    pub fn new() -> TickQueue<K> {
        TickQueue {
            items: KeyedPriorityQueue::new(),
            dead: HashSet::new(),
        }
    }

    /// Schedule `key` to come due at `tick`, superseding any earlier
    /// schedule or cancellation for the same key.
    pub fn schedule(&mut self, key: K, tick: u64) {
        self.dead.remove(&key);
        self.items.push(key, ReverseOrdered::from(tick));
    }

    /// Forget any pending schedule for `key`.
    pub fn cancel(&mut self, key: &K) {
        if self.items.get_priority(key).is_some() {
            self.dead.insert(key.clone());
        }
    }

    /// Remove and return the next key due at or before `now`.
    pub fn take_due(&mut self, now: u64) -> Option<K> {
        self.discard_dead();
        match self.items.peek() {
            Some((_, p)) if p.inner <= now => self.items.pop().map(|(k, _)| k),
            _ => None,
        }
    }

    pub fn is_empty(&mut self) -> bool {
        self.discard_dead();
        self.items.is_empty()
    }

    fn discard_dead(&mut self) {
        while let Some((k, _)) = self.items.peek() {
            if self.dead.contains(k) {
                if let Some((k, _)) = self.items.pop() {
                    self.dead.remove(&k);
                }
            } else {
                break;
            }
        }
    }
}

impl<K> Default for TickQueue<K>
where
    K: Hash + Eq + Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Debug for TickQueue<K>
where
    K: Hash + Eq + Ord + Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickQueue")
            .field("items", &self.items)
            .field("dead", &self.dead)
            .finish()
    }
}

#[test]
fn test_empty() {
    let mut q: TickQueue<usize> = TickQueue::default();
    assert!(q.is_empty());
    assert_eq!(q.take_due(u64::MAX), None);
}

#[test]
fn test_earliest_first() {
    let mut q: TickQueue<usize> = TickQueue::new();
    q.schedule(3, 500);
    q.schedule(7, 100);
    q.schedule(5, 300);
    assert_eq!(q.take_due(99), None);
    assert_eq!(q.take_due(1_000), Some(7));
    assert_eq!(q.take_due(1_000), Some(5));
    assert_eq!(q.take_due(1_000), Some(3));
    assert!(q.is_empty());
}

#[test]
fn test_nothing_due_yet() {
    let mut q: TickQueue<usize> = TickQueue::new();
    q.schedule(1, 50);
    assert_eq!(q.take_due(49), None);
    assert_eq!(q.take_due(50), Some(1));
}

#[test]
fn test_reschedule_replaces() {
    let mut q: TickQueue<usize> = TickQueue::new();
    q.schedule(1, 500);
    q.schedule(1, 20);
    assert_eq!(q.take_due(20), Some(1));
    assert!(q.is_empty());
}

#[test]
fn test_cancel() {
    let mut q: TickQueue<usize> = TickQueue::new();
    q.schedule(1, 10);
    q.schedule(2, 20);
    q.cancel(&1);
    assert_eq!(q.take_due(19), None);
    assert_eq!(q.take_due(100), Some(2));
    assert!(q.is_empty());
}

#[test]
fn test_schedule_after_cancel_revives() {
    let mut q: TickQueue<usize> = TickQueue::new();
    q.schedule(1, 10);
    q.cancel(&1);
    q.schedule(1, 30);
    assert_eq!(q.take_due(100), Some(1));
    assert!(q.is_empty());
}
