//! Simulated time and the device service queue.
//!
//! Time advances one tick per memory cycle, so intervals here are
//! roughly microseconds.  Devices (and the processor's own interval
//! clock) put themselves in the queue to be serviced some number of
//! ticks in the future; the execution loop drains whatever is due
//! between instructions.
use base::collections::TickQueue;

#[derive(Debug, Default)]
pub struct EventQueue {
    now: u64,
    queue: TickQueue<u64>,
}

impl EventQueue {
    pub fn new() -> EventQueue {
        EventQueue::default()
    }

    /// The current tick count.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Burn `ticks` of simulated time.
    pub fn advance(&mut self, ticks: u64) {
        self.now += ticks;
    }

    /// Ask for `code` to be serviced `delay` ticks from now.
    pub fn schedule(&mut self, code: u64, delay: u64) {
        self.queue.schedule(code, self.now + delay);
    }

    pub fn cancel(&mut self, code: u64) {
        self.queue.cancel(&code);
    }

    /// The next device code whose service time has arrived, if any.
    pub fn take_due(&mut self) -> Option<u64> {
        self.queue.take_due(self.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_in_order() {
        let mut q = EventQueue::new();
        q.schedule(0o020, 10);
        q.schedule(0o024, 5);
        assert_eq!(q.take_due(), None);
        q.advance(5);
        assert_eq!(q.take_due(), Some(0o024));
        assert_eq!(q.take_due(), None);
        q.advance(5);
        assert_eq!(q.take_due(), Some(0o020));
    }

    #[test]
    fn test_cancel_and_replace() {
        let mut q = EventQueue::new();
        q.schedule(0o020, 10);
        q.cancel(0o020);
        q.advance(10);
        assert_eq!(q.take_due(), None);

        q.schedule(0o020, 3);
        q.schedule(0o020, 7);
        q.advance(3);
        assert_eq!(q.take_due(), None);
        q.advance(4);
        assert_eq!(q.take_due(), Some(0o020));
    }
}
