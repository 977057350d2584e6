//! The in-out bus.
//!
//! In-out instructions address one of 128 device codes (written as
//! multiples of 4: APR is 000, PI is 004, and so on).  The processor
//! and its interrupt and paging hardware answer the lowest codes
//! internally; everything else goes through the dispatch table here.
//! A code nobody claims behaves like the real bus with nothing
//! plugged in: CONI and DATAI read zero, CONO and DATAO are ignored.
use std::fmt::{self, Display, Formatter};

use crate::pi::PiSystem;

/// Number of device codes on the bus.
pub const SLOTS: usize = 128;

/// A device answering one code on the in-out bus.
///
/// The four transfer methods correspond to the four bus operations;
/// `service` runs when the tick the device asked for via
/// [`DeviceOutcome::Reschedule`] comes due.  Every method can raise
/// or drop the device's interrupt through the PI system it is
/// handed.
pub trait IoDevice {
    fn name(&self) -> &'static str;

    fn cono(&mut self, pi: &mut PiSystem, word: u64);
    fn coni(&mut self, pi: &PiSystem) -> u64;
    fn datao(&mut self, pi: &mut PiSystem, word: u64);
    fn datai(&mut self, pi: &mut PiSystem) -> u64;

    /// Reset to power-on state.
    fn reset(&mut self, pi: &mut PiSystem);

    /// Scheduled service.  Returning
    /// [`DeviceOutcome::Reschedule`] re-queues the device.
    fn service(&mut self, pi: &mut PiSystem) -> DeviceOutcome {
        let _ = pi;
        DeviceOutcome::Idle
    }
}

/// What a device wants after a service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOutcome {
    Idle,
    /// Call `service` again after this many ticks.
    Reschedule(u64),
}

/// Two devices claimed the same code.
#[derive(Debug)]
pub struct DeviceConflict {
    pub code: u64,
    pub wanted_by: &'static str,
    pub held_by: &'static str,
}

impl Display for DeviceConflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "device number conflict: {} and {} both answer code {:03o}",
            self.held_by, self.wanted_by, self.code
        )
    }
}

impl std::error::Error for DeviceConflict {}

enum Slot {
    Empty,
    /// Answered inside the execution loop, not via the table.
    Internal(&'static str),
    Device(Box<dyn IoDevice>),
}

/// The dispatch table from device code to device.
pub struct DeviceBus {
    slots: Vec<Slot>,
}

impl DeviceBus {
    /// An empty bus with the given codes reserved for
    /// processor-internal devices.
    pub fn new(internal: &[(u64, &'static str)]) -> DeviceBus {
        let mut slots = Vec::with_capacity(SLOTS);
        for _ in 0..SLOTS {
            slots.push(Slot::Empty);
        }
        for (code, name) in internal {
            slots[(code >> 2) as usize] = Slot::Internal(name);
        }
        DeviceBus { slots }
    }

    /// Plug a device in at `code`.
    pub fn attach(&mut self, code: u64, dev: Box<dyn IoDevice>) -> Result<(), DeviceConflict> {
        let slot = &mut self.slots[((code >> 2) as usize) % SLOTS];
        let held_by = match slot {
            Slot::Empty => {
                *slot = Slot::Device(dev);
                return Ok(());
            }
            Slot::Internal(name) => name,
            Slot::Device(d) => d.name(),
        };
        Err(DeviceConflict {
            code: code & 0o774,
            wanted_by: dev.name(),
            held_by,
        })
    }

    fn device(&mut self, code: u64) -> Option<&mut Box<dyn IoDevice>> {
        match &mut self.slots[((code >> 2) as usize) % SLOTS] {
            Slot::Device(d) => Some(d),
            _ => None,
        }
    }

    pub fn cono(&mut self, code: u64, pi: &mut PiSystem, word: u64) {
        if let Some(d) = self.device(code) {
            d.cono(pi, word);
        }
    }

    pub fn coni(&mut self, code: u64, pi: &PiSystem) -> u64 {
        match self.device(code) {
            Some(d) => d.coni(pi),
            None => 0,
        }
    }

    pub fn datao(&mut self, code: u64, pi: &mut PiSystem, word: u64) {
        if let Some(d) = self.device(code) {
            d.datao(pi, word);
        }
    }

    pub fn datai(&mut self, code: u64, pi: &mut PiSystem) -> u64 {
        match self.device(code) {
            Some(d) => d.datai(pi),
            None => 0,
        }
    }

    pub fn reset_all(&mut self, pi: &mut PiSystem) {
        for slot in self.slots.iter_mut() {
            if let Slot::Device(d) = slot {
                d.reset(pi);
            }
        }
    }

    pub fn service(&mut self, code: u64, pi: &mut PiSystem) -> DeviceOutcome {
        match self.device(code) {
            Some(d) => d.service(pi),
            None => DeviceOutcome::Idle,
        }
    }
}
