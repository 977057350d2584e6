//! This crate emulates the processor proper: instruction fetch and
//! execution, the arithmetic and shift paths, the priority interrupt
//! system, memory translation and the in/out device bus.
#![crate_name = "cpu"]

mod bus;
mod control;
mod events;
pub mod flags;
mod history;
mod memory;
mod mmu;
mod pi;
mod stop;

pub use bus::{DeviceBus, DeviceConflict, DeviceOutcome, IoDevice};
pub use control::{CpuModel, Machine, MachineConfig};
pub use events::EventQueue;
pub use history::{History, HistoryEntry};
pub use memory::{MemoryConfiguration, MemoryUnit, Nxm};
pub use mmu::{BaseBounds, Pager};
pub use pi::PiSystem;
pub use stop::{ConfigError, StopReason};
