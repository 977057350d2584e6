//! Reasons the simulated processor stops running.
//!
//! A processor fault is not a stop; faults trap through the
//! processor's own vectors and execution continues.  The simulator
//! itself only comes to rest for the reasons enumerated here.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// Why [`run`](crate::control::Machine::run) returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// The program executed a HALT instruction.  The stored address
    /// is the halt address, and the program counter has already
    /// advanced to the resumption address.
    Halted { at: u64 },
    /// The next instruction fetch reached the operator's breakpoint
    /// address; the instruction there has not executed.
    Breakpoint { at: u64 },
    /// The step budget given to `run` was used up before the program
    /// halted.
    StepLimit { steps: u64 },
}

impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            StopReason::Halted { at } => write!(f, "HALT instruction at {at:06o}"),
            StopReason::Breakpoint { at } => write!(f, "breakpoint at {at:06o}"),
            StopReason::StepLimit { steps } => {
                write!(f, "stopped after {steps} steps without halting")
            }
        }
    }
}

/// A bad machine configuration or operator request, reported before
/// or between runs rather than from inside one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The requested memory size is not available on the selected
    /// processor model.  Sizes are in units of 1024 words and must be
    /// a multiple of 16.
    MemorySize { kwords: u64, limit: u64 },
    /// An examine or deposit named an address outside configured
    /// memory.
    AddressOutOfRange { addr: u64, size: u64 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ConfigError::MemorySize { kwords, limit } => {
                write!(
                    f,
                    "memory size {kwords}K is not a multiple of 16K up to {limit}K"
                )
            }
            ConfigError::AddressOutOfRange { addr, size } => {
                write!(
                    f,
                    "address {addr:o} is outside configured memory of {size:o} words"
                )
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(
            StopReason::Halted { at: 0o1000 }.to_string(),
            "HALT instruction at 001000"
        );
        assert_eq!(
            StopReason::Breakpoint { at: 0o472 }.to_string(),
            "breakpoint at 000472"
        );
        assert_eq!(
            StopReason::StepLimit { steps: 16 }.to_string(),
            "stopped after 16 steps without halting"
        );
    }

    #[test]
    fn test_config_error_display() {
        let e = ConfigError::AddressOutOfRange {
            addr: 0o1_000_000,
            size: 0o400_000,
        };
        assert_eq!(
            e.to_string(),
            "address 1000000 is outside configured memory of 400000 words"
        );
    }
}
