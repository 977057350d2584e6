//! The `base` crate defines the machine-word level things which are
//! useful in both a simulator and other associated tools.  The idea
//! is that if you want to write a cross-assembler for the same
//! 36-bit machine, it would depend on the base crate but would not
//! need to depend on the simulator library itself.

pub mod collections;
pub mod instruction;
pub mod prelude;
pub mod word;
