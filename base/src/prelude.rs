//! The prelude exports the word masks and helpers that nearly every
//! user of the base crate wants in scope.  Providing this prelude is
//! the main purpose of the base crate.
pub use super::instruction::Instruction;
pub use super::word::{
    cm, join, leading_zeros, left, negate, right, swap, C1, CMASK, FMASK, LMASK, LSIGN, RMASK,
    SMASK,
};
