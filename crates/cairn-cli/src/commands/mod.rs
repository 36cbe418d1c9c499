//! Command implementations for the cairn binary.

pub mod list;
pub mod stack;
