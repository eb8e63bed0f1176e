//! Subcommand implementations.

pub mod describe;
pub mod produce;
pub mod status;
