// src/hal/mod.rs
//! Capability interface to the analog I/O subsystem

pub mod traits;
pub mod types;
pub mod simulator;

#[cfg(test)]
mod tests;

pub use traits::*;
pub use types::*;
