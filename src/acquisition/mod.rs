// src/acquisition/mod.rs
//! Channel configuration, trigger arming and the acquisition session

pub mod channels;
pub mod trigger;
pub mod state;
pub mod session;

pub use channels::*;
pub use trigger::*;
pub use state::*;
pub use session::*;
