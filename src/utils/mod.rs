//! # Utilities Module
//!
//! Deterministic randomness and grid navigation helpers shared by generation,
//! AI and the autopilot.

pub mod navigation;
pub mod random;

pub use navigation::*;
pub use random::*;
