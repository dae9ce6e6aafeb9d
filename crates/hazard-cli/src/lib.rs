//! Hazard CLI - command line tools for the hazard alert engine.
//!
//! Binaries:
//! - hazard-check: one-shot proximity check against the configured sources
//! - simulate-walk: drives a full monitoring session along a simulated walk

pub mod sim;

pub use sim::{sample_track, CircularWalk, LinearWalk, WalkPath};
