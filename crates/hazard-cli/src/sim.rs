//! Walk simulation helpers.

pub mod paths;
pub mod track;

pub use paths::{CircularWalk, LinearWalk, WalkPath};
pub use track::sample_track;
