//! Background loops owned by a monitoring session.

pub mod refresh_loop;
pub mod sample_loop;
