//! Shared helpers

pub mod persist;
pub mod time;
