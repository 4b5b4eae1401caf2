//! Shared helpers

pub mod logger;
mod timer;

pub use timer::RunTimer;
