//! Data models for worker runs
//!
//! This module contains the values exchanged with the coordinator.

mod record;

pub use record::{is_split_addressed, Location, ResultRecord, RunOutcome};
