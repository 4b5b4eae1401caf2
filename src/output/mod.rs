//! Output formatting module
//!
//! Provides output formats for run outcomes.

mod formatter;

pub use formatter::{write_outcome_to_file, OutputFormat, ResultFormatter};
