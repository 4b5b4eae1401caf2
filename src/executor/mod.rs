//! Worker execution
//!
//! Session lifecycle and the line-based coordinator protocol.

mod protocol;
mod session;

pub use protocol::{serve, Response};
pub use session::WorkerSession;
