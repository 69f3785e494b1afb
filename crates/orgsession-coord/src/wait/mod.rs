//! Parent wait protocol.

pub mod outcome;
pub mod protocol;

pub use outcome::{ParentObservation, WaitOutcome};
pub use protocol::{MIN_POLL_INTERVAL, ParentWaitProtocol, WaitOptions};
