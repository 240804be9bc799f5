//! Queue message types.
//!
//! Shutdown travels as a dedicated variant rather than a reserved payload
//! value, so it can never be confused with a legitimate job or result.

use stylecast_core::{Job, Tensor};
use stylecast_model::ApplyError;

/// What one finished job produced.
pub type JobOutcome = Result<Tensor, ApplyError>;

/// Items flowing dispatcher → worker (and into the dispatcher itself).
///
/// `Halt` appears at most once per queue, always last.
pub enum Feed {
    Job(Job),
    Halt,
}

/// Items flowing worker → collector.
///
/// `Halt` appears at most once per queue, always last; the collector never
/// forwards it downstream.
pub enum Outcome {
    Finished(JobOutcome),
    Halt,
}
