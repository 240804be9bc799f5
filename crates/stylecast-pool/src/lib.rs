//! Round-robin worker pool over device-bound runners.
//!
//! Jobs enter through a shared feed channel, are assigned to workers in
//! strict round-robin submission order by a dispatcher thread, execute one
//! at a time per worker, and leave through a shared outcome channel drained
//! by a collector thread in completion order. Shutdown is cooperative via a
//! halt variant that reaches every worker exactly once.

#![deny(clippy::wildcard_imports)]

mod collector;
mod dispatcher;
mod worker;

pub mod config;
pub mod error;
pub mod messages;
pub mod pool;

pub use config::PoolConfig;
pub use error::PoolError;
pub use messages::{Feed, JobOutcome, Outcome};
pub use pool::RunnerPool;
