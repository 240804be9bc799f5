//! Typed errors for pool lifecycle operations.

use thiserror::Error;

/// Errors produced by [`crate::RunnerPool`] lifecycle and submission calls.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool was started with an empty runner list.
    #[error("runner pool requires at least one runner")]
    NoRunners,
    /// A pool thread could not be spawned.
    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        /// Thread role that failed to start.
        thread: &'static str,
        /// I/O error returned by thread spawn.
        #[source]
        source: std::io::Error,
    },
    /// A job was submitted after the feed channel closed.
    #[error("pool feed is closed")]
    FeedClosed,
    /// A pool thread panicked and could not be joined.
    #[error("{thread} thread panicked")]
    ThreadPanicked {
        /// Thread role that panicked.
        thread: &'static str,
    },
}
