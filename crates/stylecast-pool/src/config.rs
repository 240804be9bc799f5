use std::time::Duration;

/// Tuning knobs for the pool's queues and polling cadence.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Bounded timeout used by every queue poll in the pool. Empty polls
    /// are retried, never surfaced.
    pub poll_timeout: Duration,
    /// Capacity of the shared feed channel jobs are submitted into.
    pub feed_capacity: usize,
    /// Capacity of each worker's private input queue. Small on purpose:
    /// a full queue blocks the dispatcher and provides backpressure.
    pub worker_feed_capacity: usize,
    /// Capacity of each worker's private output queue.
    pub worker_outcome_capacity: usize,
    /// Capacity of the shared outcome channel the collector forwards into.
    pub outcome_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(5),
            feed_capacity: 64,
            worker_feed_capacity: 2,
            worker_outcome_capacity: 2,
            outcome_capacity: 64,
        }
    }
}
