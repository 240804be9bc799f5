//! Pool lifecycle: thread spawning, submission, shutdown.

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::info;

use stylecast_core::Job;
use stylecast_model::Runner;

use crate::collector::collect_main;
use crate::config::PoolConfig;
use crate::dispatcher::dispatch_main;
use crate::error::PoolError;
use crate::messages::{Feed, JobOutcome};
use crate::worker::worker_main;

/// Handle to a running pool: N worker threads plus one dispatcher and one
/// collector.
///
/// The shared feed and outcome channels are the integration point for any
/// external transport; `submit` and [`RunnerPool::outcomes`] are thin
/// wrappers over them. Results arrive in completion order — callers that
/// need submission order must carry a correlation parameter in the job and
/// re-sequence downstream.
pub struct RunnerPool {
    feed_tx: Sender<Feed>,
    outcome_rx: Receiver<JobOutcome>,
    dispatch_join: JoinHandle<()>,
    collect_join: JoinHandle<()>,
    worker_joins: Vec<JoinHandle<()>>,
}

impl RunnerPool {
    /// Spawns the pool over an ordered list of loaded runners.
    pub fn start(runners: Vec<Box<dyn Runner>>, config: PoolConfig) -> Result<Self, PoolError> {
        if runners.is_empty() {
            return Err(PoolError::NoRunners);
        }

        let (feed_tx, feed_rx) = bounded::<Feed>(config.feed_capacity);
        let (outcome_tx, outcome_rx) = bounded::<JobOutcome>(config.outcome_capacity);

        let mut worker_feed_txs = Vec::with_capacity(runners.len());
        let mut worker_outcome_rxs = Vec::with_capacity(runners.len());
        let mut worker_joins = Vec::with_capacity(runners.len());

        for runner in runners {
            let device = runner.device();
            let (worker_feed_tx, worker_feed_rx) = bounded::<Feed>(config.worker_feed_capacity);
            let (worker_outcome_tx, worker_outcome_rx) =
                bounded(config.worker_outcome_capacity);
            worker_feed_txs.push(worker_feed_tx);
            worker_outcome_rxs.push(worker_outcome_rx);

            let poll_timeout = config.poll_timeout;
            let join = std::thread::Builder::new()
                .name(format!("stylecast-worker-{device}"))
                .spawn(move || {
                    worker_main(runner, worker_feed_rx, worker_outcome_tx, poll_timeout)
                })
                .map_err(|source| PoolError::Spawn {
                    thread: "worker",
                    source,
                })?;
            worker_joins.push(join);
        }

        let poll_timeout = config.poll_timeout;
        let dispatch_join = std::thread::Builder::new()
            .name("stylecast-dispatch".to_string())
            .spawn(move || dispatch_main(feed_rx, worker_feed_txs, poll_timeout))
            .map_err(|source| PoolError::Spawn {
                thread: "dispatcher",
                source,
            })?;

        let poll_timeout = config.poll_timeout;
        let collect_join = std::thread::Builder::new()
            .name("stylecast-collect".to_string())
            .spawn(move || collect_main(worker_outcome_rxs, outcome_tx, poll_timeout))
            .map_err(|source| PoolError::Spawn {
                thread: "collector",
                source,
            })?;

        info!(workers = worker_joins.len(), "runner pool started");
        Ok(Self {
            feed_tx,
            outcome_rx,
            dispatch_join,
            collect_join,
            worker_joins,
        })
    }

    /// Submits one job; blocks while the shared feed is full.
    pub fn submit(&self, job: Job) -> Result<(), PoolError> {
        self.feed_tx
            .send(Feed::Job(job))
            .map_err(|_| PoolError::FeedClosed)
    }

    /// Shared outcome channel; disconnects once the pool has fully drained
    /// after a shutdown.
    pub fn outcomes(&self) -> &Receiver<JobOutcome> {
        &self.outcome_rx
    }

    /// Sends the halt, joins every thread, and returns whatever outcomes
    /// were still in flight. In-flight jobs finish before their workers
    /// observe the halt.
    pub fn shutdown(self) -> Result<Vec<JobOutcome>, PoolError> {
        let _ = self.feed_tx.send(Feed::Halt);
        drop(self.feed_tx);

        // Keep draining while threads wind down; the collector owns the only
        // outcome sender, so disconnect doubles as its completion signal.
        let remainder: Vec<JobOutcome> = self.outcome_rx.iter().collect();

        self.dispatch_join
            .join()
            .map_err(|_| PoolError::ThreadPanicked {
                thread: "dispatcher",
            })?;
        for join in self.worker_joins {
            join.join()
                .map_err(|_| PoolError::ThreadPanicked { thread: "worker" })?;
        }
        self.collect_join
            .join()
            .map_err(|_| PoolError::ThreadPanicked {
                thread: "collector",
            })?;

        info!(drained = remainder.len(), "runner pool shut down");
        Ok(remainder)
    }
}

#[cfg(test)]
#[path = "tests/pool.rs"]
mod pool_tests;
