//! Round-robin push loop: shared feed → per-worker queues.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use crate::messages::Feed;

/// Runs the dispatch loop until a halt arrives or the feed closes.
///
/// Jobs are assigned to workers in strict round-robin order matching
/// submission order; nothing is reordered here. The rotation index is a
/// plain local — this thread is its only owner.
pub(crate) fn dispatch_main(
    feed_rx: Receiver<Feed>,
    worker_txs: Vec<Sender<Feed>>,
    poll_timeout: Duration,
) {
    let mut index = 0usize;

    loop {
        let feed = match feed_rx.recv_timeout(poll_timeout) {
            Ok(feed) => feed,
            Err(RecvTimeoutError::Timeout) => continue,
            // Submitter side dropped without a halt; fan one out anyway so
            // workers still shut down cleanly.
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match feed {
            Feed::Halt => break,
            Feed::Job(job) => {
                // Blocking send: a busy worker's full queue is backpressure,
                // not an error. A disconnected queue means the worker died;
                // there is no liveness check, the slot keeps its turn and
                // jobs routed to it are lost.
                if worker_txs[index].send(Feed::Job(job)).is_err() {
                    warn!(worker = index, "worker feed disconnected, dropping job");
                }
                index = (index + 1) % worker_txs.len();
            },
        }
    }

    debug!(workers = worker_txs.len(), "fanning halt to workers");
    for worker_tx in &worker_txs {
        let _ = worker_tx.send(Feed::Halt);
    }
}
