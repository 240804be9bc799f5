//! Round-robin pull loop: per-worker queues → shared outcome channel.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::debug;

use crate::messages::{JobOutcome, Outcome};

/// Runs the collection loop until every worker queue has halted.
///
/// The working set shrinks as workers report halt; delivery order is
/// completion order, not submission order. An empty poll retries the same
/// slot — the rotation only advances past a queue that yielded an item.
pub(crate) fn collect_main(
    worker_rxs: Vec<Receiver<Outcome>>,
    outcome_tx: Sender<JobOutcome>,
    poll_timeout: Duration,
) {
    let mut working_set = worker_rxs;
    let mut index = 0usize;

    while !working_set.is_empty() {
        match working_set[index].recv_timeout(poll_timeout) {
            Ok(Outcome::Finished(outcome)) => {
                if outcome_tx.send(outcome).is_err() {
                    // Consumer side is gone; draining further is pointless.
                    break;
                }
                index = (index + 1) % working_set.len();
            },
            // Halt retires the queue from rotation and is never forwarded.
            Ok(Outcome::Halt) | Err(RecvTimeoutError::Disconnected) => {
                working_set.remove(index);
                if !working_set.is_empty() {
                    index %= working_set.len();
                }
            },
            Err(RecvTimeoutError::Timeout) => {},
        }
    }

    debug!("collector drained all worker queues");
}
