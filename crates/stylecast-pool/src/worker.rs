//! Per-runner worker loop.
//!
//! One OS thread per runner; the runner never leaves it. At most one job is
//! in flight per worker at any time, which bounds per-device contention.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use stylecast_core::Device;
use stylecast_model::Runner;

use crate::messages::{Feed, Outcome};

/// Worker lifecycle phase, tracked for logging and reasoning only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerPhase {
    Idle,
    Running,
    ShuttingDown,
    Terminated,
}

/// Runs one worker loop until halt, apply failure, or channel closure.
pub(crate) fn worker_main(
    mut runner: Box<dyn Runner>,
    feed_rx: Receiver<Feed>,
    outcome_tx: Sender<Outcome>,
    poll_timeout: Duration,
) {
    let device = runner.device();
    let mut phase = WorkerPhase::Idle;

    loop {
        let feed = match feed_rx.recv_timeout(poll_timeout) {
            Ok(feed) => feed,
            // Empty poll: not an error, retry.
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                // Dispatcher vanished without a halt; treat it as one.
                set_phase(&mut phase, WorkerPhase::ShuttingDown, device);
                let _ = outcome_tx.send(Outcome::Halt);
                set_phase(&mut phase, WorkerPhase::Terminated, device);
                break;
            },
        };

        match feed {
            Feed::Halt => {
                set_phase(&mut phase, WorkerPhase::ShuttingDown, device);
                let _ = outcome_tx.send(Outcome::Halt);
                set_phase(&mut phase, WorkerPhase::Terminated, device);
                break;
            },
            Feed::Job(job) => {
                set_phase(&mut phase, WorkerPhase::Running, device);
                let result = runner.apply(job);
                let failed = result.is_err();
                if let Err(error) = &result {
                    warn!(device = %device, message = %error, "apply failed");
                }
                if outcome_tx.send(Outcome::Finished(result)).is_err() {
                    // Collector is gone; nothing left to produce for.
                    set_phase(&mut phase, WorkerPhase::Terminated, device);
                    break;
                }
                if failed {
                    // A failing job ends this worker's loop. The final halt
                    // lets the collector retire the lane instead of polling
                    // it forever.
                    let _ = outcome_tx.send(Outcome::Halt);
                    set_phase(&mut phase, WorkerPhase::Terminated, device);
                    break;
                }
                set_phase(&mut phase, WorkerPhase::Idle, device);
            },
        }
    }
}

fn set_phase(phase: &mut WorkerPhase, next: WorkerPhase, device: Device) {
    if *phase == next {
        return;
    }
    debug!(device = %device, from = ?*phase, to = ?next, "worker phase");
    *phase = next;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossbeam_channel::unbounded;

    use stylecast_core::{Device, Job, Tensor};
    use stylecast_model::error::{ApplyError, ModelError};
    use stylecast_model::Runner;

    use super::worker_main;
    use crate::messages::{Feed, Outcome};

    /// Echoes the job's parameter count; fails on empty jobs.
    struct EchoRunner;

    impl Runner for EchoRunner {
        fn device(&self) -> Device {
            Device::Cpu
        }

        fn load(&mut self) -> Result<(), ModelError> {
            Ok(())
        }

        fn apply(&mut self, job: Job) -> Result<Tensor, ApplyError> {
            if job.is_empty() {
                return Err(ApplyError::MissingParam { name: "source" });
            }
            Ok(Tensor::from_vec(&[1], vec![job.len() as f32], Device::Cpu))
        }
    }

    fn spawn_worker() -> (
        crossbeam_channel::Sender<Feed>,
        crossbeam_channel::Receiver<Outcome>,
        std::thread::JoinHandle<()>,
    ) {
        let (feed_tx, feed_rx) = unbounded();
        let (outcome_tx, outcome_rx) = unbounded();
        let join = std::thread::spawn(move || {
            worker_main(
                Box::new(EchoRunner),
                feed_rx,
                outcome_tx,
                Duration::from_millis(1),
            )
        });
        (feed_tx, outcome_rx, join)
    }

    #[test]
    fn halt_is_forwarded_once_and_ends_the_loop() {
        let (feed_tx, outcome_rx, join) = spawn_worker();
        feed_tx.send(Feed::Halt).expect("send halt");

        assert!(matches!(
            outcome_rx.recv_timeout(Duration::from_secs(1)),
            Ok(Outcome::Halt)
        ));
        join.join().expect("worker thread joins");
        // Queue closed after the final halt; nothing else was produced.
        assert!(outcome_rx.recv().is_err());
    }

    #[test]
    fn results_precede_a_shutdown_halt() {
        let (feed_tx, outcome_rx, join) = spawn_worker();
        feed_tx
            .send(Feed::Job(Job::new().with(
                "source",
                stylecast_core::JobValue::Raw(Tensor::from_vec(&[1], vec![0.0], Device::Cpu)),
            )))
            .expect("send job");
        feed_tx.send(Feed::Halt).expect("send halt");

        assert!(matches!(
            outcome_rx.recv_timeout(Duration::from_secs(1)),
            Ok(Outcome::Finished(Ok(_)))
        ));
        assert!(matches!(
            outcome_rx.recv_timeout(Duration::from_secs(1)),
            Ok(Outcome::Halt)
        ));
        join.join().expect("worker thread joins");
    }

    #[test]
    fn apply_failure_surfaces_then_halts_the_worker() {
        let (feed_tx, outcome_rx, join) = spawn_worker();
        feed_tx.send(Feed::Job(Job::new())).expect("send bad job");
        // Queued behind the failing job; must never be processed.
        feed_tx
            .send(Feed::Job(Job::new().with(
                "source",
                stylecast_core::JobValue::Raw(Tensor::from_vec(&[1], vec![0.0], Device::Cpu)),
            )))
            .expect("send follow-up job");

        assert!(matches!(
            outcome_rx.recv_timeout(Duration::from_secs(1)),
            Ok(Outcome::Finished(Err(ApplyError::MissingParam { .. })))
        ));
        assert!(matches!(
            outcome_rx.recv_timeout(Duration::from_secs(1)),
            Ok(Outcome::Halt)
        ));
        join.join().expect("worker thread joins");
        assert!(outcome_rx.recv().is_err());
    }

    #[test]
    fn dispatcher_disconnect_counts_as_halt() {
        let (feed_tx, outcome_rx, join) = spawn_worker();
        drop(feed_tx);

        assert!(matches!(
            outcome_rx.recv_timeout(Duration::from_secs(1)),
            Ok(Outcome::Halt)
        ));
        join.join().expect("worker thread joins");
    }
}
