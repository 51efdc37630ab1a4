//! Background stage workers for off-controller contour generation.
//!
//! [`StageWorker`] runs a fixed pure function on a dedicated OS thread.
//! Scheduling is deliberately tiny: one job in flight on the thread and
//! at most one pending in a mutex-guarded slot. Submitting while a job
//! is already pending supersedes it, so a burst of parameter changes
//! collapses to "current run + latest request" instead of a backlog.
//!
//! There is no mid-job cancellation. [`recreate`](StageWorker::recreate)
//! detaches the current thread and spawns a fresh one; outstanding
//! handles then resolve to a retryable [`WorkerError::Recreated`],
//! enforced by a generation counter checked when a job completes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, info};

/// Why a submitted job did not produce a result.
///
/// All variants are retryable: the worker itself stays usable (or has
/// already been replaced) after any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// A newer submission replaced this job before it started.
    #[error("job superseded by a newer submission")]
    Superseded,
    /// The worker was recreated while this job was queued or running.
    #[error("worker recreated while the job was outstanding")]
    Recreated,
    /// The worker was dropped before this job produced a result.
    #[error("worker disposed before the job completed")]
    Disposed,
}

/// Handle to one submitted job. Resolves exactly once.
#[derive(Debug)]
pub struct JobHandle<O> {
    rx: mpsc::Receiver<Result<O, WorkerError>>,
}

impl<O> JobHandle<O> {
    /// Block until the job resolves.
    ///
    /// # Errors
    ///
    /// Returns the [`WorkerError`] the worker resolved this job with;
    /// a dead channel reads as [`WorkerError::Disposed`].
    pub fn wait(self) -> Result<O, WorkerError> {
        self.rx.recv().map_err(|_| WorkerError::Disposed)?
    }
}

struct Job<I, O> {
    input: I,
    generation: u64,
    reply: mpsc::Sender<Result<O, WorkerError>>,
}

struct Slot<I, O> {
    pending: Option<Job<I, O>>,
    shutdown: bool,
}

struct Shared<I, O> {
    slot: Mutex<Slot<I, O>>,
    available: Condvar,
}

impl<I, O> Shared<I, O> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Slot {
                pending: None,
                shutdown: false,
            }),
            available: Condvar::new(),
        })
    }
}

/// A dedicated worker thread executing one pure function.
///
/// Create one per stage group at session startup and reuse it for all
/// runs. The two-slot queue means callers never wait to submit and the
/// thread never sees more than the most recent outstanding request.
pub struct StageWorker<I, O> {
    name: &'static str,
    run: Arc<dyn Fn(I) -> O + Send + Sync>,
    shared: Arc<Shared<I, O>>,
    generation: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl<I, O> StageWorker<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Spawn the worker thread around `run`.
    #[must_use]
    pub fn new<F>(name: &'static str, run: F) -> Self
    where
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        let run: Arc<dyn Fn(I) -> O + Send + Sync> = Arc::new(run);
        let shared = Shared::new();
        let generation = Arc::new(AtomicU64::new(0));
        let thread = spawn_loop(name, Arc::clone(&run), Arc::clone(&shared), Arc::clone(&generation));
        Self {
            name,
            run,
            shared,
            generation,
            thread: Some(thread),
        }
    }

    /// Submit a job, superseding any not-yet-started pending job.
    pub fn submit(&self, input: I) -> JobHandle<O> {
        let (reply, rx) = mpsc::channel();
        let job = Job {
            input,
            generation: self.generation.load(Ordering::SeqCst),
            reply,
        };
        if let Ok(mut slot) = self.shared.slot.lock() {
            if let Some(old) = slot.pending.replace(job) {
                debug!(worker = self.name, "pending job superseded");
                let _ = old.reply.send(Err(WorkerError::Superseded));
            }
        }
        self.shared.available.notify_one();
        JobHandle { rx }
    }

    /// Replace the worker thread with a fresh one.
    ///
    /// The old thread is detached; when its in-flight job (if any)
    /// finishes, the stale generation makes it resolve to
    /// [`WorkerError::Recreated`] instead of a result. A pending job is
    /// failed immediately. New submissions run on the fresh thread
    /// without waiting for the old one.
    pub fn recreate(&mut self) {
        info!(worker = self.name, "recreating worker thread");
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut slot) = self.shared.slot.lock() {
            slot.shutdown = true;
            if let Some(job) = slot.pending.take() {
                let _ = job.reply.send(Err(WorkerError::Recreated));
            }
        }
        self.shared.available.notify_all();
        // Detach: the old thread may be mid-job and must not block us.
        drop(self.thread.take());

        self.shared = Shared::new();
        self.thread = Some(spawn_loop(
            self.name,
            Arc::clone(&self.run),
            Arc::clone(&self.shared),
            Arc::clone(&self.generation),
        ));
    }
}

impl<I, O> Drop for StageWorker<I, O> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.shared.slot.lock() {
            slot.shutdown = true;
            if let Some(job) = slot.pending.take() {
                let _ = job.reply.send(Err(WorkerError::Disposed));
            }
        }
        self.shared.available.notify_all();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn spawn_loop<I, O>(
    name: &'static str,
    run: Arc<dyn Fn(I) -> O + Send + Sync>,
    shared: Arc<Shared<I, O>>,
    generation: Arc<AtomicU64>,
) -> JoinHandle<()>
where
    I: Send + 'static,
    O: Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || worker_loop(&run, &shared, &generation))
        .unwrap_or_else(|_| {
            // Thread spawn only fails under resource exhaustion; fall
            // back to an inline no-op thread so handles still resolve.
            std::thread::spawn(|| {})
        })
}

fn worker_loop<I, O>(
    run: &Arc<dyn Fn(I) -> O + Send + Sync>,
    shared: &Arc<Shared<I, O>>,
    generation: &Arc<AtomicU64>,
) {
    loop {
        let job = {
            let Ok(mut slot) = shared.slot.lock() else {
                return;
            };
            loop {
                if let Some(job) = slot.pending.take() {
                    break job;
                }
                if slot.shutdown {
                    return;
                }
                slot = match shared.available.wait(slot) {
                    Ok(guard) => guard,
                    Err(_) => return,
                };
            }
        };

        let output = run(job.input);
        if generation.load(Ordering::SeqCst) == job.generation {
            let _ = job.reply.send(Ok(output));
        } else {
            debug!("discarding result from a recreated worker generation");
            let _ = job.reply.send(Err(WorkerError::Recreated));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn sleepy_doubler() -> StageWorker<u64, u64> {
        // Input doubles as a sleep duration in milliseconds.
        StageWorker::new("test", |ms: u64| {
            std::thread::sleep(Duration::from_millis(ms));
            ms * 2
        })
    }

    #[test]
    fn resolves_a_job() {
        let worker = sleepy_doubler();
        assert_eq!(worker.submit(1).wait(), Ok(2));
    }

    #[test]
    fn resolves_sequential_jobs() {
        let worker = sleepy_doubler();
        for ms in [1, 2, 3] {
            assert_eq!(worker.submit(ms).wait(), Ok(ms * 2));
        }
    }

    #[test]
    fn newer_submission_supersedes_pending() {
        let worker = sleepy_doubler();
        let first = worker.submit(150);
        // Let the thread pick the first job up before queueing more.
        std::thread::sleep(Duration::from_millis(40));
        let second = worker.submit(1);
        let third = worker.submit(2);

        assert_eq!(second.wait(), Err(WorkerError::Superseded));
        assert_eq!(third.wait(), Ok(4));
        assert_eq!(first.wait(), Ok(300));
    }

    #[test]
    fn recreate_fails_in_flight_and_pending() {
        let mut worker = sleepy_doubler();
        let in_flight = worker.submit(200);
        std::thread::sleep(Duration::from_millis(40));
        let pending = worker.submit(1);
        worker.recreate();

        assert_eq!(pending.wait(), Err(WorkerError::Recreated));
        assert_eq!(in_flight.wait(), Err(WorkerError::Recreated));
        // The fresh thread serves new work immediately.
        assert_eq!(worker.submit(3).wait(), Ok(6));
    }

    #[test]
    fn drop_fails_pending_job() {
        let worker = sleepy_doubler();
        let _in_flight = worker.submit(100);
        std::thread::sleep(Duration::from_millis(40));
        let pending = worker.submit(1);
        drop(worker);
        assert_eq!(pending.wait(), Err(WorkerError::Disposed));
    }
}
