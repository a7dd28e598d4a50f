//! Single-writer update queue.
//!
//! Producers hand over zero-argument jobs without blocking. One worker task
//! runs them to completion, one at a time, in the order they were enqueued.
//! A failing or panicking job is logged and the worker moves on. Stopping
//! the queue drops whatever has not started yet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;

use crate::error::{Result, TrackerError};

type Job = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

struct Envelope {
    label: &'static str,
    job: Job,
}

pub struct UpdateQueue {
    tx: mpsc::UnboundedSender<Envelope>,
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Receipt for a job enqueued with [`UpdateQueue::call`].
pub struct Ticket<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Ticket<T> {
    /// Wait for the job's result.
    ///
    /// Fails with [`TrackerError::TaskAborted`] if the job panicked or was
    /// dropped by a shutdown before it ran.
    pub async fn wait(self) -> Result<T> {
        self.rx.await.map_err(|_| TrackerError::TaskAborted)?
    }
}

impl UpdateQueue {
    /// Spawn the worker on the current Tokio runtime.
    pub fn start() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));
        let stop = Arc::new(Notify::new());

        let worker = tokio::spawn(run_worker(rx, running.clone(), stop.clone()));
        tracing::debug!("Update worker started");

        Self {
            tx,
            running,
            stop,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Enqueue a job whose outcome only matters to the log.
    pub fn submit<F>(&self, label: &'static str, job: F) -> Result<()>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        if !self.is_running() {
            return Err(TrackerError::QueueClosed);
        }
        self.tx
            .send(Envelope {
                label,
                job: Box::new(job),
            })
            .map_err(|_| TrackerError::QueueClosed)
    }

    /// Enqueue a job and get a [`Ticket`] for its result.
    ///
    /// The job is enqueued before this returns, so its position is fixed
    /// regardless of when the ticket is awaited.
    pub fn call<T, F>(&self, label: &'static str, job: F) -> Result<Ticket<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.submit(label, move || {
            // The caller owns the error; a dropped ticket is not a failure.
            let _ = tx.send(job());
            Ok(())
        })?;
        Ok(Ticket { rx })
    }

    /// Signal the worker to exit after the job it is running, if any.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            self.stop.notify_one();
            tracing::debug!("Update queue stop requested");
        }
    }

    /// Stop and wait for the worker to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::error!("Update worker terminated abnormally: {}", e);
            }
        }
    }
}

impl Drop for UpdateQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
) {
    loop {
        let envelope = tokio::select! {
            biased;
            _ = stop.notified() => break,
            next = rx.recv() => match next {
                Some(envelope) => envelope,
                None => break,
            },
        };
        if !running.load(Ordering::Acquire) {
            break;
        }
        execute(envelope).await;
    }

    let dropped = std::iter::from_fn(|| rx.try_recv().ok()).count();
    tracing::debug!("Update worker stopped, {} pending job(s) dropped", dropped);
}

async fn execute(envelope: Envelope) {
    let Envelope { label, job } = envelope;
    match tokio::task::spawn_blocking(job).await {
        Ok(Ok(())) => tracing::trace!(task = label, "Update job finished"),
        Ok(Err(e)) => tracing::error!(task = label, "Update job failed: {:#}", e),
        Err(e) if e.is_panic() => tracing::error!(task = label, "Update job panicked"),
        Err(e) => tracing::error!(task = label, "Update job cancelled: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc as std_mpsc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_jobs_run_once_in_enqueue_order_without_overlap() {
        let queue = Arc::new(UpdateQueue::start());
        let enqueued = Arc::new(Mutex::new(Vec::new()));
        let executed = Arc::new(Mutex::new(Vec::new()));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicBool::new(false));

        let producers: Vec<_> = (0..3)
            .map(|producer| {
                let queue = queue.clone();
                let enqueued = enqueued.clone();
                let executed = executed.clone();
                let in_flight = in_flight.clone();
                let overlapped = overlapped.clone();
                std::thread::spawn(move || {
                    for n in 0..5 {
                        let id = producer * 10 + n;
                        let executed = executed.clone();
                        let in_flight = in_flight.clone();
                        let overlapped = overlapped.clone();
                        // Hold the log while enqueueing so it records true queue order.
                        let mut log = enqueued.lock();
                        queue
                            .submit("record", move || {
                                if in_flight.fetch_add(1, Ordering::SeqCst) != 0 {
                                    overlapped.store(true, Ordering::SeqCst);
                                }
                                std::thread::sleep(std::time::Duration::from_millis(1));
                                executed.lock().push(id);
                                in_flight.fetch_sub(1, Ordering::SeqCst);
                                Ok(())
                            })
                            .unwrap();
                        log.push(id);
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        queue.call("barrier", || Ok(())).unwrap().wait().await.unwrap();

        assert_eq!(*executed.lock(), *enqueued.lock());
        assert_eq!(executed.lock().len(), 15);
        assert!(!overlapped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failing_jobs_do_not_stop_worker() {
        let queue = UpdateQueue::start();
        queue
            .submit("fails", || Err(anyhow::anyhow!("bad update")))
            .unwrap();
        queue.submit("panics", || panic!("worse update")).unwrap();

        let value = queue.call("after", || Ok(42)).unwrap().wait().await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_panicking_call_reports_aborted() {
        let queue = UpdateQueue::start();
        let ticket = queue
            .call::<(), _>("panics", || panic!("boom"))
            .unwrap();
        assert!(matches!(ticket.wait().await, Err(TrackerError::TaskAborted)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_drops_pending_work() {
        let queue = UpdateQueue::start();
        let ran = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = std_mpsc::channel();
        let (gate_tx, gate_rx) = std_mpsc::channel::<()>();

        let first = ran.clone();
        queue
            .submit("blocking", move || {
                started_tx.send(()).ok();
                gate_rx.recv().ok();
                first.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        tokio::task::spawn_blocking(move || started_rx.recv())
            .await
            .unwrap()
            .unwrap();

        let second = ran.clone();
        let pending = queue
            .call("pending", move || {
                second.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        queue.stop();
        gate_tx.send(()).unwrap();
        queue.shutdown().await;

        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(matches!(pending.wait().await, Err(TrackerError::TaskAborted)));
        assert!(matches!(
            queue.submit("late", || Ok(())),
            Err(TrackerError::QueueClosed)
        ));
    }
}
