//! Bounded worker pool
//!
//! A fixed number of tokio tasks share one bounded queue. Each task loops
//! receive, process, repeat until the queue is closed and drained. The queue
//! capacity provides backpressure: `submit` waits while the queue is full.

use async_trait::async_trait;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

/// Processes one job at a time on behalf of a [`WorkerPool`].
///
/// Errors are logged and dropped by the pool. Retry or skip decisions belong
/// to the implementation.
#[async_trait]
pub trait Worker<J>: Send + Sync + 'static
where
    J: Send + 'static,
{
    type Error: Display + Send;

    async fn process(&self, job: J) -> Result<(), Self::Error>;
}

/// Returned by a submit on a closed queue; carries the rejected job back.
#[derive(Debug)]
pub struct PoolClosed<J>(pub J);

impl<J> Display for PoolClosed<J> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("worker pool queue is closed")
    }
}

impl<J: std::fmt::Debug> std::error::Error for PoolClosed<J> {}

/// Cloneable handle for feeding a pool's queue from other tasks.
pub struct JobSender<J> {
    inner: mpsc::Sender<J>,
}

impl<J> Clone for JobSender<J> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<J: Send> JobSender<J> {
    /// Enqueue a job, waiting while the queue is full.
    pub async fn submit(&self, job: J) -> Result<(), PoolClosed<J>> {
        self.inner.send(job).await.map_err(|e| PoolClosed(e.0))
    }
}

/// Fixed-size pool of tokio tasks consuming jobs of type `J`
pub struct WorkerPool<J> {
    name: &'static str,
    workers: usize,
    sender: Option<mpsc::Sender<J>>,
    receiver: Arc<Mutex<mpsc::Receiver<J>>>,
    handles: Vec<JoinHandle<()>>,
}

impl<J: Send + 'static> WorkerPool<J> {
    /// Pool whose queue holds one outstanding job per worker
    pub fn new(name: &'static str, workers: usize) -> Self {
        Self::with_capacity(name, workers, workers)
    }

    /// Pool with an explicit queue capacity
    pub fn with_capacity(name: &'static str, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            name,
            workers: workers.max(1),
            sender: Some(sender),
            receiver: Arc::new(Mutex::new(receiver)),
            handles: Vec::new(),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Launch the worker tasks. Calling this twice is a no-op.
    pub fn start<W>(&mut self, worker: Arc<W>)
    where
        W: Worker<J>,
    {
        if !self.handles.is_empty() {
            warn!(pool = self.name, "Worker pool already started");
            return;
        }

        for worker_id in 0..self.workers {
            let receiver = Arc::clone(&self.receiver);
            let worker = Arc::clone(&worker);
            let pool = self.name;

            self.handles.push(tokio::spawn(async move {
                loop {
                    // Only the task holding the lock waits in recv; the rest queue on the lock.
                    let job = receiver.lock().await.recv().await;
                    let Some(job) = job else {
                        break;
                    };

                    if let Err(e) = worker.process(job).await {
                        debug!(pool, worker_id, error = %e, "Job failed");
                    }
                }
                trace!(pool, worker_id, "Worker exited");
            }));
        }

        debug!(pool = self.name, workers = self.workers, "Worker pool started");
    }

    /// A submit handle sharing this pool's queue, or `None` once closed.
    pub fn sender(&self) -> Option<JobSender<J>> {
        self.sender.as_ref().map(|inner| JobSender {
            inner: inner.clone(),
        })
    }

    /// Enqueue a job, waiting while the queue is full.
    pub async fn submit(&self, job: J) -> Result<(), PoolClosed<J>> {
        match &self.sender {
            Some(sender) => sender.send(job).await.map_err(|e| PoolClosed(e.0)),
            None => Err(PoolClosed(job)),
        }
    }

    /// Drop the pool's own submit handle.
    ///
    /// The queue closes once every [`JobSender`] obtained from [`sender`](Self::sender)
    /// has been dropped as well.
    pub fn close(&mut self) {
        self.sender.take();
    }

    /// Close the pool's handle and wait until every worker has exited.
    pub async fn wait(mut self) {
        self.close();

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!(pool = self.name, error = %e, "Worker task aborted");
            }
        }

        debug!(pool = self.name, "Worker pool drained");
    }
}
