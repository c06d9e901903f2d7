//! Send-message worker pool
//!
//! A fixed number of workers share one bounded queue. Handlers enqueue with a
//! deadline so a saturated pool surfaces as [`Error::Backpressure`] instead of
//! stalling the connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::chat::{ChatInteractor, NewMessage, Notifier};
use crate::error::{Error, Result};
use crate::protocol::{Response, RETRIEVE_FAILED, SEND_FAILED};
use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::stats::ChatStats;

use super::fanout::fan_out;

/// A validated message waiting to be persisted and fanned out
#[derive(Debug)]
pub struct SendJob {
    /// Connection that sent it; receives any error
    pub origin: ConnectionHandle,
    /// Sender-stamped draft
    pub message: NewMessage,
}

/// Producer side of the worker queue
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<SendJob>,
    enqueue_timeout: Duration,
}

impl JobQueue {
    /// Enqueue a job, waiting at most the enqueue timeout for space
    pub async fn enqueue(&self, job: SendJob) -> Result<()> {
        match self.tx.send_timeout(job, self.enqueue_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(job)) => {
                tracing::warn!(
                    connection_id = job.origin.id(),
                    timeout_ms = self.enqueue_timeout.as_millis() as u64,
                    "Worker queue saturated"
                );
                Err(Error::Backpressure)
            }
            Err(SendTimeoutError::Closed(_)) => Err(Error::Closed),
        }
    }
}

/// Everything a worker needs to handle a job
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub interactor: ChatInteractor,
    pub registry: Arc<ConnectionRegistry>,
    pub notifier: Arc<dyn Notifier>,
    pub stats: Arc<ChatStats>,
}

/// Fixed-size pool draining the shared queue
pub struct WorkerPool {
    queue: JobQueue,
    shutdown: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` tasks behind a queue of `capacity` slots
    pub(crate) fn spawn(
        workers: usize,
        capacity: usize,
        enqueue_timeout: Duration,
        ctx: WorkerContext,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(rx));
        let shutdown = CancellationToken::new();

        let workers = (0..workers.max(1))
            .map(|index| {
                tokio::spawn(run_worker(
                    index,
                    ctx.clone(),
                    Arc::clone(&receiver),
                    shutdown.clone(),
                ))
            })
            .collect::<Vec<_>>();

        tracing::info!(workers = workers.len(), capacity = capacity, "Worker pool started");

        Self {
            queue: JobQueue { tx, enqueue_timeout },
            shutdown,
            workers,
        }
    }

    /// Producer handle for connection handlers
    pub fn queue(&self) -> JobQueue {
        self.queue.clone()
    }

    /// Close the queue and wait for the workers to drain it
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Worker task failed");
            }
        }
        tracing::info!("Worker pool stopped");
    }
}

async fn run_worker(
    index: usize,
    ctx: WorkerContext,
    receiver: Arc<Mutex<mpsc::Receiver<SendJob>>>,
    shutdown: CancellationToken,
) {
    tracing::debug!(worker = index, "Worker started");

    loop {
        let job = {
            let mut rx = receiver.lock().await;
            if shutdown.is_cancelled() {
                // refuses new jobs, leaves queued ones readable
                rx.close();
            }
            tokio::select! {
                job = rx.recv() => job,
                _ = shutdown.cancelled(), if !shutdown.is_cancelled() => continue,
            }
        };

        match job {
            Some(job) => process(&ctx, job).await,
            None => break,
        }
    }

    tracing::debug!(worker = index, "Worker stopped");
}

/// Persist, resolve members, fan out
async fn process(ctx: &WorkerContext, job: SendJob) {
    let SendJob { origin, message } = job;

    let message = match ctx.interactor.send_message(&message).await {
        Ok(message) => message,
        Err(e) => {
            origin.deliver(Response::failure(&e, SEND_FAILED));
            return;
        }
    };

    let conversants = match ctx.interactor.get_conversants(message.conversation_id).await {
        Ok(conversants) => conversants,
        Err(e) => {
            tracing::warn!(
                conversation = %message.conversation_id,
                message_id = %message.id,
                error = %e,
                "Conversant lookup failed, message not delivered"
            );
            origin.deliver(Response::failure(&e, RETRIEVE_FAILED));
            return;
        }
    };

    let report = fan_out(&ctx.registry, ctx.notifier.as_ref(), &conversants, &message).await;
    ctx.stats.message_sent(&report);
}
