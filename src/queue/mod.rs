//! Request queue
//!
//! Serializes calls into a `LatencyDb`:
//! - At most one request is in flight
//! - Completions are delivered in submission order
//! - A failed request does not stall the queue
//! - Submitting never runs the request inline; the worker task picks it up

mod errors;
mod worker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub use errors::{QueueError, QueueResult};
pub use worker::Completion;

use crate::latency::{LatencyDb, Request};
use crate::observability::{log_event_with_fields, Event};
use worker::{Counters, Job, Reply};

/// Awaitable handle for one submitted request
#[derive(Debug)]
pub struct Ticket {
    sequence: u64,
    receiver: oneshot::Receiver<Completion>,
}

impl Ticket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Waits for the request to complete
    pub async fn wait(self) -> QueueResult<Completion> {
        self.receiver.await.map_err(|_| QueueError::Dropped(self.sequence))
    }
}

/// FIFO, single-worker queue in front of a `LatencyDb`.
///
/// Clones submit to the same worker.
#[derive(Clone)]
pub struct RequestQueue {
    sender: mpsc::UnboundedSender<Job>,
    counters: Arc<Counters>,
    next_sequence: Arc<AtomicU64>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RequestQueue {
    /// Spawns the worker. Must be called from within a Tokio runtime.
    pub fn start(db: LatencyDb) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let worker = tokio::spawn(worker::run(db, receiver, counters.clone()));

        Self {
            sender,
            counters,
            next_sequence: Arc::new(AtomicU64::new(0)),
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    fn enqueue(&self, request: Request, reply: Reply) -> QueueResult<u64> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let op = request.op();
        let target = request.target().to_string();

        self.counters.pending.fetch_add(1, Ordering::SeqCst);
        let job = Job {
            sequence,
            request,
            reply,
            queued_at: Instant::now(),
        };
        if self.sender.send(job).is_err() {
            self.counters.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed);
        }

        let seq = sequence.to_string();
        log_event_with_fields(
            Event::RequestQueued,
            &[("sequence", seq.as_str()), ("op", op), ("target", target.as_str())],
        );
        Ok(sequence)
    }

    /// Queues a request, returning a ticket for its completion
    pub fn submit(&self, request: Request) -> QueueResult<Ticket> {
        let (tx, receiver) = oneshot::channel();
        let sequence = self.enqueue(request, Reply::Ticket(tx))?;
        Ok(Ticket { sequence, receiver })
    }

    /// Queues a request whose completion is handed to `callback` on the
    /// worker, before the next request is dispatched. Returns its sequence.
    pub fn submit_with<F>(&self, request: Request, callback: F) -> QueueResult<u64>
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        self.enqueue(request, Reply::Callback(Box::new(callback)))
    }

    /// Requests queued but not yet dispatched
    pub fn pending(&self) -> usize {
        self.counters.pending.load(Ordering::SeqCst)
    }

    /// True while a request is in flight
    pub fn is_busy(&self) -> bool {
        self.counters.busy.load(Ordering::SeqCst)
    }

    /// Requests completed so far
    pub fn completed(&self) -> u64 {
        self.counters.completed.load(Ordering::SeqCst)
    }

    /// Stops accepting requests and waits until every queued request has
    /// completed.
    ///
    /// The worker drains once every clone of this queue has been dropped.
    pub async fn shutdown(self) -> QueueResult<()> {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(self.sender);

        match worker {
            Some(handle) => handle.await.map_err(|e| QueueError::Worker(e.to_string())),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestQueue")
            .field("pending", &self.pending())
            .field("busy", &self.is_busy())
            .field("completed", &self.completed())
            .finish()
    }
}
