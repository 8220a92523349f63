//! The single queue worker
//!
//! Pulls one job at a time and runs it to completion, delivery included,
//! before pulling the next.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::latency::{LatencyDb, Request, Response};
use crate::observability::{log_event_with_fields, Event};

/// A finished request
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Submission order, from 0
    pub sequence: u64,
    pub request: Request,
    pub response: Response,
    /// Time spent waiting for earlier requests
    pub waited: Duration,
    /// Time from dispatch to completion, both delay legs included
    pub elapsed: Duration,
}

pub(super) type Callback = Box<dyn FnOnce(Completion) + Send>;

pub(super) enum Reply {
    Ticket(oneshot::Sender<Completion>),
    Callback(Callback),
}

pub(super) struct Job {
    pub sequence: u64,
    pub request: Request,
    pub reply: Reply,
    pub queued_at: Instant,
}

#[derive(Debug, Default)]
pub(super) struct Counters {
    pub pending: AtomicUsize,
    pub busy: AtomicBool,
    pub completed: AtomicU64,
}

pub(super) async fn run(db: LatencyDb, mut jobs: mpsc::UnboundedReceiver<Job>, counters: std::sync::Arc<Counters>) {
    while let Some(job) = jobs.recv().await {
        counters.busy.store(true, Ordering::SeqCst);
        counters.pending.fetch_sub(1, Ordering::SeqCst);

        let sequence = job.sequence.to_string();
        log_event_with_fields(
            Event::RequestDispatched,
            &[("sequence", sequence.as_str()), ("op", job.request.op())],
        );

        let dispatched_at = Instant::now();
        let response = db.execute(job.request.clone()).await;
        let completion = Completion {
            sequence: job.sequence,
            request: job.request,
            response,
            waited: dispatched_at.duration_since(job.queued_at),
            elapsed: dispatched_at.elapsed(),
        };

        let elapsed_ms = completion.elapsed.as_millis().to_string();
        log_event_with_fields(
            Event::RequestCompleted,
            &[
                ("sequence", sequence.as_str()),
                ("op", completion.request.op()),
                ("success", if completion.response.success { "true" } else { "false" }),
                ("elapsed_ms", elapsed_ms.as_str()),
            ],
        );

        let completed = counters.completed.fetch_add(1, Ordering::SeqCst) + 1;
        counters.busy.store(false, Ordering::SeqCst);

        match job.reply {
            Reply::Ticket(tx) => {
                // Receiver may have been dropped; the request still ran.
                let _ = tx.send(completion);
            }
            Reply::Callback(callback) => callback(completion),
        }

        if counters.pending.load(Ordering::SeqCst) == 0 {
            let completed = completed.to_string();
            log_event_with_fields(Event::QueueIdle, &[("completed", completed.as_str())]);
        }
    }
}
