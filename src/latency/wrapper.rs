//! Latency-injecting wrapper around the engine
//!
//! Each call sleeps for the `before` leg, runs the engine operation, then
//! sleeps for the `after` leg. Failures never escape: they become
//! `Response { success: false, error }`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::delay::Delay;
use super::request::{Request, Response};
use crate::engine::CruddyDb;

/// Asynchronous, delay-injected view of a `CruddyDb`
#[derive(Debug, Clone)]
pub struct LatencyDb {
    db: Arc<CruddyDb>,
    before: Delay,
    after: Delay,
}

impl LatencyDb {
    /// Wraps `db` with no delay on either leg
    pub fn new(db: impl Into<Arc<CruddyDb>>) -> Self {
        Self {
            db: db.into(),
            before: Delay::none(),
            after: Delay::none(),
        }
    }

    /// Sets both legs. Each is sampled once per call.
    pub fn with_delays(mut self, before: Delay, after: Delay) -> Self {
        self.before = before;
        self.after = after;
        self
    }

    pub fn db(&self) -> &CruddyDb {
        &self.db
    }

    /// Runs one request with both delay legs
    pub async fn execute(&self, request: Request) -> Response {
        pause(self.before.sample()).await;
        let response = Response::from_result(request.apply(&self.db));
        pause(self.after.sample()).await;
        response
    }

    /// Runs `request` on a spawned task and hands the response to `callback`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit<F>(&self, request: Request, callback: F)
    where
        F: FnOnce(Response) + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            let response = this.execute(request).await;
            callback(response);
        });
    }

    pub fn create<F>(&self, table: &str, rows: Value, callback: F)
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.submit(Request::create(table, rows), callback);
    }

    pub fn read<F>(&self, key: &str, callback: F)
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.submit(Request::read(key), callback);
    }

    pub fn update<F>(&self, key: &str, value: Value, callback: F)
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.submit(Request::update(key, value), callback);
    }

    pub fn delete<F>(&self, key: &str, callback: F)
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.submit(Request::delete(key), callback);
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
