//! Latency simulation
//!
//! Turns synchronous engine calls into deferred completions with injected
//! delays before and after the call.

mod delay;
mod request;
mod wrapper;

pub use delay::Delay;
pub use request::{Request, Response};
pub use wrapper::LatencyDb;
