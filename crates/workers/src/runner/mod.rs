//! Executes claimed ticks: probe, append the outcome to the result stream,
//! then settle the tick against the queue.

mod adapter;
mod job_runner;
mod tick_loop;

pub use adapter::{QueueAdapter, Settled};
pub use job_runner::{JobOutcome, JobRunner};
pub use tick_loop::TickLoop;
