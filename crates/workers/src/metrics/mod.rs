pub mod exposition;
pub mod worker_metrics;

pub use worker_metrics::WorkerMetrics;
