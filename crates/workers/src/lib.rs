pub mod api;
pub mod config;
pub mod consumer;
pub mod incident;
pub mod metrics;
pub mod model;
pub mod notifier;
pub mod probe;
pub mod runner;
pub mod schedule;
pub mod service;
pub mod shutdown;
pub mod storage;
pub mod store;

#[cfg(test)]
mod test_support;
