//! Router status aggregation

mod service;

pub use service::{success_rate, Connectivity, QueueSummary, RouterStatus, StatusReporter};
