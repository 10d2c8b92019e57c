//! Event router: rule matching, payload transforms and dispatch to targets

mod rules;
mod service;
pub mod transform;


pub use rules::{RoutingRule, RoutingTable, TransformFn, CATCH_ALL_PATTERN};
pub use service::{DispatchReceipt, DispatchStatus, EventRouter};
