//! Event router route handlers

pub mod dispatch;
pub mod status;

pub use dispatch::IDEMPOTENCY_KEY_HEADER;
