//! Event queue repository module.

mod r#trait;
pub use r#trait::EventQueueRepository;

mod mock;
pub use mock::MockEventQueueRepository;
