//! Dispatch target repository module.

mod r#trait;
pub use r#trait::DispatchTargetRepository;

mod mock;
pub use mock::MockDispatchTargetRepository;
