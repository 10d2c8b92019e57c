//! # MCP Core
//!
//! Domain layer of the MCP hub: service token lifecycle (issue, verify,
//! refresh with reuse detection, revoke), event routing and status
//! reporting. Persistence is abstracted behind repository traits so the
//! same services run against MySQL or in memory.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
