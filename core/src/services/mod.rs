//! Business services containing domain logic and use cases.

pub mod audit;
pub mod clock;
pub mod router;
pub mod status;
pub mod token;

// Re-export commonly used types
pub use audit::{AuditService, AuditServiceConfig};
pub use clock::{Clock, FixedClock, InstanceLiveness, LivenessProvider, SystemClock};
pub use router::{DispatchReceipt, DispatchStatus, EventRouter, RoutingRule, RoutingTable};
pub use status::{Connectivity, RouterStatus, StatusReporter};
pub use token::{
    CredentialVerifier, ServiceCredentials, TokenService, TokenServiceConfig,
};
