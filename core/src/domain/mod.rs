//! Domain layer containing the entities shared by every service.

pub mod entities;

pub use entities::*;
