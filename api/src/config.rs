use std::env;

use mcp_core::domain::entities::service::ServiceId;
use mcp_shared::config::{AppConfig, ConfigError};

/// Where repositories keep their data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// MySQL through the infra crate
    MySql,
    /// In-process repositories; state is lost on restart
    Memory,
}

impl StorageMode {
    /// `MCP_STORAGE=memory` selects in-memory repositories
    pub fn from_env() -> Self {
        match env::var("MCP_STORAGE") {
            Ok(value) if value.eq_ignore_ascii_case("memory") => StorageMode::Memory,
            _ => StorageMode::MySql,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageMode,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            app: AppConfig::from_env(ServiceId::all_ids())?,
            storage: StorageMode::from_env(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.environment.is_production()
    }

    pub fn bind_address(&self) -> String {
        self.app.server.bind_address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_mode_from_env() {
        env::set_var("MCP_STORAGE", "Memory");
        assert_eq!(StorageMode::from_env(), StorageMode::Memory);

        env::set_var("MCP_STORAGE", "mysql");
        assert_eq!(StorageMode::from_env(), StorageMode::MySql);

        env::remove_var("MCP_STORAGE");
        assert_eq!(StorageMode::from_env(), StorageMode::MySql);
    }
}
