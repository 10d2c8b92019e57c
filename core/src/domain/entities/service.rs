//! Known calling services and the permission scopes they may hold.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of backend services allowed to authenticate against the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceId {
    MinuFind,
    MinuFrame,
    MinuBuild,
    MinuKeep,
}

impl ServiceId {
    /// Every known service, in a stable order
    pub const ALL: [ServiceId; 4] = [
        ServiceId::MinuFind,
        ServiceId::MinuFrame,
        ServiceId::MinuBuild,
        ServiceId::MinuKeep,
    ];

    /// Wire and storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::MinuFind => "minu-find",
            ServiceId::MinuFrame => "minu-frame",
            ServiceId::MinuBuild => "minu-build",
            ServiceId::MinuKeep => "minu-keep",
        }
    }

    /// Identifiers of all known services
    pub fn all_ids() -> impl Iterator<Item = &'static str> {
        Self::ALL.iter().map(ServiceId::as_str)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minu-find" => Ok(ServiceId::MinuFind),
            "minu-frame" => Ok(ServiceId::MinuFrame),
            "minu-build" => Ok(ServiceId::MinuBuild),
            "minu-keep" => Ok(ServiceId::MinuKeep),
            _ => Err(format!("Unknown service: {}", s)),
        }
    }
}

/// Permission scopes in `resource:action` form
pub mod scopes {
    pub const EVENTS_WRITE: &str = "events:write";
    pub const EVENTS_READ: &str = "events:read";
    pub const HEALTH_WRITE: &str = "health:write";
    pub const HEALTH_READ: &str = "health:read";
    pub const NOTIFICATIONS_WRITE: &str = "notifications:write";

    /// Every scope the issuer recognizes
    pub const KNOWN: [&str; 5] = [
        EVENTS_WRITE,
        EVENTS_READ,
        HEALTH_WRITE,
        HEALTH_READ,
        NOTIFICATIONS_WRITE,
    ];

    /// Granted when a token request names no scope at all
    pub const DEFAULT: [&str; 2] = [EVENTS_WRITE, EVENTS_READ];

    /// Whether a scope string is recognized
    pub fn is_known(scope: &str) -> bool {
        KNOWN.contains(&scope)
    }

    /// Keep recognized scopes only, dropping duplicates and preserving order
    pub fn filter_known<S: AsRef<str>>(requested: &[S]) -> Vec<String> {
        let mut granted: Vec<String> = Vec::with_capacity(requested.len());
        for scope in requested {
            let scope = scope.as_ref().trim();
            if is_known(scope) && !granted.iter().any(|s| s == scope) {
                granted.push(scope.to_string());
            }
        }
        granted
    }

    /// Default scope set as owned strings
    pub fn default_scopes() -> Vec<String> {
        DEFAULT.iter().map(|s| s.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_id_round_trip() {
        for service in ServiceId::ALL {
            assert_eq!(service.as_str().parse::<ServiceId>().unwrap(), service);
        }
        assert!("minu-unknown".parse::<ServiceId>().is_err());
        assert!("MINU-FIND".parse::<ServiceId>().is_err());
    }

    #[test]
    fn test_service_id_serde_is_kebab_case() {
        let json = serde_json::to_string(&ServiceId::MinuBuild).unwrap();
        assert_eq!(json, "\"minu-build\"");
    }

    #[test]
    fn test_filter_known_drops_unknown_and_duplicates() {
        let requested = vec!["events:write", "admin:all", "events:write", " health:read "];
        assert_eq!(
            scopes::filter_known(&requested),
            vec!["events:write".to_string(), "health:read".to_string()]
        );
    }

    #[test]
    fn test_filter_known_can_be_empty() {
        assert!(scopes::filter_known(&["root", "superuser"]).is_empty());
    }
}
