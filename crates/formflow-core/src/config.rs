//! Step processor connection settings.
//!
//! Values come from the environment when present, otherwise from the
//! defaults below. The CLI layers its own flags on top.

use std::time::Duration;

pub const ENV_PROCESSOR_URL: &str = "FORMFLOW_PROCESSOR_URL";
pub const ENV_PROCESSOR_TIMEOUT: &str = "FORMFLOW_PROCESSOR_TIMEOUT_SECS";
pub const ENV_API_KEY: &str = "FORMFLOW_API_KEY";

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    /// Full URL the requests are POSTed to
    pub endpoint: String,
    /// Per-request transport timeout
    pub timeout_secs: u64,
    /// Sent as a bearer token when set
    pub api_key: Option<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:3000/api/execute-button".to_string(),
            timeout_secs: 120,
            api_key: None,
        }
    }
}

impl ProcessorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            endpoint: get(ENV_PROCESSOR_URL).unwrap_or(defaults.endpoint),
            timeout_secs: get(ENV_PROCESSOR_TIMEOUT)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.timeout_secs),
            api_key: get(ENV_API_KEY),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
