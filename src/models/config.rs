//! Configuration model for schemals

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// schemals configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub readiness: ReadinessSettings,

    #[serde(default)]
    pub schema: SchemaSettings,
}

/// Transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// TCP address to listen on; stdio is used when unset
    #[serde(default)]
    pub address: Option<String>,

    /// Upper bound on in-flight requests per connection
    #[serde(default = "defaults::max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: None,
            max_concurrent_requests: defaults::max_concurrent_requests(),
        }
    }
}

/// How long requests wait for background schema loading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessSettings {
    #[serde(default = "defaults::interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            interval_ms: defaults::interval_ms(),
            max_attempts: defaults::max_attempts(),
        }
    }
}

impl ReadinessSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Core schema source
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchemaSettings {
    /// TOML schema file; the embedded core schema is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

mod defaults {
    // Server
    pub fn max_concurrent_requests() -> usize {
        64
    }

    // Readiness
    pub fn interval_ms() -> u64 {
        100
    }
    pub fn max_attempts() -> u32 {
        30
    }
}
