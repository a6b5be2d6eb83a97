use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where device namespaces live
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// NATS JetStream object stores
    Nats,
    /// Process-local store, discarded on exit
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Nats => f.write_str("nats"),
            StorageBackend::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Path to a NATS credentials file
    #[serde(default)]
    pub nats_credentials_path: Option<String>,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // Fleet configuration
    /// Number of edge devices to provision
    #[serde(default = "default_fleet_size")]
    pub fleet_size: usize,

    /// Days of history per device
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Comma-separated parameter names, one picked per device
    #[serde(default = "default_parameters")]
    pub parameters: String,

    /// Device workflows allowed in flight at once (0 = unbounded)
    #[serde(default)]
    pub max_concurrent_devices: usize,

    // OpenTelemetry configuration
    #[serde(default)]
    pub otel_enabled: bool,

    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,

    /// Timeout for closers in seconds
    #[serde(default = "default_closer_timeout_secs")]
    pub closer_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Nats
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_fleet_size() -> usize {
    fleet_seeder::DEFAULT_FLEET_SIZE
}

fn default_lookback_days() -> u32 {
    fleet_seeder::DEFAULT_LOOKBACK_DAYS
}

fn default_parameters() -> String {
    "temp".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "blobfleet".to_string()
}

fn default_closer_timeout_secs() -> u64 {
    10
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("BLOBFLEET"))
            .build()?
            .try_deserialize()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn concurrency_limit(&self) -> Option<usize> {
        match self.max_concurrent_devices {
            0 => None,
            limit => Some(limit),
        }
    }
}
