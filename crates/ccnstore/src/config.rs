//! Content store configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_CAPACITY: usize = 10_000;
const DEFAULT_SERVICE_CONSTANT_NS: u64 = 1_000;
const DEFAULT_SERVICE_SLOPE_NS_PER_BYTE: u64 = 10;
const DEFAULT_SERVERS: usize = 1;

/// Capacity and service-stage parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Maximum number of cached objects
    pub capacity: usize,
    /// Fixed part of every item's service time
    pub service_constant_ns: u64,
    /// Service time added per byte of name
    pub service_slope_ns_per_byte: u64,
    /// Number of items the service stage works on concurrently
    pub servers: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            service_constant_ns: DEFAULT_SERVICE_CONSTANT_NS,
            service_slope_ns_per_byte: DEFAULT_SERVICE_SLOPE_NS_PER_BYTE,
            servers: DEFAULT_SERVERS,
        }
    }
}

impl StoreConfig {
    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidConfig("capacity must be positive".to_string()));
        }
        if self.servers == 0 {
            return Err(Error::InvalidConfig("servers must be positive".to_string()));
        }
        Ok(())
    }

    pub fn service_constant(&self) -> Duration {
        Duration::from_nanos(self.service_constant_ns)
    }

    pub fn service_slope(&self) -> Duration {
        Duration::from_nanos(self.service_slope_ns_per_byte)
    }

    /// `constant + slope × name_bytes`
    pub fn service_time(&self, name_bytes: usize) -> Duration {
        let per_byte = self
            .service_slope_ns_per_byte
            .saturating_mul(name_bytes as u64);
        Duration::from_nanos(self.service_constant_ns.saturating_add(per_byte))
    }
}
