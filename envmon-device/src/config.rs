//! Startup configuration
//!
//! Settings are resolved once, in this order, later sources winning:
//!
//! 1. Built-in defaults (`envmon_core::constants`)
//! 2. An optional JSON file; missing keys keep their default
//! 3. Command line flags and environment variables ([`ConfigOverrides`])
//!
//! The result is validated before anything is started. There is no reload:
//! a running device keeps the configuration it started with.
//!
//! ```json
//! {
//!   "device_id": "basic_001",
//!   "broker_host": "broker.local",
//!   "sample_interval_ms": 10000,
//!   "status_interval_ms": 0
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use envmon_connectors::{MqttConfig, QoS, Topics, TransportError};
use envmon_core::constants::{
    DEFAULT_BROKER_HOST, DEFAULT_BROKER_PORT, DEFAULT_DEVICE_ID, DEFAULT_FIRMWARE_VERSION,
    DEFAULT_KEEPALIVE_SECS, DEFAULT_LOOP_DELAY_MS, DEFAULT_MAX_RETRY_COUNT, DEFAULT_QOS,
    DEFAULT_SAMPLE_INTERVAL_MS, DEFAULT_STATUS_INTERVAL_MS, DEFAULT_WATCHDOG_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sample_loop::LoopSettings;

/// Reported when the host cannot measure signal strength
pub const DEFAULT_WIFI_STRENGTH: u8 = 85;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<TransportError> for ConfigError {
    fn from(err: TransportError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

/// Everything the device needs to start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    pub device_id: String,
    pub firmware_version: String,

    pub broker_host: String,
    pub broker_port: u16,
    /// Defaults to `env_monitor_{device_id}`
    pub client_id: Option<String>,
    pub keep_alive_secs: u16,
    pub qos: u8,
    /// Topic overrides; `devices/{device_id}/...` when absent
    pub topics: Option<Topics>,

    pub sample_interval_ms: u64,
    pub loop_delay_ms: u32,
    /// 0 disables status publishing
    pub status_interval_ms: u64,
    /// Upper bound on any single connect, send or disconnect
    pub watchdog_timeout_ms: u64,
    /// Consecutive publish failures before the session is dropped; 0 never drops
    pub max_retry_count: u32,
    pub wifi_strength: u8,

    /// Stop after this many readings; run forever when absent
    pub max_samples: Option<u64>,
    /// Record payloads in memory instead of contacting a broker
    pub dry_run: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID.to_string(),
            firmware_version: DEFAULT_FIRMWARE_VERSION.to_string(),
            broker_host: DEFAULT_BROKER_HOST.to_string(),
            broker_port: DEFAULT_BROKER_PORT,
            client_id: None,
            keep_alive_secs: DEFAULT_KEEPALIVE_SECS,
            qos: DEFAULT_QOS,
            topics: None,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            loop_delay_ms: DEFAULT_LOOP_DELAY_MS,
            status_interval_ms: DEFAULT_STATUS_INTERVAL_MS,
            watchdog_timeout_ms: DEFAULT_WATCHDOG_TIMEOUT_MS,
            max_retry_count: DEFAULT_MAX_RETRY_COUNT,
            wifi_strength: DEFAULT_WIFI_STRENGTH,
            max_samples: None,
            dry_run: false,
        }
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub device_id: Option<String>,
    pub broker_host: Option<String>,
    pub broker_port: Option<u16>,
    pub sample_interval_ms: Option<u64>,
    pub max_samples: Option<u64>,
    pub dry_run: bool,
}

impl DeviceConfig {
    /// Parse a JSON document; absent keys take their defaults
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Defaults, or the file at `path` when given
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(device_id) = overrides.device_id {
            self.device_id = device_id;
        }
        if let Some(host) = overrides.broker_host {
            self.broker_host = host;
        }
        if let Some(port) = overrides.broker_port {
            self.broker_port = port;
        }
        if let Some(interval) = overrides.sample_interval_ms {
            self.sample_interval_ms = interval;
        }
        if overrides.max_samples.is_some() {
            self.max_samples = overrides.max_samples;
        }
        self.dry_run |= overrides.dry_run;
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.trim().is_empty() {
            return Err(ConfigError::Invalid("device_id is empty".into()));
        }
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid("sample_interval_ms must be > 0".into()));
        }
        if self.loop_delay_ms == 0 {
            return Err(ConfigError::Invalid("loop_delay_ms must be > 0".into()));
        }
        // The loop must wake up several times per interval to sample on time
        if u64::from(self.loop_delay_ms) >= self.sample_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "loop_delay_ms ({}) must be smaller than sample_interval_ms ({})",
                self.loop_delay_ms, self.sample_interval_ms
            )));
        }
        if self.watchdog_timeout_ms == 0 {
            return Err(ConfigError::Invalid("watchdog_timeout_ms must be > 0".into()));
        }
        if self.wifi_strength > 100 {
            return Err(ConfigError::Invalid("wifi_strength must be 0-100".into()));
        }
        QoS::try_from(self.qos)?;
        self.mqtt_config()?.validate()?;
        Ok(())
    }

    /// Client settings derived from this configuration
    pub fn mqtt_config(&self) -> Result<MqttConfig, ConfigError> {
        let mut config = MqttConfig::for_device(&self.device_id)
            .with_broker(self.broker_host.clone(), self.broker_port)
            .with_keep_alive(self.keep_alive_secs)
            .with_qos(QoS::try_from(self.qos)?)
            .with_operation_timeout(self.watchdog_timeout_ms);

        if let Some(client_id) = &self.client_id {
            config = config.with_client_id(client_id.clone());
        }
        if let Some(topics) = &self.topics {
            config = config.with_topics(topics.clone());
        }
        Ok(config)
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            device_id: self.device_id.clone(),
            firmware_version: self.firmware_version.clone(),
            sample_interval_ms: self.sample_interval_ms,
            loop_delay_ms: self.loop_delay_ms,
            status_interval_ms: self.status_interval_ms,
            max_retry_count: self.max_retry_count,
            wifi_strength: self.wifi_strength,
            max_samples: self.max_samples,
        }
    }
}
