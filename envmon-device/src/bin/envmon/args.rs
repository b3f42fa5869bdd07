use std::path::PathBuf;

use clap::Parser;
use envmon_device::ConfigOverrides;

/// Environment monitor: emulated sensor readings published over MQTT
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// JSON configuration file
    #[arg(long, short, env = "ENVMON_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "ENVMON_DEVICE_ID")]
    pub device_id: Option<String>,

    /// Broker host name or address
    #[arg(long, env = "ENVMON_BROKER")]
    pub broker: Option<String>,

    #[arg(long, env = "ENVMON_PORT")]
    pub port: Option<u16>,

    /// Milliseconds between readings
    #[arg(long, env = "ENVMON_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Stop after this many readings
    #[arg(long)]
    pub max_samples: Option<u64>,

    /// Stop after this many seconds
    #[arg(long)]
    pub run_for_secs: Option<u64>,

    /// Do not contact a broker; payloads stay in memory
    #[arg(long)]
    pub dry_run: bool,
}

impl Args {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            device_id: self.device_id.clone(),
            broker_host: self.broker.clone(),
            broker_port: self.port,
            sample_interval_ms: self.interval_ms,
            max_samples: self.max_samples,
            dry_run: self.dry_run,
        }
    }
}
