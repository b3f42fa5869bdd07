mod args;

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use args::Args;
use clap::Parser as _;
use envmon_connectors::mock::MockTransport;
use envmon_connectors::{MqttClient, RumqttTransport, Transport};
use envmon_core::{LogSink, MonotonicTime, SensorEmulator};
use envmon_device::{log_device_info, DeviceConfig, SampleLoop, StopToken};
use log::{error, info, warn};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        error!("{}", e);
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = DeviceConfig::load_or_default(args.config.as_deref())?;
    config.apply(args.overrides());
    config.validate()?;

    log_device_info(&config);

    let sensor = SensorEmulator::init()
        .map_err(|e| format!("Failed to initialize sensor emulator: {}", e))?;

    let mqtt_config = config.mqtt_config()?;
    let transport: Box<dyn Transport> = if config.dry_run {
        Box::new(MockTransport::new())
    } else {
        Box::new(
            RumqttTransport::new(mqtt_config.clone())
                .map_err(|e| format!("Failed to initialize MQTT client: {}", e))?,
        )
    };

    let mut mqtt = MqttClient::new(mqtt_config, transport);
    mqtt.init().map_err(|e| format!("Failed to initialize MQTT client: {}", e))?;

    if let Err(e) = mqtt.connect() {
        warn!("MQTT connection failed, continuing in offline mode: {}", e);
    }

    let stop = StopToken::new();
    if let Some(secs) = args.run_for_secs {
        let timer = stop.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            timer.stop();
        });
    }

    info!("Starting main loop...");
    let mut sample_loop = SampleLoop::new(
        sensor,
        mqtt,
        MonotonicTime::new(),
        LogSink,
        config.loop_settings(),
    );
    let summary = sample_loop.run(&stop);
    sample_loop.shutdown();

    info!(
        "Published {} of {} readings ({} offline, {} failed, {} reconnects)",
        summary.published,
        summary.samples,
        summary.offline,
        summary.publish_failures,
        summary.reconnects
    );
    Ok(())
}
