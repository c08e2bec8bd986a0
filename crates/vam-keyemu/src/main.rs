//! Keystroke consumer entry point.
//!
//! Subscribes to an MQTT topic and types every payload of the form
//! `[17, 18, 72]` as a key chord.
//!
//! # Usage
//!
//! ```text
//! vam-keyemu [OPTIONS]
//!
//! Options:
//!   --config <PATH>        TOML config file [default: vam-keyemu.toml if present]
//!   --broker-host <HOST>   MQTT broker host           [default: localhost]
//!   --broker-port <PORT>   MQTT broker port           [default: 1883]
//!   --input-topic <TOPIC>  Topic to subscribe to      [default: /namespace/vam]
//!   --qos <0|1|2>          Subscription QoS           [default: 0]
//!   --dry-run              Log key events instead of injecting them
//! ```
//!
//! On platforms without native key injection the consumer always runs dry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vam_core::config::load_toml;
use vam_core::QosLevel;
use vam_keyemu::application::EmulateKeysUseCase;
use vam_keyemu::domain::KeyemuConfig;
use vam_keyemu::infrastructure::input_emulation::{platform_emulator, NATIVE_INPUT_AVAILABLE};
use vam_keyemu::infrastructure::MqttSubscriber;

/// Config file read when `--config` is not given.  Missing is fine.
const DEFAULT_CONFIG_FILE: &str = "vam-keyemu.toml";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// MQTT keystroke consumer.
#[derive(Debug, Parser)]
#[command(
    name = "vam-keyemu",
    about = "Types key chords received on an MQTT topic",
    version
)]
struct Cli {
    /// Path to the TOML config file.  When given, the file must exist.
    #[arg(long, env = "VAM_KEYEMU_CONFIG")]
    config: Option<PathBuf>,

    /// MQTT broker host name or IP address.
    #[arg(long, env = "VAM_BROKER_HOST")]
    broker_host: Option<String>,

    /// MQTT broker port.
    #[arg(long, env = "VAM_BROKER_PORT")]
    broker_port: Option<u16>,

    /// Topic key sequences are received on.
    #[arg(long, env = "VAM_INPUT_TOPIC")]
    input_topic: Option<String>,

    /// Subscription QoS (0, 1 or 2).
    #[arg(long, env = "VAM_QOS", value_parser = parse_qos)]
    qos: Option<QosLevel>,

    /// Log key events instead of injecting them.
    #[arg(long, env = "VAM_DRY_RUN")]
    dry_run: bool,
}

fn parse_qos(s: &str) -> Result<QosLevel, String> {
    let level: u8 = s.parse().map_err(|_| format!("'{s}' is not 0, 1 or 2"))?;
    QosLevel::try_from(level)
}

impl Cli {
    /// Loads the config file and applies command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    fn to_keyemu_config(&self) -> anyhow::Result<KeyemuConfig> {
        let mut config: KeyemuConfig =
            load_toml(self.config.as_deref(), Path::new(DEFAULT_CONFIG_FILE)).with_context(
                || match &self.config {
                    Some(path) => format!("failed to load config from {}", path.display()),
                    None => format!("failed to load {DEFAULT_CONFIG_FILE}"),
                },
            )?;

        if let Some(host) = &self.broker_host {
            config.mqtt.connection.broker = host.clone();
        }
        if let Some(port) = self.broker_port {
            config.mqtt.connection.port = port;
        }
        if let Some(topic) = &self.input_topic {
            config.mqtt.input_topic = topic.clone();
        }
        if let Some(qos) = self.qos {
            config.mqtt.connection.qos = qos;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.to_keyemu_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "VAM keystroke consumer starting: broker={}:{}, topic={}, qos={}",
        config.mqtt.connection.broker,
        config.mqtt.connection.port,
        config.mqtt.input_topic,
        config.mqtt.connection.qos
    );
    if !cli.dry_run && !NATIVE_INPUT_AVAILABLE {
        warn!("no native key injection on this platform; running as a dry run");
    }

    let use_case = Arc::new(EmulateKeysUseCase::new(platform_emulator(cli.dry_run)));
    let subscriber = MqttSubscriber::start(&config.mqtt, use_case);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("received Ctrl+C; disconnecting");

    subscriber.shutdown().await;
    info!("VAM keystroke consumer stopped ({})", subscriber.stats());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
