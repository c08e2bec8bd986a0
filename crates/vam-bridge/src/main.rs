//! VAM bridge: entry point.
//!
//! Listens for TCP connections from an external application and republishes
//! every message that starts with `generic` + three digits on an MQTT topic.
//!
//! # Usage
//!
//! ```text
//! vam-bridge [OPTIONS]
//!
//! Options:
//!   --config <PATH>        TOML config file [default: vam-bridge.toml if present]
//!   --bind <IP>            Listener address           [default: 0.0.0.0]
//!   --port <PORT>          Listener port              [default: 39340]
//!   --broker-host <HOST>   MQTT broker host           [default: localhost]
//!   --broker-port <PORT>   MQTT broker port           [default: 1883]
//!   --topic <TOPIC>        Publish topic              [default: /namespace/vam]
//!   --framing <MODE>       chunk | newline            [default: chunk]
//! ```
//!
//! Every flag can also be set through the environment variable shown in
//! `--help`.  Flags override the config file; the file overrides built-in
//! defaults.  `RUST_LOG` overrides the file's `log_level`.

use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vam_bridge::application::Forwarder;
use vam_bridge::domain::BridgeConfig;
use vam_bridge::infrastructure::{Listener, MqttPublisher};
use vam_core::config::load_toml;
use vam_core::FramingMode;

/// Config file read when `--config` is not given.  Missing is fine.
const DEFAULT_CONFIG_FILE: &str = "vam-bridge.toml";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// TCP-to-MQTT bridge.
#[derive(Debug, Parser)]
#[command(
    name = "vam-bridge",
    about = "Republishes matching TCP messages on an MQTT topic",
    version
)]
struct Cli {
    /// Path to the TOML config file.  When given, the file must exist.
    #[arg(long, env = "VAM_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the listener to.
    #[arg(long, env = "VAM_BIND")]
    bind: Option<String>,

    /// TCP port to listen on.
    #[arg(long, env = "VAM_PORT")]
    port: Option<u16>,

    /// MQTT broker host name or IP address.
    #[arg(long, env = "VAM_BROKER_HOST")]
    broker_host: Option<String>,

    /// MQTT broker port.
    #[arg(long, env = "VAM_BROKER_PORT")]
    broker_port: Option<u16>,

    /// Topic matching messages are published to.
    #[arg(long, env = "VAM_TOPIC")]
    topic: Option<String>,

    /// Message framing: `chunk` (one read is one message) or `newline`.
    #[arg(long, env = "VAM_FRAMING")]
    framing: Option<FramingMode>,
}

impl Cli {
    /// Loads the config file and applies command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let mut config: BridgeConfig =
            load_toml(self.config.as_deref(), Path::new(DEFAULT_CONFIG_FILE)).with_context(
                || match &self.config {
                    Some(path) => format!("failed to load config from {}", path.display()),
                    None => format!("failed to load {DEFAULT_CONFIG_FILE}"),
                },
            )?;

        if let Some(bind) = self.bind {
            config.bridge.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.bridge.port = port;
        }
        if let Some(host) = self.broker_host {
            config.mqtt.connection.broker = host;
        }
        if let Some(port) = self.broker_port {
            config.mqtt.connection.port = port;
        }
        if let Some(topic) = self.topic {
            config.mqtt.topic = topic;
        }
        if let Some(mode) = self.framing {
            config.bridge.framing.mode = mode;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// 1. Parse CLI flags and load the config file.
/// 2. Initialise `tracing` (`RUST_LOG`, else the config's `log_level`).
/// 3. Bind the listener; failure here is fatal.
/// 4. Start the MQTT publisher (connects in the background).
/// 5. Accept connections until Ctrl+C, then drain, disconnect, exit 0.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.into_bridge_config()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.bridge.log_level)),
        )
        .init();

    let bind_addr = config.bind_addr()?;
    info!(
        "VAM bridge starting: listen={}, broker={}:{}, topic={}, framing={}",
        bind_addr,
        config.mqtt.connection.broker,
        config.mqtt.connection.port,
        config.mqtt.topic,
        config.bridge.framing.mode
    );

    // Bind before connecting to the broker so a port conflict fails fast.
    let listener = Listener::bind(bind_addr, config.bridge.backlog)
        .context("could not start TCP listener")?;

    let publisher = Arc::new(MqttPublisher::start(&config.mqtt.connection));
    let forwarder = Arc::new(Forwarder::new(publisher.clone(), config.mqtt.topic.clone()));

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    // ── Main accept loop ──────────────────────────────────────────────────────
    listener
        .run(
            Arc::clone(&forwarder),
            config.bridge.framing.clone(),
            running,
            config.shutdown_grace(),
        )
        .await;

    publisher.shutdown().await;
    info!("VAM bridge stopped ({})", forwarder.stats());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
