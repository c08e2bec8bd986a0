//! MQTT subscription that feeds the key emulator.
//!
//! One background task drives the `rumqttc` event loop:
//!
//! ```text
//! broker ──► EventLoop::poll ──► Publish ──► EmulateKeysUseCase::handle_payload
//!                 │
//!                 └─ ConnAck ──► try_subscribe(input_topic, qos)
//! ```
//!
//! The subscription is re-issued after every CONNACK because sessions are
//! clean; a broker restart would otherwise leave the consumer connected but
//! deaf.  Payloads are handled one at a time on the event-loop task, so
//! chords from consecutive messages never interleave.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet, QoS, SubscribeReasonCode};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use vam_core::Backoff;

use crate::application::{EmulateKeysUseCase, KeystrokeError};
use crate::domain::KeyemuMqttConfig;

/// How long [`MqttSubscriber::shutdown`] waits for the event loop to finish.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

// ── Counters ──────────────────────────────────────────────────────────────────

/// What happened to received payloads.
#[derive(Debug, Default)]
pub struct SubscriberStats {
    typed: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
}

impl SubscriberStats {
    /// Payloads replayed as keystrokes.
    pub fn typed(&self) -> u64 {
        self.typed.load(Ordering::Relaxed)
    }

    /// Payloads that were not a valid key sequence.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Valid sequences the emulator could not inject.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl fmt::Display for SubscriberStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "typed={} rejected={} failed={}",
            self.typed(),
            self.rejected(),
            self.failed()
        )
    }
}

// ── Subscriber ────────────────────────────────────────────────────────────────

/// Broker connection of a consumer process.
pub struct MqttSubscriber {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
    wake: Arc<Notify>,
    stats: Arc<SubscriberStats>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MqttSubscriber {
    /// Creates the client and spawns the background event-loop task.
    ///
    /// Returns immediately; connecting and subscribing happen on the
    /// background task.  Must be called from within a Tokio runtime.
    pub fn start(config: &KeyemuMqttConfig, use_case: Arc<EmulateKeysUseCase>) -> Self {
        let settings = &config.connection;
        let options = settings.client_options();
        info!(
            broker = %settings.broker,
            port = settings.port,
            topic = %config.input_topic,
            client_id = %options.client_id(),
            "connecting to MQTT broker"
        );
        let (client, eventloop) = AsyncClient::new(options, settings.request_capacity);

        let connected = Arc::new(AtomicBool::new(false));
        let closing = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        let stats = Arc::new(SubscriberStats::default());

        let driver = EventLoopDriver {
            client: client.clone(),
            topic: config.input_topic.clone(),
            qos: QoS::from(settings.qos),
            use_case,
            stats: Arc::clone(&stats),
            backoff: Backoff::new(&settings.reconnect),
            connected: Arc::clone(&connected),
            closing: Arc::clone(&closing),
            wake: Arc::clone(&wake),
        };
        let task = tokio::spawn(driver.run(eventloop));

        Self {
            client,
            connected,
            closing,
            wake,
            stats,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn stats(&self) -> Arc<SubscriberStats> {
        Arc::clone(&self.stats)
    }

    /// `true` between a CONNACK and the next connection error.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Sends MQTT DISCONNECT and waits (bounded) for the event loop to end.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub async fn shutdown(&self) {
        let Some(mut task) = self.task.lock().await.take() else {
            return;
        };
        self.closing.store(true, Ordering::Relaxed);

        if self.is_connected() {
            if let Err(e) = self.client.try_disconnect() {
                warn!("could not queue MQTT DISCONNECT: {e}");
            }
        }
        self.wake.notify_one();

        match timeout(SHUTDOWN_TIMEOUT, &mut task).await {
            Ok(_) => info!("MQTT connection closed"),
            Err(_) => {
                warn!("MQTT event loop did not stop within {SHUTDOWN_TIMEOUT:?}; aborting");
                task.abort();
            }
        }
    }
}

/// Everything the background task owns.
struct EventLoopDriver {
    client: AsyncClient,
    topic: String,
    qos: QoS,
    use_case: Arc<EmulateKeysUseCase>,
    stats: Arc<SubscriberStats>,
    backoff: Backoff,
    connected: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl EventLoopDriver {
    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Relaxed)
    }

    /// Polls the event loop until DISCONNECT is sent or shutdown is requested.
    async fn run(mut self, mut eventloop: EventLoop) {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("connected to MQTT broker");
                    self.backoff.reset();
                    self.connected.store(true, Ordering::Relaxed);
                    if self.is_closing() {
                        break;
                    }
                    match self.client.try_subscribe(self.topic.clone(), self.qos) {
                        Ok(()) => debug!(topic = %self.topic, "SUBSCRIBE queued"),
                        Err(e) => warn!(topic = %self.topic, "could not queue SUBSCRIBE: {e}"),
                    }
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    for code in &ack.return_codes {
                        match code {
                            SubscribeReasonCode::Success(granted) => {
                                info!(topic = %self.topic, "subscribed with QoS {}", *granted as u8)
                            }
                            SubscribeReasonCode::Failure => {
                                warn!(topic = %self.topic, "broker refused the subscription")
                            }
                        }
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.handle_publish(&publish.topic, &publish.payload);
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    debug!("MQTT DISCONNECT sent");
                    break;
                }
                Ok(event) => {
                    debug!("mqtt event: {event:?}");
                }
                Err(e) => {
                    self.connected.store(false, Ordering::Relaxed);
                    if self.is_closing() {
                        break;
                    }
                    let delay = self.backoff.next_delay();
                    warn!("MQTT connection error: {e}; reconnecting in {delay:?}");

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.wake.notified() => {}
                    }
                    if self.is_closing() {
                        break;
                    }
                }
            }
        }
        self.connected.store(false, Ordering::Relaxed);
    }

    fn handle_publish(&self, topic: &str, payload: &[u8]) {
        debug!(topic, bytes = payload.len(), "payload received");
        match self.use_case.handle_payload(payload) {
            Ok(sequence) => {
                self.stats.typed.fetch_add(1, Ordering::Relaxed);
                info!(topic, keys = %sequence, "simulated keystroke");
            }
            Err(KeystrokeError::Emulation(e)) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(topic, "key emulation failed: {e}");
            }
            Err(e) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(topic, "ignoring payload: {e}");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
