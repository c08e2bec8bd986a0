//! MQTT implementation of [`BusPublisher`].
//!
//! `rumqttc` splits a client into a cheap, cloneable [`AsyncClient`] handle
//! and an [`EventLoop`] that owns the socket.  [`MqttPublisher::start`] spawns
//! one background task that drives the event loop for the whole process:
//!
//! ```text
//! handlers ──publish──────► request channel ──► EventLoop::poll ──► broker
//!                                                     │
//!                                       ConnectionState (watch channel)
//! ```
//!
//! Because every publish goes through the request channel and only the event
//! loop writes to the socket, concurrent publishes never interleave on the
//! wire.  When `poll()` fails the task marks the state `Disconnected`, sleeps
//! for the next backoff delay, and polls again, which makes `rumqttc`
//! reconnect.  Publishes are refused while the state is not `Connected`;
//! otherwise they wait for room in the bounded request channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet, QoS};
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use vam_core::{Backoff, MqttSettings};

use crate::application::{BusPublisher, ConnectionState, PublishError};

/// How long [`MqttPublisher::shutdown`] waits for the event loop to finish.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a publish may wait for room in the request channel.
const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// The single shared broker connection of a bridge process.
pub struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
    state: watch::Receiver<ConnectionState>,
    closing: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MqttPublisher {
    /// Creates the client and spawns the background event-loop task.
    ///
    /// Returns immediately; the first connection attempt happens on the
    /// background task.  Must be called from within a Tokio runtime.
    pub fn start(settings: &MqttSettings) -> Self {
        let options = settings.client_options();
        info!(
            broker = %settings.broker,
            port = settings.port,
            client_id = %options.client_id(),
            "connecting to MQTT broker"
        );
        let (client, eventloop) = AsyncClient::new(options, settings.request_capacity);

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let closing = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        let backoff = Backoff::new(&settings.reconnect);

        let task = tokio::spawn(drive_event_loop(
            eventloop,
            state_tx,
            backoff,
            Arc::clone(&closing),
            Arc::clone(&wake),
        ));

        Self {
            client,
            qos: QoS::from(settings.qos),
            state: state_rx,
            closing,
            wake,
            task: Mutex::new(Some(task)),
        }
    }

    /// A receiver that observes every connection state change.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Sends MQTT DISCONNECT and waits (bounded) for the event loop to end.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub async fn shutdown(&self) {
        let Some(mut task) = self.task.lock().await.take() else {
            return;
        };
        self.closing.store(true, Ordering::Relaxed);

        if self.state() == ConnectionState::Connected {
            if let Err(e) = self.client.try_disconnect() {
                warn!("could not queue MQTT DISCONNECT: {e}");
            }
        }
        // Interrupt a backoff sleep, if the loop is in one.
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

#[async_trait]
impl BusPublisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let state = self.state();
        if state != ConnectionState::Connected {
            return Err(PublishError::NotConnected(state));
        }
        // Waits for room in the request channel; a burst larger than
        // `request_capacity` is queued, not dropped.
        match timeout(
            ENQUEUE_TIMEOUT,
            self.client.publish(topic, self.qos, false, payload.to_vec()),
        )
        .await
        {
            Ok(result) => result.map_err(|e| PublishError::Rejected(e.to_string())),
            Err(_) => Err(PublishError::Rejected(format!(
                "request queue still full after {ENQUEUE_TIMEOUT:?}"
            ))),
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }
}

/// Polls the event loop until DISCONNECT is sent or shutdown is requested.
async fn drive_event_loop(
    mut eventloop: EventLoop,
    state: watch::Sender<ConnectionState>,
    mut backoff: Backoff,
    closing: Arc<AtomicBool>,
    wake: Arc<Notify>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("connected to MQTT broker");
                backoff.reset();
                state.send_replace(ConnectionState::Connected);
                if closing.load(Ordering::Relaxed) {
                    break;
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("MQTT DISCONNECT sent");
                break;
            }
            Ok(event) => {
                debug!("mqtt event: {event:?}");
            }
            Err(e) => {
                state.send_replace(ConnectionState::Disconnected);
                if closing.load(Ordering::Relaxed) {
                    break;
                }
                let delay = backoff.next_delay();
                warn!("MQTT connection error: {e}; reconnecting in {delay:?}");

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = wake.notified() => {}
                }
                if closing.load(Ordering::Relaxed) {
                    break;
                }
                state.send_replace(ConnectionState::Connecting);
            }
        }
    }
    state.send_replace(ConnectionState::Disconnected);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
