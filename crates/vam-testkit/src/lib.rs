//! In-process fake MQTT broker shared by the integration tests of
//! `vam-bridge` and `vam-keyemu`.
//!
//! Speaks just enough MQTT 3.1.1 for a `rumqttc` client: CONNECT/CONNACK,
//! PUBLISH at any QoS (with PUBACK / PUBREC / PUBCOMP), SUBSCRIBE/SUBACK with
//! exact-match topic routing, PINGREQ/PINGRESP, and DISCONNECT.  Every
//! PUBLISH and DISCONNECT it receives is recorded so tests can assert on it.
//!
//! [`FakeBroker::stop`] aborts the accept task, which drops every connection
//! task with it, so clients observe the broker going away.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

/// A PUBLISH received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
}

impl Received {
    pub fn payload_str(&self) -> &str {
        std::str::from_utf8(&self.payload).unwrap_or("<non-utf8>")
    }
}

#[derive(Default)]
struct Shared {
    published: Mutex<Vec<Received>>,
    subscriptions: Mutex<Vec<(String, mpsc::UnboundedSender<Vec<u8>>)>>,
    disconnects: AtomicUsize,
    changed: Notify,
}

pub struct FakeBroker {
    addr: SocketAddr,
    shared: Arc<Shared>,
    accept_task: JoinHandle<()>,
}

impl FakeBroker {
    /// Starts a broker on an ephemeral loopback port.
    pub async fn start() -> Self {
        Self::start_on("127.0.0.1:0".parse().unwrap()).await
    }

    /// Starts a broker on `addr` (used to restart on the same port).
    pub async fn start_on(addr: SocketAddr) -> Self {
        let socket = TcpSocket::new_v4().unwrap();
        socket.set_reuseaddr(true).unwrap();
        socket.bind(addr).unwrap();
        let listener = socket.listen(64).unwrap();
        let addr = listener.local_addr().unwrap();

        let shared = Arc::new(Shared::default());
        let accept_task = tokio::spawn(accept_loop(listener, Arc::clone(&shared)));
        Self {
            addr,
            shared,
            accept_task,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Kills the broker and every client connection.  Returns the address so
    /// the caller can restart on the same port.
    pub async fn stop(self) -> SocketAddr {
        self.accept_task.abort();
        let _ = self.accept_task.await;
        self.addr
    }

    /// Everything published so far.
    pub fn published(&self) -> Vec<Received> {
        self.shared.published.lock().unwrap().clone()
    }

    /// Waits until at least `n` messages were published or `timeout` passes,
    /// then returns everything received.
    pub async fn wait_for_messages(&self, n: usize, timeout: Duration) -> Vec<Received> {
        let deadline = Instant::now() + timeout;
        loop {
            let changed = self.shared.changed.notified();
            {
                let published = self.shared.published.lock().unwrap();
                if published.len() >= n {
                    return published.clone();
                }
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                return self.published();
            }
        }
    }

    /// Number of DISCONNECT packets received.
    pub fn disconnects(&self) -> usize {
        self.shared.disconnects.load(Ordering::SeqCst)
    }

    /// Waits until at least `n` DISCONNECT packets arrived.
    pub async fn wait_for_disconnects(&self, n: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let changed = self.shared.changed.notified();
            if self.disconnects() >= n {
                return self.disconnects();
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                return self.disconnects();
            }
        }
    }

    /// Waits until some client has subscribed to `topic`.
    pub async fn wait_for_subscription(&self, topic: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let changed = self.shared.changed.notified();
            if self.has_subscriber(topic) {
                return true;
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                return self.has_subscriber(topic);
            }
        }
    }

    fn has_subscriber(&self, topic: &str) -> bool {
        self.shared
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .any(|(t, tx)| t == topic && !tx.is_closed())
    }

    /// Delivers a QoS 0 PUBLISH to every subscriber of `topic`.
    pub fn publish(&self, topic: &str, payload: &[u8]) {
        route(&self.shared, topic, payload);
    }
}

// ── Connection handling ───────────────────────────────────────────────────────

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    // Dropping the JoinSet when this task is aborted aborts every connection.
    let mut connections = JoinSet::new();
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            continue;
        };
        let shared = Arc::clone(&shared);
        connections.spawn(async move {
            let _ = serve(stream, shared).await;
        });
    }
}

async fn serve(stream: TcpStream, shared: Arc<Shared>) -> std::io::Result<()> {
    let (mut rd, mut wr) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

    let writer = async move {
        while let Some(bytes) = rx.recv().await {
            wr.write_all(&bytes).await?;
        }
        Ok::<(), std::io::Error>(())
    };

    let reader = read_loop(&mut rd, &tx, &shared);

    tokio::select! {
        r = reader => r,
        w = writer => w,
    }
}

async fn read_loop(
    rd: &mut OwnedReadHalf,
    tx: &mpsc::UnboundedSender<Vec<u8>>,
    shared: &Shared,
) -> std::io::Result<()> {
    loop {
        let (header, body) = read_packet(rd).await?;
        match header >> 4 {
            // CONNECT
            1 => send(tx, vec![0x20, 0x02, 0x00, 0x00]),
            // PUBLISH
            3 => {
                let qos = (header >> 1) & 0x03;
                let topic_len = u16::from_be_bytes([body[0], body[1]]) as usize;
                let topic = String::from_utf8_lossy(&body[2..2 + topic_len]).into_owned();
                let mut idx = 2 + topic_len;
                let packet_id = if qos > 0 {
                    let id = [body[idx], body[idx + 1]];
                    idx += 2;
                    Some(id)
                } else {
                    None
                };
                let payload = body[idx..].to_vec();

                route(shared, &topic, &payload);
                shared.published.lock().unwrap().push(Received {
                    topic,
                    payload,
                    qos,
                });
                shared.changed.notify_waiters();

                match (qos, packet_id) {
                    (1, Some([a, b])) => send(tx, vec![0x40, 0x02, a, b]),
                    (2, Some([a, b])) => send(tx, vec![0x50, 0x02, a, b]),
                    _ => {}
                }
            }
            // PUBREL
            6 => send(tx, vec![0x70, 0x02, body[0], body[1]]),
            // SUBSCRIBE
            8 => {
                let mut idx = 2;
                let mut granted = Vec::new();
                while idx + 2 <= body.len() {
                    let len = u16::from_be_bytes([body[idx], body[idx + 1]]) as usize;
                    let topic =
                        String::from_utf8_lossy(&body[idx + 2..idx + 2 + len]).into_owned();
                    let qos = body[idx + 2 + len];
                    idx += 3 + len;
                    shared
                        .subscriptions
                        .lock()
                        .unwrap()
                        .push((topic, tx.clone()));
                    granted.push(qos.min(2));
                }
                let mut suback = vec![0x90];
                suback.extend(encode_remaining_length(2 + granted.len()));
                suback.extend_from_slice(&body[0..2]);
                suback.extend(granted);
                send(tx, suback);
                shared.changed.notify_waiters();
            }
            // PINGREQ
            12 => send(tx, vec![0xD0, 0x00]),
            // DISCONNECT
            14 => {
                shared.disconnects.fetch_add(1, Ordering::SeqCst);
                shared.changed.notify_waiters();
                return Ok(());
            }
            _ => {}
        }
    }
}

fn send(tx: &mpsc::UnboundedSender<Vec<u8>>, bytes: Vec<u8>) {
    let _ = tx.send(bytes);
}

fn route(shared: &Shared, topic: &str, payload: &[u8]) {
    let mut packet = vec![0x30];
    packet.extend(encode_remaining_length(2 + topic.len() + payload.len()));
    packet.extend_from_slice(&(topic.len() as u16).to_be_bytes());
    packet.extend_from_slice(topic.as_bytes());
    packet.extend_from_slice(payload);

    let mut subs = shared.subscriptions.lock().unwrap();
    subs.retain(|(_, tx)| !tx.is_closed());
    for (filter, tx) in subs.iter() {
        if filter == topic {
            let _ = tx.send(packet.clone());
        }
    }
}

async fn read_packet<R: AsyncRead + Unpin>(rd: &mut R) -> std::io::Result<(u8, Vec<u8>)> {
    let header = rd.read_u8().await?;
    let mut len = 0usize;
    let mut shift = 0;
    loop {
        let byte = rd.read_u8().await?;
        len |= ((byte & 0x7F) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    let mut body = vec![0u8; len];
    rd.read_exact(&mut body).await?;
    Ok((header, body))
}

fn encode_remaining_length(mut len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if len == 0 {
            return out;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
