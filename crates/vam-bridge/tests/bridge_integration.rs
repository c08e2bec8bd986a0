//! Integration tests for the bridge: real TCP clients on one side, an
//! in-process fake MQTT broker on the other.
//!
//! Each test builds the same pipeline `main.rs` builds (MqttPublisher →
//! Forwarder → Listener) on ephemeral loopback ports, drives it with plain
//! `TcpStream` clients, and asserts on what the broker received.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use vam_bridge::application::{BusPublisher, ConnectionState, Forwarder};
use vam_bridge::infrastructure::{Listener, MqttPublisher, NetworkError};
use vam_core::{FramingMode, FramingPolicy, MqttSettings, ReconnectPolicy};
use vam_testkit::{FakeBroker, Received};

const TOPIC: &str = "/namespace/vam";
const WAIT: Duration = Duration::from_secs(5);

// ── Harness ───────────────────────────────────────────────────────────────────

struct Bridge {
    addr: SocketAddr,
    running: Arc<AtomicBool>,
    publisher: Arc<MqttPublisher>,
    forwarder: Arc<Forwarder>,
    task: JoinHandle<()>,
}

impl Bridge {
    async fn start(broker: SocketAddr, mode: FramingMode) -> Self {
        let settings = MqttSettings {
            broker: broker.ip().to_string(),
            port: broker.port(),
            reconnect: ReconnectPolicy {
                initial_delay_ms: 50,
                max_delay_ms: 200,
            },
            ..MqttSettings::default()
        };
        let publisher = Arc::new(MqttPublisher::start(&settings));
        wait_for_state(&publisher, ConnectionState::Connected).await;

        let forwarder = Arc::new(Forwarder::new(publisher.clone(), TOPIC));
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), 64).expect("bind");
        let addr = listener.local_addr();
        let running = Arc::new(AtomicBool::new(true));
        let policy = FramingPolicy {
            mode,
            ..FramingPolicy::default()
        };
        let task = tokio::spawn(listener.run(
            Arc::clone(&forwarder),
            policy,
            Arc::clone(&running),
            Duration::from_millis(500),
        ));

        Self {
            addr,
            running,
            publisher,
            forwarder,
            task,
        }
    }

    async fn connect(&self) -> TcpStream {
        TcpStream::connect(self.addr).await.expect("connect to bridge")
    }

    async fn stop(self) {
        self.running.store(false, Ordering::Relaxed);
        timeout(WAIT, self.task)
            .await
            .expect("accept loop stops")
            .expect("accept loop does not panic");
        self.publisher.shutdown().await;
    }
}

async fn wait_for_state(publisher: &MqttPublisher, wanted: ConnectionState) {
    let mut rx = publisher.subscribe_state();
    timeout(Duration::from_secs(10), rx.wait_for(|s| *s == wanted))
        .await
        .unwrap_or_else(|_| panic!("publisher never reached {wanted}"))
        .expect("state channel open");
}

fn payloads(received: &[Received]) -> Vec<String> {
    received.iter().map(|r| r.payload_str().to_string()).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ten_concurrent_connections_deliver_every_message_exactly_once() {
    // Arrange
    let broker = FakeBroker::start().await;
    let bridge = Bridge::start(broker.addr(), FramingMode::Newline).await;
    const CLIENTS: usize = 10;
    const PER_CLIENT: usize = 5;

    // Act: every client sends its messages concurrently, then closes
    let mut clients = Vec::new();
    for c in 0..CLIENTS {
        let mut stream = bridge.connect().await;
        clients.push(tokio::spawn(async move {
            for m in 0..PER_CLIENT {
                let line = format!("generic{:03}-client{c}-msg{m}\n", c * PER_CLIENT + m);
                stream.write_all(line.as_bytes()).await.unwrap();
            }
            stream.shutdown().await.unwrap();
        }));
    }
    for client in clients {
        client.await.unwrap();
    }
    let received = broker.wait_for_messages(CLIENTS * PER_CLIENT, WAIT).await;
    // Give any duplicate a chance to show up.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let received_after = broker.published();

    // Assert
    assert_eq!(received.len(), CLIENTS * PER_CLIENT);
    assert_eq!(received_after.len(), CLIENTS * PER_CLIENT, "no duplicates");
    let mut got = payloads(&received_after);
    got.sort();
    let mut expected: Vec<String> = (0..CLIENTS)
        .flat_map(|c| {
            (0..PER_CLIENT).map(move |m| format!("generic{:03}-client{c}-msg{m}", c * PER_CLIENT + m))
        })
        .collect();
    expected.sort();
    assert_eq!(got, expected);
    assert!(received_after.iter().all(|r| r.topic == TOPIC));

    bridge.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_burst_beyond_request_capacity_is_delivered_exactly_once() {
    // Arrange: 500 messages in flight against a 64-entry request channel
    let broker = FakeBroker::start().await;
    let bridge = Bridge::start(broker.addr(), FramingMode::Newline).await;
    const CLIENTS: usize = 10;
    const PER_CLIENT: usize = 50;
    assert!(CLIENTS * PER_CLIENT > MqttSettings::default().request_capacity);

    // Act: each client sends all of its lines in a single write
    let mut clients = Vec::new();
    for c in 0..CLIENTS {
        let mut stream = bridge.connect().await;
        clients.push(tokio::spawn(async move {
            let burst: String = (0..PER_CLIENT)
                .map(|m| format!("generic{m:03}-{c}\n"))
                .collect();
            stream.write_all(burst.as_bytes()).await.unwrap();
            stream
        }));
    }
    let mut streams = Vec::new();
    for client in clients {
        streams.push(client.await.unwrap());
    }
    let received = broker
        .wait_for_messages(CLIENTS * PER_CLIENT, Duration::from_secs(15))
        .await;

    // Assert
    assert_eq!(received.len(), CLIENTS * PER_CLIENT);
    let mut got = payloads(&received);
    got.sort();
    got.dedup();
    assert_eq!(got.len(), CLIENTS * PER_CLIENT, "no duplicates");
    timeout(WAIT, async {
        while bridge.forwarder.stats().forwarded < (CLIENTS * PER_CLIENT) as u64 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("every publish counted");
    assert_eq!(bridge.forwarder.stats().publish_failed, 0);

    drop(streams);
    bridge.stop().await;
}

#[tokio::test]
async fn test_messages_from_one_connection_arrive_in_order() {
    let broker = FakeBroker::start().await;
    let bridge = Bridge::start(broker.addr(), FramingMode::Newline).await;

    let mut stream = bridge.connect().await;
    for i in 0..20 {
        stream
            .write_all(format!("generic{i:03}\n").as_bytes())
            .await
            .unwrap();
    }
    let received = broker.wait_for_messages(20, WAIT).await;

    let expected: Vec<String> = (0..20).map(|i| format!("generic{i:03}")).collect();
    assert_eq!(payloads(&received), expected);

    drop(stream);
    bridge.stop().await;
}

#[tokio::test]
async fn test_closing_one_connection_does_not_affect_another() {
    // Arrange
    let broker = FakeBroker::start().await;
    let bridge = Bridge::start(broker.addr(), FramingMode::Newline).await;
    let mut first = bridge.connect().await;
    let mut second = bridge.connect().await;

    // Act
    first.write_all(b"generic001\n").await.unwrap();
    broker.wait_for_messages(1, WAIT).await;
    drop(first);
    tokio::time::sleep(Duration::from_millis(100)).await;
    second.write_all(b"generic002\n").await.unwrap();
    let received = broker.wait_for_messages(2, WAIT).await;

    // Assert
    assert_eq!(payloads(&received), vec!["generic001", "generic002"]);

    drop(second);
    bridge.stop().await;
}

#[tokio::test]
async fn test_non_matching_messages_are_never_published() {
    let broker = FakeBroker::start().await;
    let bridge = Bridge::start(broker.addr(), FramingMode::Newline).await;

    let mut stream = bridge.connect().await;
    stream
        .write_all(b"hello world\ngeneric42\nxgeneric123\nGeneric123\ngeneric100\n")
        .await
        .unwrap();
    // generic100 is last on the same connection, so once it arrives every
    // earlier line has been processed.
    let received = broker.wait_for_messages(1, WAIT).await;

    assert_eq!(payloads(&received), vec!["generic100"]);
    let stats = bridge.forwarder.stats();
    assert_eq!(stats.forwarded, 1);
    assert_eq!(stats.ignored, 4);

    drop(stream);
    bridge.stop().await;
}

#[tokio::test]
async fn test_matching_message_is_republished_verbatim() {
    // Arrange: default chunk framing, one read is one message
    let broker = FakeBroker::start().await;
    let bridge = Bridge::start(broker.addr(), FramingMode::Chunk).await;

    // Act
    let mut stream = bridge.connect().await;
    stream.write_all(b"generic007ready").await.unwrap();
    let received = broker.wait_for_messages(1, WAIT).await;

    // Assert
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].topic, TOPIC);
    assert_eq!(received[0].payload, b"generic007ready");
    assert_eq!(received[0].qos, 0);

    drop(stream);
    bridge.stop().await;
}

#[tokio::test]
async fn test_binding_an_occupied_port_is_a_startup_error() {
    let holder = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = holder.local_addr().unwrap();

    let result = Listener::bind(addr, 16);

    assert!(matches!(result, Err(NetworkError::BindFailed { .. })));
}

#[tokio::test]
async fn test_broker_outage_fails_publishes_then_recovers_without_restart() {
    // Arrange: bridge connected and forwarding
    let broker = FakeBroker::start().await;
    let bridge = Bridge::start(broker.addr(), FramingMode::Newline).await;
    let mut stream = bridge.connect().await;
    stream.write_all(b"generic001\n").await.unwrap();
    assert_eq!(broker.wait_for_messages(1, WAIT).await.len(), 1);

    // Act 1: the broker goes away
    let broker_addr = broker.stop().await;
    wait_for_state(&bridge.publisher, ConnectionState::Disconnected).await;
    stream.write_all(b"generic002\n").await.unwrap();

    // Assert 1: the publish fails, nothing crashes, the connection stays open
    timeout(WAIT, async {
        while bridge.forwarder.stats().publish_failed == 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("publish failure recorded");
    assert!(bridge.publisher.publish(TOPIC, b"generic999").await.is_err());

    // Act 2: the broker comes back on the same port
    let broker = FakeBroker::start_on(broker_addr).await;
    wait_for_state(&bridge.publisher, ConnectionState::Connected).await;
    stream.write_all(b"generic003\n").await.unwrap();

    // Assert 2: publishing works again over the same TCP connection
    let received = broker.wait_for_messages(1, WAIT).await;
    assert_eq!(payloads(&received), vec!["generic003"]);

    drop(stream);
    bridge.stop().await;
}

#[tokio::test]
async fn test_shutdown_closes_open_connections_after_grace_period() {
    // Arrange: one idle client that never closes
    let broker = FakeBroker::start().await;
    let bridge = Bridge::start(broker.addr(), FramingMode::Newline).await;
    let mut idle = bridge.connect().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Act
    bridge.stop().await;

    // Assert: the bus session ended with a DISCONNECT
    assert_eq!(broker.wait_for_disconnects(1, WAIT).await, 1);

    // Assert: the bridge side was closed, so the client reads end-of-stream
    let mut buf = [0u8; 8];
    let n = timeout(WAIT, idle.read(&mut buf))
        .await
        .expect("read completes")
        .unwrap_or(0);
    assert_eq!(n, 0);
}
