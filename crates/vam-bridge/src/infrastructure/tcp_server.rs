//! TCP listener: accept loop and per-connection task management.
//!
//! [`Listener::bind`] is split from [`Listener::run`] so that a bind failure
//! surfaces to the caller as a startup error before anything else happens,
//! and so tests can bind port 0 and read back the chosen port.
//!
//! The accept loop never blocks on per-connection work: it accepts a
//! connection, spawns a task for it, and goes straight back to `accept()`.
//! It checks the shared `running` flag every 200 ms.  When shutdown is
//! requested it stops accepting, gives in-flight connections a grace period
//! to finish, then aborts the rest.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use vam_core::FramingPolicy;

use crate::application::Forwarder;
use crate::infrastructure::connection::handle_connection;

/// How often the accept loop re-checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Error type for listener setup.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// A bound, listening TCP socket that has not started accepting yet.
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Binds `addr` and starts listening with the given backlog.
    ///
    /// On Unix `SO_REUSEADDR` is set first so a restarted bridge can rebind
    /// while old connections sit in `TIME_WAIT`.  It still cannot bind a port
    /// another process is listening on.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindFailed`] if the socket cannot be created,
    /// bound, or put into listening state.
    pub fn bind(addr: SocketAddr, backlog: u32) -> Result<Self, NetworkError> {
        let fail = |source| NetworkError::BindFailed { addr, source };

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(fail)?;

        #[cfg(unix)]
        socket.set_reuseaddr(true).map_err(fail)?;

        socket.bind(addr).map_err(fail)?;
        let inner = socket.listen(backlog).map_err(fail)?;
        let local_addr = inner.local_addr().map_err(fail)?;

        info!("listening on {local_addr}");
        Ok(Self { inner, local_addr })
    }

    /// Address actually bound (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until `running` is cleared, then shuts down.
    ///
    /// Each accepted connection runs [`handle_connection`] on its own task.
    /// Accept errors are logged and the loop continues.
    pub async fn run(
        self,
        forwarder: Arc<Forwarder>,
        policy: FramingPolicy,
        running: Arc<AtomicBool>,
        grace: Duration,
    ) {
        let policy = Arc::new(policy);
        let mut connections = JoinSet::new();

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            // Reap finished handlers so the set does not grow without bound.
            while let Some(result) = connections.try_join_next() {
                log_join_result(result);
            }

            match timeout(ACCEPT_POLL_INTERVAL, self.inner.accept()).await {
                Ok(Ok((stream, peer))) => {
                    info!(%peer, "client connected");
                    let forwarder = Arc::clone(&forwarder);
                    let policy = Arc::clone(&policy);
                    connections.spawn(async move {
                        handle_connection(stream, peer, &policy, forwarder).await;
                    });
                }
                Ok(Err(e)) => {
                    // Transient (e.g. too many open files); keep serving.
                    error!("accept error: {e}");
                }
                Err(_) => {
                    // Timeout: loop back to check the `running` flag.
                }
            }
        }

        // Stop accepting before waiting on the handlers.
        drop(self.inner);
        drain_connections(connections, grace).await;
    }
}

/// Waits up to `grace` for in-flight handlers, then aborts the rest.
async fn drain_connections(mut connections: JoinSet<()>, grace: Duration) {
    if connections.is_empty() {
        return;
    }
    info!(
        "waiting up to {grace:?} for {} open connection(s)",
        connections.len()
    );

    let wait_all = async {
        while let Some(result) = connections.join_next().await {
            log_join_result(result);
        }
    };
    if timeout(grace, wait_all).await.is_err() {
        warn!(
            "grace period elapsed; aborting {} connection(s)",
            connections.len()
        );
        connections.abort_all();
        while connections.join_next().await.is_some() {}
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => debug!("connection task cancelled"),
        Err(e) => error!("connection task panicked: {e}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
