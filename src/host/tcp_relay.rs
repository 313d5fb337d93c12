//! Loopback TCP relay.
//!
//! Binds an ephemeral port on 127.0.0.1 and pipes every accepted connection
//! to the session's target host. Used for direct (non-gateway) VNC sessions
//! and by the `par-remote relay` command.

use super::{HostError, RelayEndpoint, RelayService};
use crate::session::{ConnectionParams, SessionId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};

/// Pause after a failed `accept` before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Relay statistics
#[derive(Debug, Default)]
pub struct RelayStats {
    /// Total connections accepted
    pub connections_accepted: AtomicU64,
    /// Connections that failed to reach the target
    pub connections_failed: AtomicU64,
    /// Bytes copied client -> target
    pub bytes_up: AtomicU64,
    /// Bytes copied target -> client
    pub bytes_down: AtomicU64,
}

/// A single bound relay, not yet running
pub struct TcpRelay {
    listener: TcpListener,
    target: String,
    stats: Arc<RelayStats>,
}

impl TcpRelay {
    /// Bind an ephemeral loopback port relaying to `target` (`host:port`)
    pub async fn bind(target: impl Into<String>) -> std::io::Result<Self> {
        Self::bind_on("127.0.0.1:0", target).await
    }

    /// Bind a specific local address
    pub async fn bind_on(local: &str, target: impl Into<String>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(local).await?;
        Ok(Self {
            listener,
            target: target.into(),
            stats: Arc::new(RelayStats::default()),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn stats(&self) -> Arc<RelayStats> {
        Arc::clone(&self.stats)
    }

    /// Run the accept loop until the task is aborted.
    ///
    /// Connection tasks live in a `JoinSet` owned by this future, so aborting
    /// the accept loop also tears down every open pipe.
    pub async fn run(self) {
        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            log::debug!("Relay accepted {} -> {}", addr, self.target);
                            self.stats.connections_accepted.fetch_add(1, Ordering::Relaxed);
                            connections.spawn(pipe(stream, self.target.clone(), Arc::clone(&self.stats)));
                        }
                        Err(e) => accept_failed(e).await,
                    }
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }
    }
}

/// Out of descriptors and similar errors repeat until a connection closes
async fn accept_failed(e: std::io::Error) {
    log::warn!("Relay accept failed: {}", e);
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

async fn pipe(mut client: TcpStream, target: String, stats: Arc<RelayStats>) {
    let mut upstream = match TcpStream::connect(&target).await {
        Ok(s) => s,
        Err(e) => {
            log::warn!("Relay could not reach {}: {}", target, e);
            stats.connections_failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    let _ = client.set_nodelay(true);
    let _ = upstream.set_nodelay(true);

    match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
        Ok((up, down)) => {
            stats.bytes_up.fetch_add(up, Ordering::Relaxed);
            stats.bytes_down.fetch_add(down, Ordering::Relaxed);
            log::debug!("Relay to {} closed ({} up, {} down)", target, up, down);
        }
        Err(e) => {
            log::debug!("Relay to {} ended: {}", target, e);
        }
    }
}

struct RunningRelay {
    session: SessionId,
    task: JoinHandle<()>,
}

/// [`RelayService`] running one [`TcpRelay`] per `start`.
///
/// Relays are keyed by their loopback port, so an attempt that is still
/// starting never replaces or stops the relay of a newer attempt.
#[derive(Default)]
pub struct TcpRelayService {
    relays: Mutex<HashMap<u16, RunningRelay>>,
}

impl TcpRelayService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of relays currently running
    pub fn active_count(&self) -> usize {
        self.relays.lock().len()
    }

    /// Loopback ports of a session's running relays
    pub fn ports_for(&self, session: SessionId) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .relays
            .lock()
            .iter()
            .filter(|(_, r)| r.session == session)
            .map(|(port, _)| *port)
            .collect();
        ports.sort_unstable();
        ports
    }

    /// Whether the relay on `port` is still running
    pub fn is_running(&self, port: u16) -> bool {
        self.relays
            .lock()
            .get(&port)
            .is_some_and(|r| !r.task.is_finished())
    }
}

impl Drop for TcpRelayService {
    fn drop(&mut self) {
        for (_, relay) in self.relays.get_mut().drain() {
            relay.task.abort();
        }
    }
}

#[async_trait]
impl RelayService for TcpRelayService {
    async fn start(
        &self,
        session: SessionId,
        params: &ConnectionParams,
    ) -> Result<RelayEndpoint, HostError> {
        let host = params.host.trim();
        if host.is_empty() {
            return Err(HostError::InvalidArgument("relay target host is empty".to_string()));
        }
        let target = if host.contains(':') {
            format!("[{}]:{}", host, params.effective_port())
        } else {
            format!("{}:{}", host, params.effective_port())
        };

        let relay = TcpRelay::bind(target.clone()).await?;
        let port = relay.local_addr()?.port();
        let task = tokio::spawn(relay.run());
        self.relays
            .lock()
            .insert(port, RunningRelay { session, task });

        log::info!("Relay for session {} on 127.0.0.1:{} -> {}", session, port, target);
        Ok(RelayEndpoint {
            port,
            resolved_secret: params.password.clone(),
        })
    }

    async fn stop(&self, session: SessionId, port: Option<u16>) -> Result<(), HostError> {
        let Some(port) = port else {
            log::debug!("No relay started for session {}", session);
            return Ok(());
        };
        let removed = {
            let mut relays = self.relays.lock();
            match relays.get(&port) {
                Some(relay) if relay.session == session => relays.remove(&port),
                Some(_) => {
                    log::warn!("Relay port {} is not owned by session {}", port, session);
                    None
                }
                None => None,
            }
        };
        match removed {
            Some(relay) => {
                relay.task.abort();
                log::info!("Relay for session {} on port {} stopped", session, port);
            }
            None => log::debug!("No relay on port {} for session {}", port, session),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn echo_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let (mut r, mut w) = stream.split();
                    let _ = tokio::io::copy(&mut r, &mut w).await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_relay_pipes_bytes_both_ways() {
        let target = echo_server().await;
        let relay = TcpRelay::bind(target.to_string()).await.unwrap();
        let local = relay.local_addr().unwrap();
        let stats = relay.stats();
        let task = tokio::spawn(relay.run());

        let mut client = TcpStream::connect(local).await.unwrap();
        client.write_all(b"RFB 003.008\n").await.unwrap();
        let mut buf = [0u8; 12];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"RFB 003.008\n");
        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_failure_waits_before_retry() {
        let start = tokio::time::Instant::now();
        accept_failed(std::io::Error::other("too many open files")).await;
        assert_eq!(start.elapsed(), ACCEPT_BACKOFF);
    }

    #[tokio::test]
    async fn test_stop_releases_port() {
        let service = TcpRelayService::new();
        let session = SessionId::new();
        let params = ConnectionParams::vnc_relay("127.0.0.1", 5900);

        let endpoint = service.start(session, &params).await.unwrap();
        assert_ne!(endpoint.port, 0);
        assert_eq!(service.ports_for(session), vec![endpoint.port]);

        service.stop(session, Some(endpoint.port)).await.unwrap();
        assert_eq!(service.active_count(), 0);
        // Stopping twice is harmless
        service.stop(session, Some(endpoint.port)).await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_stop_leaves_newer_relay_running() {
        let service = TcpRelayService::new();
        let session = SessionId::new();
        let params = ConnectionParams::vnc_relay("127.0.0.1", 5900);

        let first = service.start(session, &params).await.unwrap();
        let second = service.start(session, &params).await.unwrap();
        service.stop(session, Some(first.port)).await.unwrap();
        service.stop(session, None).await.unwrap();

        assert_eq!(service.ports_for(session), vec![second.port]);
        assert!(service.is_running(second.port));
    }

    #[tokio::test]
    async fn test_stop_ignores_port_of_other_session() {
        let service = TcpRelayService::new();
        let owner = SessionId::new();
        let params = ConnectionParams::vnc_relay("127.0.0.1", 5900);

        let endpoint = service.start(owner, &params).await.unwrap();
        service.stop(SessionId::new(), Some(endpoint.port)).await.unwrap();

        assert!(service.is_running(endpoint.port));
    }
}
