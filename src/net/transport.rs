//! WebTransport server implementation
//!
//! Adapts wtransport connections to [`PeerChannel`]s. Each peer opens one
//! bidirectional stream; inbound frames are handed to the host session and a
//! writer task drains the peer's outbound queue.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};
use wtransport::endpoint::IncomingSession;
use wtransport::{Endpoint, RecvStream, SendStream};

use crate::config::ServerConfig;
use crate::net::channel::{Frame, QueueChannel};
use crate::net::framing::{read_text, write_message, FramingError};
use crate::net::host::{ConnectionId, HostHandle};
use crate::net::tls::TlsConfig;

/// WebTransport server
pub struct WebTransportServer {
    config: ServerConfig,
    tls_config: TlsConfig,
    host: HostHandle,
}

impl WebTransportServer {
    pub fn new(config: ServerConfig, tls_config: TlsConfig, host: HostHandle) -> Self {
        Self {
            config,
            tls_config,
            host,
        }
    }

    /// Get the certificate hash for client configuration
    pub fn cert_hash(&self) -> &str {
        &self.tls_config.cert_hash
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.config.bind_address, self.config.port)
    }

    /// Accept connections until the task is dropped
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.bind_addr();
        let server_config = wtransport::ServerConfig::builder()
            .with_bind_address(addr)
            .with_identity(self.tls_config.identity)
            .build();

        let server = Endpoint::server(server_config)?;
        info!("WebTransport server listening on {}", addr);

        loop {
            let incoming = server.accept().await;
            let host = self.host.clone();
            let queue_depth = self.config.outbound_queue;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(incoming, host, queue_depth).await {
                    warn!("Connection error: {}", e);
                }
            });
        }
    }
}

/// Handle a single WebTransport connection
async fn handle_connection(
    incoming: IncomingSession,
    host: HostHandle,
    queue_depth: usize,
) -> anyhow::Result<()> {
    let session_request = incoming.await?;
    debug!(
        "New session from {}, path: {}",
        session_request.authority(),
        session_request.path()
    );

    let connection = session_request.accept().await?;
    let (send, mut recv) = connection.accept_bi().await?;

    let (channel, outbound) = QueueChannel::new(queue_depth);
    let conn = host.open(Arc::new(channel));
    debug!("Connection {} accepted", conn);

    let writer = tokio::spawn(write_frames(conn, send, outbound));

    let result = read_frames(conn, &mut recv, &host).await;
    match &result {
        Ok(()) => debug!("Connection {} closed by peer", conn),
        Err(e) => host.error(conn, e.to_string()),
    }
    host.close(conn);

    // The host closes the channel on Close; the writer exits once the queue drains
    if let Err(e) = writer.await {
        debug!("Writer task for {} ended abnormally: {}", conn, e);
    }

    result.map_err(Into::into)
}

async fn read_frames(
    conn: ConnectionId,
    recv: &mut RecvStream,
    host: &HostHandle,
) -> Result<(), FramingError> {
    loop {
        match read_text(recv).await {
            Ok(text) => host.deliver(conn, &text),
            Err(FramingError::ConnectionClosed) => return Ok(()),
            Err(FramingError::InvalidUtf8) => {
                warn!("Dropping non UTF-8 frame from {}", conn);
            }
            Err(e) => return Err(e),
        }
    }
}

async fn write_frames(
    conn: ConnectionId,
    mut send: SendStream,
    mut outbound: tokio::sync::mpsc::Receiver<Frame>,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = write_message(&mut send, frame.as_bytes()).await {
            debug!("Write to {} failed: {}", conn, e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::metrics::Metrics;
    use crate::net::host::HostSession;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use wtransport::Identity;

    fn server() -> WebTransportServer {
        let config = ServerConfig {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            ..Default::default()
        };
        let tls = TlsConfig::from_identity(Identity::self_signed(["localhost"]).unwrap());
        let host = HostSession::new(GameConfig::default(), None, Arc::new(Metrics::new()));
        WebTransportServer::new(config, tls, host.handle())
    }

    #[tokio::test]
    async fn test_bind_addr_and_cert_hash() {
        let server = server();
        assert_eq!(
            server.bind_addr(),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
        );
        assert!(!server.cert_hash().is_empty());
    }

    #[tokio::test]
    async fn test_run_binds_and_keeps_accepting() {
        let task = tokio::spawn(server().run());
        tokio::time::sleep(Duration::from_millis(100)).await;

        // An endpoint error would have finished the task
        assert!(!task.is_finished());
        task.abort();
    }
}
