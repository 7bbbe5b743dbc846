//! Listening sockets owned by the local engine

use crate::domain::shared::error::EngineError;
use crate::domain::transport::{TransportConfig, TransportProtocol};
use std::net::SocketAddr;
use tokio::net::{TcpListener, UdpSocket};
use tracing::info;

enum Socket {
    Udp(UdpSocket),
    // TLS shares the TCP listener; the handshake belongs to the signaling stack
    Tcp(TcpListener),
}

/// A bound listening endpoint
pub struct BoundTransport {
    protocol: TransportProtocol,
    local_addr: SocketAddr,
    socket: Socket,
}

impl BoundTransport {
    /// Bind the configured address. Fails if the port is taken.
    pub async fn bind(config: &TransportConfig) -> Result<Self, EngineError> {
        let addr = config.socket_addr();
        let bind_error = |e: std::io::Error| {
            EngineError::Transport(format!(
                "Failed to bind {} socket on {}: {}",
                config.protocol, addr, e
            ))
        };

        let socket = match config.protocol {
            TransportProtocol::Udp => {
                Socket::Udp(UdpSocket::bind(addr).await.map_err(bind_error)?)
            }
            TransportProtocol::Tcp | TransportProtocol::Tls => {
                Socket::Tcp(TcpListener::bind(addr).await.map_err(bind_error)?)
            }
        };

        let local_addr = match &socket {
            Socket::Udp(udp) => udp.local_addr(),
            Socket::Tcp(tcp) => tcp.local_addr(),
        }
        .map_err(|e| EngineError::Transport(format!("Failed to read local address: {}", e)))?;

        let transport = Self {
            protocol: config.protocol,
            local_addr,
            socket,
        };
        info!("Listening on {}", transport.describe());
        Ok(transport)
    }

    /// Address the socket actually bound, with the OS-picked port
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Protocol and address, e.g. `UDP 127.0.0.1:5080`
    pub fn describe(&self) -> String {
        let kind = match self.socket {
            Socket::Udp(_) => "datagram",
            Socket::Tcp(_) => "stream",
        };
        format!("{} {} ({})", self.protocol, self.local_addr, kind)
    }
}
