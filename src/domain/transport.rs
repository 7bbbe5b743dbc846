//! Transport configuration - the network endpoint the agent listens on

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Transport protocol type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    Udp,
    Tcp,
    Tls,
}

impl TransportProtocol {
    /// Upper-case protocol name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportProtocol::Udp => "UDP",
            TransportProtocol::Tcp => "TCP",
            TransportProtocol::Tls => "TLS",
        }
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub protocol: TransportProtocol,
    /// Local address to bind; unspecified binds all interfaces
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    /// Local port; 0 lets the OS pick one
    pub port: u16,
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

impl TransportConfig {
    /// Transport on all interfaces
    pub fn new(protocol: TransportProtocol, port: u16) -> Self {
        Self {
            protocol,
            bind_address: default_bind_address(),
            port,
        }
    }

    /// UDP transport on all interfaces
    pub fn udp(port: u16) -> Self {
        Self::new(TransportProtocol::Udp, port)
    }

    /// Bind a specific local address
    pub fn with_bind_address(mut self, bind_address: IpAddr) -> Self {
        self.bind_address = bind_address;
        self
    }

    /// Address and port to bind
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::udp(5080)
    }
}
