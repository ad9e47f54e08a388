//! Source configuration

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default WFD control port
pub const DEFAULT_CONTROL_PORT: u16 = 7236;

/// Source configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// RTSP control port to listen on (0 = auto-assign)
    pub control_port: u16,

    /// Address to bind the listener to
    pub bind_addr: IpAddr,

    /// Local RTP port advertised in the M6 `server_port`
    pub rtp_port: u16,

    /// RTSP session timeout advertised in the M6 `Session` header
    pub session_timeout: Duration,

    /// Interval between M16 keep-alive probes while playing
    pub keepalive_interval: Duration,

    /// Keep-alive probes sent without any peer response before the peer is
    /// declared dead
    pub max_keepalive_misses: u32,

    /// User agent string
    pub user_agent: String,

    /// MAC address of the target sink, if known from P2P discovery
    pub peer_mac: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            control_port: DEFAULT_CONTROL_PORT,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            rtp_port: 5004,
            session_timeout: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(10),
            max_keepalive_misses: 5,
            user_agent: format!("wfd-source/{}", env!("CARGO_PKG_VERSION")),
            peer_mac: None,
        }
    }
}

impl SourceConfig {
    /// Set the control port
    #[must_use]
    pub fn control_port(mut self, port: u16) -> Self {
        self.control_port = port;
        self
    }

    /// Set the advertised RTP port
    #[must_use]
    pub fn rtp_port(mut self, port: u16) -> Self {
        self.rtp_port = port;
        self
    }

    /// Set the keep-alive interval
    #[must_use]
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Set the sink MAC address
    #[must_use]
    pub fn peer_mac(mut self, mac: impl Into<String>) -> Self {
        self.peer_mac = Some(mac.into());
        self
    }
}
