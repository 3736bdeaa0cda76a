use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// How long a connection may sit without sending its hello frame.
const DEFAULT_HELLO_TIMEOUT: Duration = Duration::from_secs(10);

/// Hub configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface the WebSocket listener binds to.
    pub host: IpAddr,
    /// Port the WebSocket listener binds to.
    pub port: u16,
    /// Deadline for a connection's hello frame. Not env-driven; tests
    /// shorten it.
    pub hello_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Both variables are optional: `HOST` defaults to all interfaces and
    /// `PORT` to 8765. Unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8765),
            hello_timeout: DEFAULT_HELLO_TIMEOUT,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8765,
            hello_timeout: DEFAULT_HELLO_TIMEOUT,
        }
    }
}
