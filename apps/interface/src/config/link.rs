use std::time::Duration;

use serde::Deserialize;

use gnd_link::TcpLinkConfig;

#[derive(Deserialize, Clone)]
pub struct LinkConfig {
    /// Host the device listens on.
    pub host: String,
    /// Port the device listens on.
    pub port: u16,
    /// The timeout in seconds after which a connection attempt aborts.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Whether to reconnect after a connection loss.
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,
    /// Delay in seconds between reconnect attempts.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: u64,
    /// False keeps the connection alive without reading telemetry.
    #[serde(default = "default_true")]
    pub read_allowed: bool,
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl LinkConfig {
    pub fn to_link_config(&self) -> TcpLinkConfig {
        TcpLinkConfig {
            host: self.host.clone(),
            port: self.port,
            connect_timeout: Duration::from_secs(self.connect_timeout),
            auto_reconnect: self.auto_reconnect,
            reconnect_delay: Duration::from_secs(self.reconnect_delay),
            read_allowed: self.read_allowed,
        }
    }
}
