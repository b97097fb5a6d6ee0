//! Link capability: a bidirectional framed packet transport with explicit
//! connect/disconnect and a reconnect policy. The interface supervisor is
//! written against the [`Link`] trait; [`TcpLink`] is the stock TCP client
//! driver.

use std::time::Duration;

use async_trait::async_trait;

use gnd_types::Packet;

pub use error::{LinkError, LinkResult};
pub use tcp::{TcpLink, TcpLinkConfig};

mod error;
mod tcp;

/// Delay between reconnect attempts when the driver does not override it.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[async_trait]
pub trait Link: Send + Sync {
    async fn connect(&self) -> LinkResult<()>;

    async fn disconnect(&self) -> LinkResult<()>;

    async fn connected(&self) -> bool;

    /// Waits for the next inbound packet. `Ok(None)` signals a clean
    /// disconnect; errors signal an unclean one.
    async fn read(&self) -> LinkResult<Option<Packet>>;

    /// Writes a built command packet.
    async fn write(&self, command: &Packet) -> LinkResult<()>;

    /// Writes raw bytes, bypassing any command framing the driver adds on
    /// top of its own.
    async fn write_raw(&self, data: &[u8]) -> LinkResult<()>;

    /// False means the link is maintenance-only: the supervisor keeps the
    /// connection alive but never reads.
    fn read_allowed(&self) -> bool {
        true
    }

    fn auto_reconnect(&self) -> bool {
        true
    }

    fn reconnect_delay(&self) -> Duration {
        DEFAULT_RECONNECT_DELAY
    }
}

#[cfg(any(test, feature = "mocks"))]
mockall::mock! {
    pub Link { }

    #[async_trait]
    impl Link for Link {
        async fn connect(&self) -> LinkResult<()>;
        async fn disconnect(&self) -> LinkResult<()>;
        async fn connected(&self) -> bool;
        async fn read(&self) -> LinkResult<Option<Packet>>;
        async fn write(&self, command: &Packet) -> LinkResult<()>;
        async fn write_raw(&self, data: &[u8]) -> LinkResult<()>;
        fn read_allowed(&self) -> bool;
        fn auto_reconnect(&self) -> bool;
        fn reconnect_delay(&self) -> Duration;
    }
}
