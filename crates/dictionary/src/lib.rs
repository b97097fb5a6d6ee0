//! Dictionary capability: builds commands from name + parameters,
//! identifies and decodes telemetry, maintains the current-value table and
//! answers hazardous queries. The interface microservice is written against
//! the [`Dictionary`] trait; [`StaticDictionary`] is the in-memory
//! implementation used by tests and single-process deployments.

use async_trait::async_trait;

use gnd_types::Packet;

pub use error::{DictionaryError, DictionaryResult};
pub use fixed::{CmdDef, PacketDef, StaticDictionary};

mod error;
mod fixed;

#[async_trait]
pub trait Dictionary: Send + Sync {
    /// Builds a command packet with fully resolved item values.
    async fn build_cmd(
        &self,
        target: &str,
        name: &str,
        params: &serde_json::Value,
        range_check: bool,
        raw: bool,
    ) -> DictionaryResult<Packet>;

    /// `Some(description)` when the command requires additional
    /// authorization.
    async fn cmd_hazardous(&self, command: &Packet) -> DictionaryResult<Option<String>>;

    /// Identifies a packet without touching the current-value table. Used
    /// for stored (replayed) packets.
    async fn identify_and_define(
        &self,
        packet: Packet,
        targets: &[String],
    ) -> DictionaryResult<Option<Packet>>;

    /// Identifies a buffer against the given targets and updates the
    /// current-value table on a match.
    async fn identify(&self, buffer: &[u8], targets: &[String])
        -> DictionaryResult<Option<Packet>>;

    /// Updates the current-value table for a known packet.
    /// [`DictionaryError::UnknownPacket`] is the not-found signal.
    async fn update(&self, target: &str, name: &str, buffer: &[u8]) -> DictionaryResult<Packet>;

    /// Template packet for the given identity, used by telemetry injection.
    async fn packet(&self, target: &str, name: &str) -> DictionaryResult<Packet>;
}

#[cfg(any(test, feature = "mocks"))]
mockall::mock! {
    pub Dictionary { }

    #[async_trait]
    impl Dictionary for Dictionary {
        async fn build_cmd(
            &self,
            target: &str,
            name: &str,
            params: &serde_json::Value,
            range_check: bool,
            raw: bool,
        ) -> DictionaryResult<Packet>;
        async fn cmd_hazardous(&self, command: &Packet) -> DictionaryResult<Option<String>>;
        async fn identify_and_define(
            &self,
            packet: Packet,
            targets: &[String],
        ) -> DictionaryResult<Option<Packet>>;
        async fn identify(
            &self,
            buffer: &[u8],
            targets: &[String],
        ) -> DictionaryResult<Option<Packet>>;
        async fn update(&self, target: &str, name: &str, buffer: &[u8]) -> DictionaryResult<Packet>;
        async fn packet(&self, target: &str, name: &str) -> DictionaryResult<Packet>;
    }
}
