//! Store capability: pub/sub over named topics plus the interface-state
//! registry. The microservice is written against the [`Store`] trait;
//! [`LocalStore`] is the in-process implementation used by tests and
//! single-process deployments.

use async_trait::async_trait;

use gnd_types::InterfaceStatus;

pub use local::LocalStore;
pub use message::{Delivery, FieldMap, FieldValue};

pub mod topics;

mod local;
mod message;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store connection closed")]
    Closed,

    #[error("failed to publish: {0}")]
    Publish(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Waits for the next command or lifecycle directive routed to this
    /// interface. `Ok(None)` means the stream was closed for shutdown; the
    /// consumer must reply to every delivery it receives.
    async fn recv_command(&self, interface: &str, scope: &str) -> StoreResult<Option<Delivery>>;

    /// Publishes an opaque message map to a topic.
    async fn write_topic(&self, topic: &str, fields: FieldMap) -> StoreResult<()>;

    /// Registers or refreshes interface state.
    async fn set_interface(
        &self,
        status: &InterfaceStatus,
        scope: &str,
        initialize: bool,
    ) -> StoreResult<()>;
}

#[cfg(any(test, feature = "mocks"))]
mockall::mock! {
    pub Store { }

    #[async_trait]
    impl Store for Store {
        async fn recv_command(&self, interface: &str, scope: &str) -> StoreResult<Option<Delivery>>;
        async fn write_topic(&self, topic: &str, fields: FieldMap) -> StoreResult<()>;
        async fn set_interface(
            &self,
            status: &InterfaceStatus,
            scope: &str,
            initialize: bool,
        ) -> StoreResult<()>;
    }
}
