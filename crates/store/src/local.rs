use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use gnd_types::InterfaceStatus;

use crate::topics::{cmd_interface_topic, cmd_topic};
use crate::{Delivery, FieldMap, Store, StoreError, StoreResult};

type TopicChannel = (flume::Sender<FieldMap>, flume::Receiver<FieldMap>);
type CommandChannel = (flume::Sender<Delivery>, flume::Receiver<Delivery>);

/// In-process store over flume channels.
///
/// Topics are created lazily on first write or subscription. Commands are
/// queued per interface and handed to whoever consumes that interface's
/// stream; [`LocalStore::close`] ends every consumer with `Ok(None)`.
#[derive(Clone, Default)]
pub struct LocalStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    topics: Mutex<HashMap<String, TopicChannel>>,
    commands: Mutex<HashMap<String, CommandChannel>>,
    statuses: Mutex<HashMap<String, InterfaceStatus>>,
    closed: CancellationToken,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn command_channel(&self, interface: &str, scope: &str) -> CommandChannel {
        let key = format!("{scope}__{interface}");
        let mut commands = Self::lock(&self.inner.commands);
        commands.entry(key).or_insert_with(flume::unbounded).clone()
    }

    fn topic_channel(&self, topic: &str) -> TopicChannel {
        let mut topics = Self::lock(&self.inner.topics);
        topics
            .entry(topic.to_string())
            .or_insert_with(flume::unbounded)
            .clone()
    }

    fn deliver(
        &self,
        topic: String,
        interface: &str,
        scope: &str,
        fields: FieldMap,
    ) -> StoreResult<oneshot::Receiver<String>> {
        if self.inner.closed.is_cancelled() {
            return Err(StoreError::Closed);
        }

        let (delivery, reply_rx) = Delivery::new(topic.clone(), fields);
        let (tx, _) = self.command_channel(interface, scope);
        tx.send(delivery)
            .map_err(|err| StoreError::Publish(format!("{topic}: {err}")))?;

        Ok(reply_rx)
    }

    /// Queues a lifecycle directive for the interface; the returned channel
    /// yields the consumer's reply.
    pub fn send_lifecycle(
        &self,
        interface: &str,
        scope: &str,
        fields: FieldMap,
    ) -> StoreResult<oneshot::Receiver<String>> {
        self.deliver(cmd_interface_topic(scope, interface), interface, scope, fields)
    }

    /// Queues a structured command for the interface.
    pub fn send_command(
        &self,
        interface: &str,
        scope: &str,
        fields: FieldMap,
    ) -> StoreResult<oneshot::Receiver<String>> {
        self.deliver(cmd_topic(scope, interface), interface, scope, fields)
    }

    /// Subscribes to a topic. Messages published before the first
    /// subscription are retained.
    pub fn subscribe(&self, topic: &str) -> flume::Receiver<FieldMap> {
        self.topic_channel(topic).1
    }

    pub fn interface_status(&self, name: &str, scope: &str) -> Option<InterfaceStatus> {
        Self::lock(&self.inner.statuses)
            .get(&format!("{scope}__{name}"))
            .cloned()
    }

    /// Closes every command stream; consumers observe `Ok(None)`.
    pub fn close(&self) {
        self.inner.closed.cancel();
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn recv_command(&self, interface: &str, scope: &str) -> StoreResult<Option<Delivery>> {
        let (_, rx) = self.command_channel(interface, scope);

        tokio::select! {
            _ = self.inner.closed.cancelled() => Ok(None),
            delivery = rx.recv_async() => match delivery {
                Ok(delivery) => Ok(Some(delivery)),
                Err(_) => Ok(None),
            },
        }
    }

    async fn write_topic(&self, topic: &str, fields: FieldMap) -> StoreResult<()> {
        trace!(topic, "writing topic entry");

        let (tx, _) = self.topic_channel(topic);
        tx.send(fields)
            .map_err(|err| StoreError::Publish(format!("{topic}: {err}")))
    }

    async fn set_interface(
        &self,
        status: &InterfaceStatus,
        scope: &str,
        initialize: bool,
    ) -> StoreResult<()> {
        trace!(interface = %status.name, initialize, "refreshing interface state");

        Self::lock(&self.inner.statuses)
            .insert(format!("{scope}__{}", status.name), status.clone());

        Ok(())
    }
}
