use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, SystemTime};

use eyre::{eyre, WrapErr};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use gnd_dictionary::Dictionary;
use gnd_link::{Link, LinkError, LinkResult};
use gnd_store::{FieldMap, Store};
use gnd_types::{InterfaceState, ItemValue, ValueKind};

use crate::interface::InterfaceHandle;
use crate::packets::PacketHandler;
use crate::reporter::ExceptionSink;

/// Tick of the idle and maintenance waits. Cancellation is observed within
/// one tick.
const WORK_TICK: Duration = Duration::from_secs(1);

/// Flags protected by the supervisor mutex. `cancel` latches; once set it
/// is never cleared. `idle` parks the read/connect loop after a commanded
/// disconnect or a connection loss with reconnection disabled.
#[derive(Default)]
struct Flags {
    cancel: bool,
    idle: bool,
}

/// Owns the connection state machine and the inbound packet loop, and
/// serializes lifecycle transitions with concurrent commanders.
///
/// The critical section protected by the flags mutex is exactly
/// `{cancel, idle, Link::connect, Link::disconnect}`: `stop` sets `cancel`
/// and disconnects under the mutex, so a concurrent `connect` either
/// observes `cancel` and skips the link call, or already entered it and is
/// interrupted by the disconnect.
pub struct Supervisor<L, D, S> {
    interface: Arc<InterfaceHandle>,
    link: Arc<L>,
    dictionary: Arc<D>,
    store: Arc<S>,
    handler: PacketHandler<D, S>,
    scope: String,
    flags: Mutex<Flags>,
    /// Cancellable sleeper shared with the embedding microservice.
    cancellation: CancellationToken,
    reporter: Arc<dyn ExceptionSink>,
    failed_msgs: StdMutex<HashSet<String>>,
    lost_msgs: StdMutex<HashSet<String>>,
}

impl<L, D, S> Supervisor<L, D, S>
where
    L: Link,
    D: Dictionary,
    S: Store,
{
    pub fn new(
        interface: Arc<InterfaceHandle>,
        link: Arc<L>,
        dictionary: Arc<D>,
        store: Arc<S>,
        scope: impl Into<String>,
        cancellation: CancellationToken,
        reporter: Arc<dyn ExceptionSink>,
    ) -> Self {
        let scope = scope.into();
        let handler = PacketHandler::new(
            interface.clone(),
            dictionary.clone(),
            store.clone(),
            scope.clone(),
        );

        Self {
            interface,
            link,
            dictionary,
            store,
            handler,
            scope,
            flags: Mutex::new(Flags::default()),
            cancellation,
            reporter,
            failed_msgs: StdMutex::new(HashSet::new()),
            lost_msgs: StdMutex::new(HashSet::new()),
        }
    }

    pub fn interface(&self) -> &Arc<InterfaceHandle> {
        &self.interface
    }

    /// The read and connection-maintenance loop. Runs until `stop` latches
    /// cancellation.
    pub async fn run(&self) {
        info!(
            interface = self.interface.name(),
            "starting interface supervisor"
        );

        loop {
            {
                let flags = self.flags.lock().await;
                if flags.cancel {
                    break;
                }
                if flags.idle {
                    drop(flags);
                    self.sleep_tick(WORK_TICK).await;
                    continue;
                }
            }

            if !self.link.connected().await {
                self.attempt_connect().await;
                continue;
            }

            if self.link.read_allowed() {
                match self.link.read().await {
                    Ok(Some(packet)) => {
                        if let Err(err) = self.handler.handle(packet).await {
                            // Nowhere to publish means nothing useful left
                            // to do: treat as fatal and bring the
                            // microservice down.
                            error!(
                                interface = self.interface.name(),
                                "packet processing failed, shutting down: {err:#}"
                            );
                            self.flags.lock().await.cancel = true;
                            self.cancellation.cancel();
                            break;
                        }
                    }
                    Ok(None) => {
                        info!(
                            interface = self.interface.name(),
                            "connection closed by remote"
                        );
                        self.handle_connection_lost(None).await;
                    }
                    Err(err) => self.handle_connection_lost(Some(err)).await,
                }
            } else {
                // Connection maintenance only.
                self.sleep_tick(WORK_TICK).await;
                if !self.link.connected().await {
                    self.handle_connection_lost(None).await;
                }
            }
        }

        info!(
            interface = self.interface.name(),
            "interface supervisor stopped"
        );
    }

    /// One connection attempt from the main loop. The pre-entry check runs
    /// inside the critical section so a racing `stop` is never overtaken.
    async fn attempt_connect(&self) {
        self.interface.set_state(InterfaceState::Attempting);
        self.publish_state().await;

        let result = {
            let flags = self.flags.lock().await;
            if flags.cancel || flags.idle {
                return;
            }
            self.link.connect().await
        };

        match result {
            Ok(()) => {
                self.flags.lock().await.idle = false;
                self.interface.set_state(InterfaceState::Connected);
                self.publish_state().await;
                info!(interface = self.interface.name(), "connection success");
            }
            Err(err) => self.handle_connection_failed(err).await,
        }
    }

    /// Commanded connect. Clears the idle latch and connects immediately,
    /// under the supervisor mutex.
    pub async fn connect(&self) -> LinkResult<()> {
        {
            let mut flags = self.flags.lock().await;
            flags.idle = false;
            if flags.cancel {
                return Err(LinkError::Canceled);
            }
            self.link.connect().await?;
        }

        self.interface.set_state(InterfaceState::Connected);
        self.publish_state().await;
        info!(interface = self.interface.name(), "connection success");

        Ok(())
    }

    /// Disconnects the link. A commanded disconnect (or a loss with
    /// reconnection disabled) parks the loop until the next commanded
    /// connect.
    pub async fn disconnect(&self, commanded: bool) {
        {
            let mut flags = self.flags.lock().await;
            if commanded || !self.link.auto_reconnect() {
                flags.idle = true;
            }
            if let Err(err) = self.link.disconnect().await {
                debug!(
                    interface = self.interface.name(),
                    "disconnect failure: {err}"
                );
            }
        }

        self.interface.set_state(InterfaceState::Disconnected);
        self.publish_state().await;

        if self.link.auto_reconnect() && !self.flags.lock().await.cancel {
            self.sleep_tick(self.link.reconnect_delay()).await;
        }
    }

    /// Latches cancellation, wakes every sleeper and releases the link.
    /// After this returns no further `Link::connect` can happen.
    pub async fn stop(&self) {
        let mut flags = self.flags.lock().await;
        flags.cancel = true;
        self.cancellation.cancel();
        if let Err(err) = self.link.disconnect().await {
            debug!(
                interface = self.interface.name(),
                "disconnect failure: {err}"
            );
        }
    }

    /// Builds a telemetry packet from the dictionary template and feeds it
    /// through the normal packet path.
    pub async fn inject_tlm(&self, fields: &FieldMap) -> eyre::Result<()> {
        let target = fields
            .get("target_name")
            .and_then(|field| field.as_str())
            .ok_or_else(|| eyre!("inject_tlm is missing target_name"))?;
        let name = fields
            .get("packet_name")
            .and_then(|field| field.as_str())
            .ok_or_else(|| eyre!("inject_tlm is missing packet_name"))?;
        let kind = match fields.get("type").and_then(|field| field.as_str()) {
            Some(text) => text.parse::<ValueKind>().map_err(|err| eyre!("{err}"))?,
            None => ValueKind::default(),
        };

        let mut packet = self
            .dictionary
            .packet(target, name)
            .await
            .wrap_err("telemetry template lookup failed")?;

        if let Some(item_hash) = fields.get("item_hash").and_then(|field| field.as_str()) {
            let items: serde_json::Value =
                serde_json::from_str(item_hash).wrap_err("invalid item_hash")?;
            let items = items
                .as_object()
                .ok_or_else(|| eyre!("item_hash must be an object"))?;

            for (item, value) in items {
                let value = ItemValue::from_json(value)
                    .ok_or_else(|| eyre!("unsupported value for item {item}"))?;
                packet
                    .write_item(item, value, kind)
                    .wrap_err_with(|| format!("cannot inject {target} {name}"))?;
            }
        }

        packet.received_time = Some(SystemTime::now());

        self.handler.handle(packet).await
    }

    pub(crate) async fn handle_connection_failed(&self, err: LinkError) {
        self.report_failure("Connection Failed", err, &self.failed_msgs)
            .await;
        self.disconnect(false).await;
    }

    pub(crate) async fn handle_connection_lost(&self, err: Option<LinkError>) {
        if let Some(err) = err {
            self.report_failure("Connection Lost", err, &self.lost_msgs)
                .await;
        }
        self.disconnect(false).await;
    }

    /// Failure classification: interrupts latch shutdown, transient
    /// transport failures are summarized, anything else is logged in full
    /// and persisted once per novel message.
    async fn report_failure(
        &self,
        context: &str,
        err: LinkError,
        seen: &StdMutex<HashSet<String>>,
    ) {
        if err.is_interrupt() {
            info!(
                interface = self.interface.name(),
                "{context}: interrupted, shutting down"
            );
            self.flags.lock().await.cancel = true;
            self.cancellation.cancel();
            return;
        }

        if err.is_transient() {
            warn!(interface = self.interface.name(), "{context}: {err}");
            return;
        }

        error!(interface = self.interface.name(), "{context}: {err:?}");

        let novel = seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(err.to_string());
        if novel {
            match self
                .reporter
                .write_exception(self.interface.name(), context, &format!("{err:?}"))
            {
                Ok(path) => info!(
                    interface = self.interface.name(),
                    "wrote exception report: {}",
                    path.display()
                ),
                Err(write_err) => warn!(
                    interface = self.interface.name(),
                    "failed to persist exception report: {write_err}"
                ),
            }
        }
    }

    async fn publish_state(&self) {
        if let Err(err) = self
            .store
            .set_interface(&self.interface.status(), &self.scope, false)
            .await
        {
            error!(
                interface = self.interface.name(),
                "failed to publish interface state: {err}"
            );
        }
    }

    async fn sleep_tick(&self, duration: Duration) {
        tokio::select! {
            _ = self.cancellation.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }
}
