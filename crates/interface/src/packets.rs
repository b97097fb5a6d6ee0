use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use eyre::WrapErr;
use tracing::{error, warn};

use gnd_dictionary::{Dictionary, DictionaryError};
use gnd_store::{topics, FieldMap, Store};
use gnd_types::{nanos_since_epoch, Packet, UNKNOWN};

use crate::interface::InterfaceHandle;

/// Longest prefix of an unidentifiable packet shown in the error log.
const UNKNOWN_PREVIEW_LEN: usize = 16;

/// Identifies inbound packets, maintains reception counts and publishes
/// telemetry to the store.
pub struct PacketHandler<D, S> {
    interface: Arc<InterfaceHandle>,
    dictionary: Arc<D>,
    store: Arc<S>,
    scope: String,
    received_counts: Mutex<HashMap<(String, String), u64>>,
}

impl<D, S> PacketHandler<D, S>
where
    D: Dictionary,
    S: Store,
{
    pub fn new(
        interface: Arc<InterfaceHandle>,
        dictionary: Arc<D>,
        store: Arc<S>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            interface,
            dictionary,
            store,
            scope: scope.into(),
            received_counts: Mutex::new(HashMap::new()),
        }
    }

    /// Identifies the packet, updates the current-value table (unless the
    /// packet is a stored replay), and publishes it to its telemetry topic.
    ///
    /// Only the dictionary's not-found signal clears a stale
    /// pre-identification and falls back to identification; any other
    /// dictionary failure propagates.
    pub async fn handle(&self, mut packet: Packet) -> eyre::Result<()> {
        self.publish_state().await?;

        if packet.received_time.is_none() {
            packet.received_time = Some(SystemTime::now());
        }

        let targets = self.interface.target_names();

        let identified = if packet.stored {
            self.dictionary
                .identify_and_define(packet.clone(), targets)
                .await?
        } else if packet.identified() {
            let target = packet.target_name.clone().unwrap_or_default();
            let name = packet.packet_name.clone().unwrap_or_default();

            match self.dictionary.update(&target, &name, &packet.buffer).await {
                Ok(updated) => Some(updated),
                Err(DictionaryError::UnknownPacket { .. }) => {
                    warn!(
                        interface = self.interface.name(),
                        "Unknown packet {target} {name}, identifying"
                    );
                    packet.target_name = None;
                    packet.packet_name = None;
                    self.dictionary.identify(&packet.buffer, targets).await?
                }
                Err(err) => return Err(err).wrap_err("current-value update failed"),
            }
        } else {
            self.dictionary.identify(&packet.buffer, targets).await?
        };

        let mut packet = match identified {
            Some(mut known) => {
                known.copy_meta_from(&packet);
                known
            }
            None => {
                // Stored replays bypass the current-value table even on
                // the catch-all path.
                let mut unknown = if packet.stored {
                    let mut unknown = Packet::named(UNKNOWN, UNKNOWN);
                    unknown.buffer = packet.buffer.clone();
                    unknown
                } else {
                    self.dictionary
                        .update(UNKNOWN, UNKNOWN, &packet.buffer)
                        .await
                        .wrap_err("catch-all update failed")?
                };
                unknown.copy_meta_from(&packet);

                let preview = &packet.buffer[..packet.buffer.len().min(UNKNOWN_PREVIEW_LEN)];
                error!(
                    interface = self.interface.name(),
                    "Unknown {} byte packet starting: {}",
                    packet.buffer.len(),
                    hex::encode_upper(preview)
                );

                unknown
            }
        };

        let target = packet.target_name.clone().unwrap_or_else(|| UNKNOWN.into());
        let name = packet.packet_name.clone().unwrap_or_else(|| UNKNOWN.into());

        self.interface.record_telemetry(&target);
        packet.received_count = {
            let mut counts = self
                .received_counts
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let count = counts.entry((target.clone(), name.clone())).or_insert(0);
            *count += 1;
            *count
        };

        self.publish(&packet, &target, &name).await
    }

    async fn publish(&self, packet: &Packet, target: &str, name: &str) -> eyre::Result<()> {
        let time = packet.received_time.unwrap_or_else(SystemTime::now);

        let mut fields = FieldMap::new();
        fields.insert("time".to_string(), nanos_since_epoch(time).into());
        fields.insert("stored".to_string(), packet.stored.to_string().into());
        fields.insert("target_name".to_string(), target.into());
        fields.insert("packet_name".to_string(), name.into());
        fields.insert(
            "received_count".to_string(),
            (packet.received_count as i64).into(),
        );
        fields.insert("buffer".to_string(), packet.buffer.clone().into());

        let topic = topics::telemetry_topic(&self.scope, target, name);
        self.store
            .write_topic(&topic, fields)
            .await
            .wrap_err("telemetry publication failed")
    }

    async fn publish_state(&self) -> eyre::Result<()> {
        self.store
            .set_interface(&self.interface.status(), &self.scope, false)
            .await
            .wrap_err("interface state publication failed")
    }
}
