use std::sync::Arc;
use std::time::SystemTime;

use eyre::eyre;
use tracing::{error, info, trace, warn};

use gnd_dictionary::{Dictionary, DictionaryError};
use gnd_link::Link;
use gnd_store::{topics, FieldMap, FieldValue, Store};
use gnd_types::{nanos_since_epoch, Packet, ValueKind};

use crate::interface::InterfaceHandle;
use crate::supervisor::Supervisor;

/// Reply for a fully processed message.
pub const SUCCESS: &str = "SUCCESS";
/// Reply for a command vetoed by the hazardous check.
pub const HAZARDOUS_ERROR: &str = "HazardousError";

/// Consumes every message routed to this interface: structured commands are
/// built, validated and written to the link with raw and decommutated
/// echoes published; lifecycle directives short-circuit into the
/// supervisor.
pub struct CmdWorker<L, D, S> {
    interface: Arc<InterfaceHandle>,
    supervisor: Arc<Supervisor<L, D, S>>,
    link: Arc<L>,
    dictionary: Arc<D>,
    store: Arc<S>,
    scope: String,
}

impl<L, D, S> CmdWorker<L, D, S>
where
    L: Link,
    D: Dictionary,
    S: Store,
{
    pub fn new(
        supervisor: Arc<Supervisor<L, D, S>>,
        link: Arc<L>,
        dictionary: Arc<D>,
        store: Arc<S>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            interface: supervisor.interface().clone(),
            supervisor,
            link,
            dictionary,
            store,
            scope: scope.into(),
        }
    }

    /// The message loop. Every failure is caught, logged and returned as
    /// the reply; the loop only ends when the store closes the stream.
    pub async fn run(self) {
        info!(
            interface = self.interface.name(),
            "starting command processor"
        );

        loop {
            match self
                .store
                .recv_command(self.interface.name(), &self.scope)
                .await
            {
                Ok(Some(delivery)) => {
                    trace!(topic = %delivery.topic, "received command message");

                    let status = match self.handle(&delivery.topic, &delivery.fields).await {
                        Ok(status) => status,
                        Err(err) => {
                            error!(
                                interface = self.interface.name(),
                                "failed to handle command message: {err:#}"
                            );
                            format!("{err:#}")
                        }
                    };

                    delivery.reply(status);
                }
                Ok(None) => {
                    trace!(
                        interface = self.interface.name(),
                        "command stream closed"
                    );
                    break;
                }
                Err(err) => {
                    error!(
                        interface = self.interface.name(),
                        "command consume failed: {err}"
                    );
                    break;
                }
            }
        }

        info!(
            interface = self.interface.name(),
            "command processor stopped"
        );
    }

    async fn handle(&self, topic: &str, fields: &FieldMap) -> eyre::Result<String> {
        if topic.contains(topics::CMD_INTERFACE) {
            self.handle_lifecycle(fields).await
        } else {
            self.handle_command(fields).await
        }
    }

    async fn handle_lifecycle(&self, fields: &FieldMap) -> eyre::Result<String> {
        if fields.contains_key("connect") {
            info!(interface = self.interface.name(), "connect requested");
            if let Err(err) = self.supervisor.connect().await {
                error!(interface = self.interface.name(), "connect failed: {err}");
                return Ok(err.to_string());
            }
        } else if fields.contains_key("disconnect") {
            info!(interface = self.interface.name(), "disconnect requested");
            self.supervisor.disconnect(true).await;
        } else if let Some(raw) = fields.get("raw") {
            let data = raw.as_bytes();
            info!(
                interface = self.interface.name(),
                "writing {} raw bytes",
                data.len()
            );
            if let Err(err) = self.link.write_raw(data).await {
                error!(
                    interface = self.interface.name(),
                    "raw write failed: {err}"
                );
                return Ok(err.to_string());
            }
        } else if fields.contains_key("inject_tlm") {
            if let Err(err) = self.supervisor.inject_tlm(fields).await {
                error!(
                    interface = self.interface.name(),
                    "telemetry injection failed: {err:#}"
                );
                return Ok(format!("{err:#}"));
            }
        } else {
            warn!(
                interface = self.interface.name(),
                "unknown lifecycle directive"
            );
        }

        Ok(SUCCESS.to_string())
    }

    async fn handle_command(&self, fields: &FieldMap) -> eyre::Result<String> {
        let field_str = |key: &str| fields.get(key).and_then(FieldValue::as_str);
        let field_bool = |key: &str| fields.get(key).map_or(false, FieldValue::as_bool);

        let target_name =
            field_str("target_name").ok_or_else(|| eyre!("command is missing target_name"))?;
        let cmd_name = field_str("cmd_name").ok_or_else(|| eyre!("command is missing cmd_name"))?;
        let range_check = field_bool("range_check");
        let raw = field_bool("raw");
        let hazardous_check = field_bool("hazardous_check");

        let params: serde_json::Value = match serde_json::from_str(field_str("cmd_params").unwrap_or("{}"))
        {
            Ok(params) => params,
            Err(err) => {
                let err = DictionaryError::from(err);
                error!(
                    interface = self.interface.name(),
                    "invalid parameters for {target_name} {cmd_name}: {err}"
                );
                return Ok(err.to_string());
            }
        };

        let command = match self
            .dictionary
            .build_cmd(target_name, cmd_name, &params, range_check, raw)
            .await
        {
            Ok(command) => command,
            Err(err) => {
                error!(
                    interface = self.interface.name(),
                    "failed to build {target_name} {cmd_name}: {err}"
                );
                return Ok(err.to_string());
            }
        };

        if hazardous_check {
            match self.dictionary.cmd_hazardous(&command).await {
                Ok(Some(description)) => {
                    warn!(
                        interface = self.interface.name(),
                        "hazardous {target_name} {cmd_name} vetoed: {description}"
                    );
                    return Ok(HAZARDOUS_ERROR.to_string());
                }
                Ok(None) => {}
                Err(err) => return Ok(err.to_string()),
            }
        }

        if let Err(err) = self.link.write(&command).await {
            error!(
                interface = self.interface.name(),
                "failed to write {target_name} {cmd_name}: {err}"
            );
            return Ok(err.to_string());
        }
        self.interface.record_command();

        let target = command
            .target_name
            .clone()
            .unwrap_or_else(|| target_name.to_string());
        let packet = command
            .packet_name
            .clone()
            .unwrap_or_else(|| cmd_name.to_string());
        let time = nanos_since_epoch(command.received_time.unwrap_or_else(SystemTime::now));

        let mut echo = FieldMap::new();
        echo.insert("time".to_string(), time.into());
        echo.insert("target_name".to_string(), target.as_str().into());
        echo.insert("packet_name".to_string(), packet.as_str().into());
        echo.insert(
            "received_count".to_string(),
            (command.received_count as i64).into(),
        );

        let mut decom = echo.clone();

        echo.insert("buffer".to_string(), command.buffer.clone().into());
        self.store
            .write_topic(&topics::command_topic(&self.scope, &target, &packet), echo)
            .await?;

        decom.insert(
            "json_data".to_string(),
            Self::json_data(&command).to_string().into(),
        );
        self.store
            .write_topic(
                &topics::decom_cmd_topic(&self.scope, &target, &packet),
                decom,
            )
            .await?;

        self.store
            .set_interface(&self.interface.status(), &self.scope, false)
            .await?;

        Ok(SUCCESS.to_string())
    }

    /// Decommutated readings over the command's ordered items: the raw
    /// value under the item name, plus `__C`/`__F`/`__U` entries for the
    /// levels the dictionary defined.
    fn json_data(command: &Packet) -> serde_json::Value {
        let mut readings = serde_json::Map::new();

        for item in &command.items {
            readings.insert(item.name.clone(), item.read(ValueKind::Raw).to_json());

            if item.converted.is_some() {
                readings.insert(
                    format!("{}__C", item.name),
                    item.read(ValueKind::Converted).to_json(),
                );
            }
            if item.formatted.is_some() {
                readings.insert(
                    format!("{}__F", item.name),
                    item.read(ValueKind::Formatted).to_json(),
                );
            }
            if item.with_units.is_some() {
                readings.insert(
                    format!("{}__U", item.name),
                    item.read(ValueKind::WithUnits).to_json(),
                );
            }
        }

        serde_json::Value::Object(readings)
    }
}
