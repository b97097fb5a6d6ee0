use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use gnd_types::{ItemValue, Packet, ValueKind, UNKNOWN};

use crate::{Dictionary, DictionaryError, DictionaryResult};

/// Telemetry packet definition: a template plus the leading id bytes that
/// identify it on the wire.
#[derive(Clone, Debug, Default)]
pub struct PacketDef {
    pub template: Packet,
    pub id_bytes: Option<Vec<u8>>,
}

/// Command definition: a template plus validation metadata.
#[derive(Clone, Debug, Default)]
pub struct CmdDef {
    pub template: Packet,
    pub hazardous: Option<String>,
    /// Inclusive raw-value bounds per parameter, enforced when the
    /// commander requests range checking.
    pub ranges: HashMap<String, (i64, i64)>,
}

/// In-memory dictionary over a fixed set of definitions.
///
/// The catch-all `UNKNOWN/UNKNOWN` telemetry identity is always defined so
/// unidentifiable packets still land in the current-value table.
pub struct StaticDictionary {
    telemetry: BTreeMap<(String, String), PacketDef>,
    commands: BTreeMap<(String, String), CmdDef>,
    cvt: Mutex<HashMap<(String, String), Packet>>,
    cmd_counts: Mutex<HashMap<(String, String), u64>>,
}

impl Default for StaticDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticDictionary {
    pub fn new() -> Self {
        let mut telemetry = BTreeMap::new();
        telemetry.insert(
            (UNKNOWN.to_string(), UNKNOWN.to_string()),
            PacketDef {
                template: Packet::named(UNKNOWN, UNKNOWN),
                id_bytes: None,
            },
        );

        Self {
            telemetry,
            commands: BTreeMap::new(),
            cvt: Mutex::new(HashMap::new()),
            cmd_counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn define_telemetry(&mut self, target: &str, packet: &str, def: PacketDef) {
        self.telemetry
            .insert((target.to_string(), packet.to_string()), def);
    }

    pub fn define_command(&mut self, target: &str, packet: &str, def: CmdDef) {
        self.commands
            .insert((target.to_string(), packet.to_string()), def);
    }

    fn telemetry_def(&self, target: &str, packet: &str) -> DictionaryResult<&PacketDef> {
        self.telemetry
            .get(&(target.to_string(), packet.to_string()))
            .ok_or_else(|| DictionaryError::UnknownPacket {
                target: target.to_string(),
                packet: packet.to_string(),
            })
    }

    fn store_current(&self, packet: &Packet) {
        if let (Some(target), Some(name)) = (&packet.target_name, &packet.packet_name) {
            self.cvt
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert((target.clone(), name.clone()), packet.clone());
        }
    }

    fn identify_def(&self, buffer: &[u8], targets: &[String]) -> Option<Packet> {
        for ((target, _), def) in &self.telemetry {
            if !targets.contains(target) {
                continue;
            }
            let Some(id_bytes) = &def.id_bytes else {
                continue;
            };
            if buffer.len() >= id_bytes.len() && buffer.starts_with(id_bytes) {
                let mut packet = def.template.clone();
                packet.buffer = buffer.to_vec();
                return Some(packet);
            }
        }

        None
    }

    fn check_range(item: &str, value: &ItemValue, bounds: (i64, i64)) -> DictionaryResult<()> {
        let (minimum, maximum) = bounds;
        let in_range = match value {
            ItemValue::Int(v) => *v >= minimum && *v <= maximum,
            ItemValue::Uint(v) => {
                i64::try_from(*v).map_or(false, |v| v >= minimum && v <= maximum)
            }
            ItemValue::Float(v) => *v >= minimum as f64 && *v <= maximum as f64,
            ItemValue::Str(_) | ItemValue::Bytes(_) => true,
        };

        if in_range {
            Ok(())
        } else {
            Err(DictionaryError::OutOfRange {
                item: item.to_string(),
                value: value.to_string(),
                minimum,
                maximum,
            })
        }
    }
}

#[async_trait]
impl Dictionary for StaticDictionary {
    async fn build_cmd(
        &self,
        target: &str,
        name: &str,
        params: &serde_json::Value,
        range_check: bool,
        raw: bool,
    ) -> DictionaryResult<Packet> {
        let def = self
            .commands
            .get(&(target.to_string(), name.to_string()))
            .ok_or_else(|| DictionaryError::UnknownPacket {
                target: target.to_string(),
                packet: name.to_string(),
            })?;

        let params = params
            .as_object()
            .ok_or_else(|| DictionaryError::Build("command parameters must be an object".into()))?;

        let mut command = def.template.clone();

        for (param, value) in params {
            if command.item(param).is_none() {
                return Err(DictionaryError::UnknownParam {
                    target: target.to_string(),
                    packet: name.to_string(),
                    name: param.clone(),
                });
            }

            let value = ItemValue::from_json(value).ok_or_else(|| {
                DictionaryError::Build(format!("unsupported value for parameter {param}"))
            })?;

            if range_check {
                if let Some(bounds) = def.ranges.get(param) {
                    Self::check_range(param, &value, *bounds)?;
                }
            }

            // A raw build bypasses write conversions; otherwise the given
            // value is also the converted reading.
            if !raw && command.item(param).is_some_and(|item| item.converted.is_some()) {
                let _ = command.write_item(param, value.clone(), ValueKind::Converted);
            }
            let _ = command.write_item(param, value, ValueKind::Raw);
        }

        let mut counts = self
            .cmd_counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let count = counts
            .entry((target.to_string(), name.to_string()))
            .or_insert(0);
        *count += 1;
        command.received_count = *count;

        Ok(command)
    }

    async fn cmd_hazardous(&self, command: &Packet) -> DictionaryResult<Option<String>> {
        let target = command.target_name.as_deref().unwrap_or_default();
        let name = command.packet_name.as_deref().unwrap_or_default();

        let def = self
            .commands
            .get(&(target.to_string(), name.to_string()))
            .ok_or_else(|| DictionaryError::UnknownPacket {
                target: target.to_string(),
                packet: name.to_string(),
            })?;

        Ok(def.hazardous.clone())
    }

    async fn identify_and_define(
        &self,
        packet: Packet,
        targets: &[String],
    ) -> DictionaryResult<Option<Packet>> {
        Ok(self.identify_def(&packet.buffer, targets))
    }

    async fn identify(
        &self,
        buffer: &[u8],
        targets: &[String],
    ) -> DictionaryResult<Option<Packet>> {
        let identified = self.identify_def(buffer, targets);
        if let Some(packet) = &identified {
            self.store_current(packet);
        }

        Ok(identified)
    }

    async fn update(&self, target: &str, name: &str, buffer: &[u8]) -> DictionaryResult<Packet> {
        let def = self.telemetry_def(target, name)?;

        let mut packet = def.template.clone();
        packet.buffer = buffer.to_vec();
        self.store_current(&packet);

        Ok(packet)
    }

    async fn packet(&self, target: &str, name: &str) -> DictionaryResult<Packet> {
        let current = self
            .cvt
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&(target.to_string(), name.to_string()))
            .cloned();

        match current {
            Some(packet) => Ok(packet),
            None => Ok(self.telemetry_def(target, name)?.template.clone()),
        }
    }
}
