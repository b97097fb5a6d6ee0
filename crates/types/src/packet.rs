use std::time::SystemTime;

use crate::value::{ItemValue, ValueKind};

/// One named item of a packet with its resolved readings.
///
/// The optional readings encode dictionary knowledge about the item: a
/// `converted` value is present iff the item carries a write conversion or
/// states, `formatted` iff it has a format string, `with_units` iff it has
/// units.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemReading {
    pub name: String,
    pub raw: ItemValue,
    pub converted: Option<ItemValue>,
    pub formatted: Option<String>,
    pub with_units: Option<String>,
}

impl ItemReading {
    pub fn raw(name: impl Into<String>, raw: ItemValue) -> Self {
        Self {
            name: name.into(),
            raw,
            converted: None,
            formatted: None,
            with_units: None,
        }
    }

    /// Reads the item at the requested level, falling back towards the raw
    /// value when the dictionary defined nothing richer.
    pub fn read(&self, kind: ValueKind) -> ItemValue {
        match kind {
            ValueKind::Raw => self.raw.clone(),
            ValueKind::Converted => self.converted.clone().unwrap_or_else(|| self.raw.clone()),
            ValueKind::Formatted => match &self.formatted {
                Some(text) => ItemValue::Str(text.clone()),
                None => ItemValue::Str(self.read(ValueKind::Converted).to_string()),
            },
            ValueKind::WithUnits => match &self.with_units {
                Some(text) => ItemValue::Str(text.clone()),
                None => self.read(ValueKind::Formatted),
            },
        }
    }

    fn write(&mut self, value: ItemValue, kind: ValueKind) {
        match kind {
            ValueKind::Raw => self.raw = value,
            ValueKind::Converted => self.converted = Some(value),
            ValueKind::Formatted => self.formatted = Some(value.to_string()),
            ValueKind::WithUnits => self.with_units = Some(value.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("packet has no item named {0}")]
pub struct UnknownItem(pub String);

/// A framed unit of binary data: telemetry when inbound, a command when
/// outbound. Commands are packets whose items were resolved by the
/// dictionary at build time.
#[derive(Clone, Debug, Default)]
pub struct Packet {
    pub target_name: Option<String>,
    pub packet_name: Option<String>,
    pub buffer: Vec<u8>,
    pub received_time: Option<SystemTime>,
    pub received_count: u64,
    /// Historical replay: identified and published, but the current-value
    /// table is not touched.
    pub stored: bool,
    pub extra: Option<serde_json::Value>,
    pub items: Vec<ItemReading>,
}

impl Packet {
    pub fn from_buffer(buffer: Vec<u8>) -> Self {
        Self {
            buffer,
            ..Default::default()
        }
    }

    pub fn named(target_name: impl Into<String>, packet_name: impl Into<String>) -> Self {
        Self {
            target_name: Some(target_name.into()),
            packet_name: Some(packet_name.into()),
            ..Default::default()
        }
    }

    pub fn identified(&self) -> bool {
        self.target_name.is_some() && self.packet_name.is_some()
    }

    pub fn item(&self, name: &str) -> Option<&ItemReading> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn read_item(&self, name: &str, kind: ValueKind) -> Option<ItemValue> {
        self.item(name).map(|item| item.read(kind))
    }

    pub fn write_item(
        &mut self,
        name: &str,
        value: ItemValue,
        kind: ValueKind,
    ) -> Result<(), UnknownItem> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.name == name)
            .ok_or_else(|| UnknownItem(name.to_string()))?;

        item.write(value, kind);

        Ok(())
    }

    /// Carries reception metadata over from the packet as it arrived onto
    /// the packet the dictionary identified.
    pub fn copy_meta_from(&mut self, original: &Packet) {
        self.received_time = original.received_time;
        self.stored = original.stored;
        self.extra = original.extra.clone();
    }
}
