//! Shared data model for the gnd workspace: packets, typed item readings,
//! interface state and the textual coercions used on the wire.

pub use interface::{InterfaceState, InterfaceStatus};
pub use packet::{ItemReading, Packet, UnknownItem};
pub use value::{parse_bool, ItemValue, ValueKind, ValueKindParseError};

mod interface;
mod packet;
mod value;

use std::time::{SystemTime, UNIX_EPOCH};

/// Catch-all identity for packets the dictionary cannot identify.
pub const UNKNOWN: &str = "UNKNOWN";

/// Converts a timestamp to the wire representation: nanoseconds since epoch.
pub fn nanos_since_epoch(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_nanos() as i64,
        Err(_) => 0,
    }
}
