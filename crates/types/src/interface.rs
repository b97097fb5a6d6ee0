use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Connection state of an interface. Only the supervisor transitions it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterfaceState {
    #[default]
    Disconnected,
    Attempting,
    Connected,
}

impl Display for InterfaceState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Attempting => "ATTEMPTING",
            Self::Connected => "CONNECTED",
        };
        f.write_str(text)
    }
}

/// Snapshot of an interface registered in the store. `set_interface`
/// publishes this on every transition and after every handled command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterfaceStatus {
    pub name: String,
    pub state: InterfaceState,
    pub target_names: Vec<String>,
    pub cmd_count: u64,
    pub tlm_count: u64,
    /// Telemetry counters per known target.
    pub target_tlm_counts: BTreeMap<String, u64>,
}
