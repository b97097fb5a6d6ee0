use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use gnd_types::{InterfaceState, InterfaceStatus};

/// Shared descriptor of the interface this microservice supervises.
///
/// Owned by the supervisor, read by the command worker through an `Arc`.
/// Only the supervisor transitions the connection state.
pub struct InterfaceHandle {
    name: String,
    target_names: Vec<String>,
    state: Mutex<InterfaceState>,
    cmd_count: AtomicU64,
    tlm_count: AtomicU64,
    target_tlm_counts: HashMap<String, AtomicU64>,
}

impl InterfaceHandle {
    pub fn new(name: impl Into<String>, target_names: Vec<String>) -> Self {
        let target_tlm_counts = target_names
            .iter()
            .map(|target| (target.clone(), AtomicU64::new(0)))
            .collect();

        Self {
            name: name.into(),
            target_names,
            state: Mutex::new(InterfaceState::Disconnected),
            cmd_count: AtomicU64::new(0),
            tlm_count: AtomicU64::new(0),
            target_tlm_counts,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target_names(&self) -> &[String] {
        &self.target_names
    }

    pub fn state(&self) -> InterfaceState {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn set_state(&self, state: InterfaceState) {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }

    pub(crate) fn record_command(&self) {
        self.cmd_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one received packet, and one against the target when it is
    /// one of ours.
    pub(crate) fn record_telemetry(&self, target: &str) {
        self.tlm_count.fetch_add(1, Ordering::Relaxed);
        if let Some(count) = self.target_tlm_counts.get(target) {
            count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn status(&self) -> InterfaceStatus {
        let target_tlm_counts: BTreeMap<String, u64> = self
            .target_tlm_counts
            .iter()
            .map(|(target, count)| (target.clone(), count.load(Ordering::Relaxed)))
            .collect();

        InterfaceStatus {
            name: self.name.clone(),
            state: self.state(),
            target_names: self.target_names.clone(),
            cmd_count: self.cmd_count.load(Ordering::Relaxed),
            tlm_count: self.tlm_count.load(Ordering::Relaxed),
            target_tlm_counts,
        }
    }
}
