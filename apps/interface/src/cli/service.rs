use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use gnd_dictionary::StaticDictionary;
use gnd_interface::{FsExceptionSink, InterfaceMicroservice};
use gnd_link::TcpLink;
use gnd_store::{topics, LocalStore};
use gnd_types::UNKNOWN;

use crate::config::ServiceConfig;

/// Wires the interface microservice against a TCP client link and the
/// in-process store. Deployments with a networked store swap in their own
/// `Store` implementation at this seam.
pub struct Service {
    microservice: InterfaceMicroservice<TcpLink, StaticDictionary, LocalStore>,
    store: LocalStore,
}

impl Service {
    pub fn new(config: &ServiceConfig) -> eyre::Result<Self> {
        let link = Arc::new(TcpLink::new(config.link.to_link_config()));
        let dictionary = Arc::new(StaticDictionary::new());
        let store = LocalStore::new();
        let reporter = Arc::new(FsExceptionSink::new(&config.exception_dir));

        let mut microservice = InterfaceMicroservice::new(
            &config.name,
            config.targets.clone(),
            link,
            dictionary,
            Arc::new(store.clone()),
            reporter,
        )?;
        if let Some(timeout) = config.shutdown_timeout {
            microservice = microservice.with_shutdown_timeout(Duration::from_secs(timeout));
        }

        Ok(Self {
            microservice,
            store,
        })
    }

    /// Starts the worker tasks plus a tail that logs inbound telemetry.
    pub async fn start(&self) -> eyre::Result<JoinHandle<()>> {
        self.microservice.start().await?;

        let store = self.store.clone();
        let scope = self.microservice.scope().to_string();

        Ok(tokio::spawn(tail_telemetry(store, scope)))
    }

    pub async fn cancelled(&self) {
        self.microservice.cancelled().await
    }

    pub async fn shutdown(&self) {
        self.store.close();
        self.microservice.shutdown().await;
    }
}

/// Logs packets landing on the catch-all telemetry topic. With no
/// dictionary definitions loaded, every inbound packet shows up here.
async fn tail_telemetry(store: LocalStore, scope: String) {
    let topic = topics::telemetry_topic(&scope, UNKNOWN, UNKNOWN);
    let entries = store.subscribe(&topic);

    while let Ok(entry) = entries.recv_async().await {
        let size = entry
            .get("buffer")
            .map(|buffer| buffer.as_bytes().len())
            .unwrap_or(0);
        let count = entry
            .get("received_count")
            .and_then(|field| field.as_i64())
            .unwrap_or(0);

        info!(topic = %topic, size, count, "received packet");
    }
}
