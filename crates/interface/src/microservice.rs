use std::sync::Arc;
use std::time::Duration;

use eyre::eyre;
use tokio::select;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use gnd_dictionary::Dictionary;
use gnd_link::Link;
use gnd_store::{topics, Store};

use crate::commands::CmdWorker;
use crate::interface::InterfaceHandle;
use crate::reporter::ExceptionSink;
use crate::supervisor::Supervisor;

/// The limit of time to wait for the workers to finish on shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Wires the supervisor and the command worker for one interface and runs
/// them as tracked tasks.
pub struct InterfaceMicroservice<L, D, S> {
    interface: Arc<InterfaceHandle>,
    supervisor: Arc<Supervisor<L, D, S>>,
    link: Arc<L>,
    dictionary: Arc<D>,
    store: Arc<S>,
    scope: String,
    cancellation: CancellationToken,
    task_tracker: TaskTracker,
    shutdown_timeout: Duration,
}

impl<L, D, S> InterfaceMicroservice<L, D, S>
where
    L: Link + 'static,
    D: Dictionary + 'static,
    S: Store + 'static,
{
    /// Builds the microservice from its instance name, which has the form
    /// `<scope>__<kind>__<interface_name>`.
    pub fn new(
        microservice_name: &str,
        target_names: Vec<String>,
        link: Arc<L>,
        dictionary: Arc<D>,
        store: Arc<S>,
        reporter: Arc<dyn ExceptionSink>,
    ) -> eyre::Result<Self> {
        let (scope, interface_name) = topics::split_microservice_name(microservice_name)
            .ok_or_else(|| eyre!("invalid microservice name: {microservice_name}"))?;

        let interface = Arc::new(InterfaceHandle::new(interface_name, target_names));
        let cancellation = CancellationToken::new();
        let supervisor = Arc::new(Supervisor::new(
            interface.clone(),
            link.clone(),
            dictionary.clone(),
            store.clone(),
            scope,
            cancellation.clone(),
            reporter,
        ));

        Ok(Self {
            interface,
            supervisor,
            link,
            dictionary,
            store,
            scope: scope.to_string(),
            cancellation,
            task_tracker: TaskTracker::new(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        })
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn interface(&self) -> &Arc<InterfaceHandle> {
        &self.interface
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Registers the interface and spawns the two worker tasks.
    pub async fn start(&self) -> eyre::Result<()> {
        self.store
            .set_interface(&self.interface.status(), &self.scope, true)
            .await?;

        let supervisor = self.supervisor.clone();
        self.task_tracker
            .spawn(async move { supervisor.run().await });

        let worker = CmdWorker::new(
            self.supervisor.clone(),
            self.link.clone(),
            self.dictionary.clone(),
            self.store.clone(),
            self.scope.clone(),
        );
        self.task_tracker.spawn(worker.run());

        self.task_tracker.close();

        Ok(())
    }

    /// Resolves when any worker latched cancellation.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// Stops the supervisor and waits for both workers, up to the shutdown
    /// timeout. The embedder must also close the store's command stream so
    /// the command worker can finish.
    pub async fn shutdown(&self) {
        info!(
            interface = self.interface.name(),
            "shutting down interface microservice"
        );

        self.supervisor.stop().await;

        select! {
            _ = self.task_tracker.wait() => {},
            _ = sleep(self.shutdown_timeout) => {
                info!(
                    interface = self.interface.name(),
                    "shutdown timeout reached, exiting"
                );
            },
        }
    }
}
