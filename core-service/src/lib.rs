//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (remote catalog,
//! filesystem, tag reader, lock breaker) into the reconciliation core and
//! exposes the two presentation endpoints: the latest pending set and the
//! event stream. Desktop apps typically enable the `desktop-shims` feature
//! (which depends on `bridge-desktop`) and start from
//! [`desktop_config`].
//!
//! ```ignore
//! use core_service::{desktop_config, CoreService, SessionHandle};
//!
//! let config = desktop_config("/music")
//!     .catalog(catalog)
//!     .external_app_image("Spotify.exe")
//!     .build()?;
//! let service = CoreService::new(config);
//!
//! let (bootstrap, run) = service.start();
//! bootstrap.deliver(SessionHandle::new(token))?;
//! let stats = service.join(run).await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_auth::{SessionHandle, SessionHandoff, SessionReceiver, SessionSender};
pub use core_reconcile::{
    PendingSet, PendingSetPublisher, PendingSnapshot, ReconcileCoordinator, ReconcileStats,
};
pub use core_runtime::events::{CoreEvent, EventBus, EventStream};
pub use core_runtime::{ReconcileConfig, ReconcileConfigBuilder};

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    coordinator: Arc<ReconcileCoordinator>,
    event_bus: EventBus,
}

impl CoreService {
    /// Create a new service with its own event bus.
    pub fn new(config: ReconcileConfig) -> Self {
        Self::with_event_bus(config, EventBus::default())
    }

    pub fn with_event_bus(config: ReconcileConfig, event_bus: EventBus) -> Self {
        Self {
            coordinator: Arc::new(ReconcileCoordinator::new(config, event_bus.clone())),
            event_bus,
        }
    }

    /// Spawn the coordinator and return the bootstrap side of the session
    /// handoff together with the task handle.
    pub fn start(&self) -> (SessionSender, JoinHandle<core_reconcile::Result<ReconcileStats>>) {
        let (sender, receiver) = SessionHandoff::channel();
        let coordinator = Arc::clone(&self.coordinator);
        let handle = tokio::spawn(async move { coordinator.run(receiver).await });
        info!("Reconciliation task started");
        (sender, handle)
    }

    /// Wait for a task returned by [`start`](Self::start).
    pub async fn join(
        &self,
        handle: JoinHandle<core_reconcile::Result<ReconcileStats>>,
    ) -> Result<ReconcileStats> {
        let result = handle
            .await
            .map_err(|e| CoreError::TaskFailed(e.to_string()))?;
        Ok(result?)
    }

    /// Run the coordinator on the current task.
    pub async fn run(&self, session: SessionReceiver) -> Result<ReconcileStats> {
        Ok(self.coordinator.run(session).await?)
    }

    /// Current pending set snapshot
    pub fn pending_set(&self) -> PendingSnapshot {
        self.coordinator.publisher().latest()
    }

    /// Receiver notified whenever a new pending set is published
    pub fn watch_pending_set(&self) -> watch::Receiver<PendingSnapshot> {
        self.coordinator.publisher().subscribe()
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}

/// Builder preloaded for desktop hosts: both roots under `library_base`
/// and tags read with [`LoftyTagReader`](core_metadata::LoftyTagReader).
/// The filesystem, lock breaker and config directory fall back to the
/// `bridge-desktop` defaults.
#[cfg(feature = "desktop-shims")]
pub fn desktop_config(library_base: impl AsRef<std::path::Path>) -> ReconcileConfigBuilder {
    ReconcileConfig::builder()
        .library_base(library_base)
        .tag_reader(Arc::new(core_metadata::LoftyTagReader::new()))
}
