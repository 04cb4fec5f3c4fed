//! # Event Bus System
//!
//! Provides an event-driven architecture for the reconciliation core using
//! `tokio::sync::broadcast`. Modules publish typed events; hosts and the
//! presentation layer subscribe without coupling to the coordinator.
//!
//! A run publishes [`CoreEvent`]s on an [`EventBus`]. Hosts attach an
//! [`EventStream`], optionally filtered, and render progress from it. The
//! pending set itself travels on a separate watch channel; events only say
//! that something happened.
//!
//! ```text
//! session handoff ──┐
//!                   ├── emit ──> EventBus ── subscribe ──> EventStream (host UI)
//! coordinator ──────┘
//! ```
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, ReconcileEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Reconcile(ReconcileEvent::Converged {
//!     job_id: "job-1".to_string(),
//!     rounds: 3,
//! }))
//! .ok();
//!
//! assert_eq!(rx.recv().await.unwrap().description(), "Pending set converged");
//! # }
//! ```
//!
//! A slow subscriber gets `RecvError::Lagged(n)` and keeps going from the
//! oldest retained event. Emitting with nobody listening is an error that
//! publishers discard with `.ok()`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError, TryRecvError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Session bootstrap events
    Auth(AuthEvent),
    /// Reconciliation lifecycle events
    Reconcile(ReconcileEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Reconcile(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::BootstrapAbandoned { .. }) => EventSeverity::Error,
            CoreEvent::Reconcile(ReconcileEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Reconcile(ReconcileEvent::RelocationFailed { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Auth(AuthEvent::SessionReady { .. }) => EventSeverity::Info,
            CoreEvent::Reconcile(ReconcileEvent::Converged { .. }) => EventSeverity::Info,
            CoreEvent::Reconcile(ReconcileEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Events emitted around the session handoff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// The coordinator is waiting for the bootstrap to deliver a session.
    AwaitingSession,
    /// A session handle was delivered.
    SessionReady {
        /// Expiry of the access token (Unix epoch seconds), if known.
        expires_at: Option<i64>,
    },
    /// The bootstrap side went away without delivering a session.
    BootstrapAbandoned { message: String },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::AwaitingSession => "Waiting for session",
            AuthEvent::SessionReady { .. } => "Session ready",
            AuthEvent::BootstrapAbandoned { .. } => "Session bootstrap abandoned",
        }
    }
}

// ============================================================================
// Reconciliation Events
// ============================================================================

/// Events related to a reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ReconcileEvent {
    /// Run initiated.
    Started { job_id: String },
    /// The coordinator entered a new phase.
    PhaseChanged {
        job_id: String,
        /// Phase name (e.g., "SCANNING", "POLLING").
        phase: String,
    },
    /// A misplaced file was moved into the staging root.
    FileStaged { playlist: String, file_name: String },
    /// A re-sorted file was moved back into the authoritative root.
    FileRestored { playlist: String, file_name: String },
    /// A move failed even after the external application was closed.
    RelocationFailed {
        playlist: String,
        file_name: String,
        message: String,
    },
    /// A polling round finished and the pending set was republished.
    RoundCompleted {
        job_id: String,
        round: u32,
        pending_playlists: u64,
        pending_tracks: u64,
    },
    /// The pending set became empty.
    Converged { job_id: String, rounds: u32 },
    /// Run finished.
    Completed {
        job_id: String,
        files_staged: u64,
        files_restored: u64,
        relocation_failures: u64,
        forced_closes: u64,
        rounds: u32,
        duration_secs: u64,
    },
    /// Run stopped on a fatal error.
    Failed {
        job_id: String,
        message: String,
        /// Phase the run was in when it failed.
        phase: String,
    },
}

impl ReconcileEvent {
    fn description(&self) -> &str {
        match self {
            ReconcileEvent::Started { .. } => "Reconciliation started",
            ReconcileEvent::PhaseChanged { .. } => "Reconciliation phase changed",
            ReconcileEvent::FileStaged { .. } => "File moved to staging",
            ReconcileEvent::FileRestored { .. } => "File restored to library",
            ReconcileEvent::RelocationFailed { .. } => "File relocation failed",
            ReconcileEvent::RoundCompleted { .. } => "Polling round completed",
            ReconcileEvent::Converged { .. } => "Pending set converged",
            ReconcileEvent::Completed { .. } => "Reconciliation completed",
            ReconcileEvent::Failed { .. } => "Reconciliation failed",
        }
    }
}

// ============================================================================
// Bus & Stream
// ============================================================================

/// Broadcast channel shared by every publisher in the core.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` events are retained per subscriber before it lags.
    pub fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    /// Number of subscribers that got the event.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver that skips events rejected by an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let reconcile_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Reconcile(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |keep| keep(event))
    }

    /// Next accepted event.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged` after falling behind, `RecvError::Closed` once
    /// every bus clone is dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Next accepted event already buffered, `None` when drained.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(skipped)) => return Some(Err(RecvError::Lagged(skipped))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.accepts(&event) {
                return Some(Ok(event));
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}
