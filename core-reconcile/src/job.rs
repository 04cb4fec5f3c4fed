//! # Reconcile Job State Machine
//!
//! Tracks the lifecycle of one reconciliation run with validated phase
//! transitions.
//!
//! ## State Machine
//!
//! ```text
//! Init → Scanning → RelocatingInitial → Polling → Finalizing → Done
//!                          │                                    ↑
//!                          └────────────────────────────────────┘
//!
//! Failed is reachable from every non-terminal phase.
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_reconcile::{ReconcileJob, ReconcilePhase};
//!
//! let mut job = ReconcileJob::new();
//! job.advance(ReconcilePhase::Scanning)?;
//! job.advance(ReconcilePhase::RelocatingInitial)?;
//! job.advance(ReconcilePhase::Done)?;
//! ```

use crate::{ReconcileError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReconcileJobId(Uuid);

impl ReconcileJobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

}

impl Default for ReconcileJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReconcileJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Phases
// ============================================================================

/// Phase of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcilePhase {
    /// Waiting for a session, restoring the persisted pending set
    Init,
    /// Indexing the authoritative root and diffing it against the catalog
    Scanning,
    /// Moving misplaced files into staging
    RelocatingInitial,
    /// Re-diffing staging contents on every round until nothing is pending
    Polling,
    /// Moving confirmed files back into the authoritative root
    Finalizing,
    Done,
    Failed,
}

impl ReconcilePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReconcilePhase::Done | ReconcilePhase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcilePhase::Init => "INIT",
            ReconcilePhase::Scanning => "SCANNING",
            ReconcilePhase::RelocatingInitial => "RELOCATING_INITIAL",
            ReconcilePhase::Polling => "POLLING",
            ReconcilePhase::Finalizing => "FINALIZING",
            ReconcilePhase::Done => "DONE",
            ReconcilePhase::Failed => "FAILED",
        }
    }

    /// Whether the state machine allows moving from `self` to `to`
    pub fn can_transition_to(&self, to: ReconcilePhase) -> bool {
        use ReconcilePhase::*;

        match (self, to) {
            (Init, Scanning) => true,
            (Scanning, RelocatingInitial) => true,
            (RelocatingInitial, Polling) => true,
            // Nothing misplaced
            (RelocatingInitial, Done) => true,
            (Polling, Finalizing) => true,
            (Finalizing, Done) => true,

            (Done, _) | (Failed, _) => false,
            (_, Failed) => true,

            _ => false,
        }
    }
}

impl std::fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Counters for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Files moved from the authoritative root into staging
    pub files_staged: u64,
    /// Files moved from staging back into the authoritative root
    pub files_restored: u64,
    /// Moves that failed even after the external application was closed
    pub relocation_failures: u64,
    /// Times the external application had to be closed
    pub forced_closes: u64,
    /// Polling rounds executed
    pub rounds: u32,
}

// ============================================================================
// Job
// ============================================================================

/// One reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileJob {
    pub id: ReconcileJobId,
    pub phase: ReconcilePhase,
    pub stats: ReconcileStats,
    /// Unix timestamp (seconds)
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub error_message: Option<String>,
    /// Phase the run was in when it failed
    pub failed_in: Option<ReconcilePhase>,
}

impl ReconcileJob {
    pub fn new() -> Self {
        Self {
            id: ReconcileJobId::new(),
            phase: ReconcilePhase::Init,
            stats: ReconcileStats::default(),
            started_at: current_timestamp(),
            completed_at: None,
            error_message: None,
            failed_in: None,
        }
    }

    /// Move to the next phase
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidPhaseTransition`] if the move is not
    /// allowed from the current phase.
    pub fn advance(&mut self, to: ReconcilePhase) -> Result<()> {
        self.validate_transition(to)?;
        self.phase = to;
        if to.is_terminal() {
            self.completed_at = Some(current_timestamp());
        }
        Ok(())
    }

    /// Mark the run as failed, remembering where it stopped
    ///
    /// # Errors
    ///
    /// Returns an error if the run already reached a terminal phase
    pub fn fail(&mut self, error_message: impl Into<String>) -> Result<()> {
        let failed_in = self.phase;
        self.advance(ReconcilePhase::Failed)?;
        self.failed_in = Some(failed_in);
        self.error_message = Some(error_message.into());
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Duration of the run in seconds, once it finished
    pub fn duration_secs(&self) -> Option<u64> {
        self.completed_at
            .map(|end| end.saturating_sub(self.started_at).max(0) as u64)
    }

    fn validate_transition(&self, to: ReconcilePhase) -> Result<()> {
        if self.phase.can_transition_to(to) {
            return Ok(());
        }

        Err(ReconcileError::InvalidPhaseTransition {
            from: self.phase.as_str().to_string(),
            to: to.as_str().to_string(),
            reason: format!(
                "Cannot transition from {} to {}",
                self.phase.as_str(),
                to.as_str()
            ),
        })
    }
}

impl Default for ReconcileJob {
    fn default() -> Self {
        Self::new()
    }
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============================================================================
// Tests
// ============================================================================
