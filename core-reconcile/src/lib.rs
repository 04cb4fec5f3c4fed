//! # Reconciliation Module
//!
//! Keeps a local audio library consistent with the playlists of a remote
//! catalog.
//!
//! ## Overview
//!
//! Every subfolder of the authoritative root is a playlist. Files the remote
//! catalog does not list under their folder are moved into a staging root,
//! where the user re-sorts them. Once the catalog lists a staged file under
//! the folder it now sits in, the file is moved back into the authoritative
//! root. The run ends when nothing is left in staging.
//!
//! ## Components
//!
//! - **Matcher** (`matcher`): Fuzzy title/artist/album comparison
//! - **Differ** (`differ`): Greedy multiset diff of local files against a playlist
//! - **Scanner** (`scanner`): Builds playlist indexes from disk
//! - **Relocator** (`relocator`): Moves files between roots with lock recovery
//! - **Pending Set** (`pending`, `publisher`): Persisted and published work list
//! - **Job State Machine** (`job`): Validated phase transitions of a run
//! - **Coordinator** (`coordinator`): Drives a run from session to convergence

pub mod coordinator;
pub mod differ;
pub mod error;
pub mod job;
pub mod matcher;
pub mod model;
pub mod pending;
pub mod publisher;
pub mod relocator;
pub mod scanner;

pub use coordinator::ReconcileCoordinator;
pub use differ::{diff, DiffOutcome};
pub use error::{ReconcileError, Result};
pub use job::{ReconcileJob, ReconcileJobId, ReconcilePhase, ReconcileStats};
pub use matcher::{records_match, similar, similarity, SIMILARITY_THRESHOLD};
pub use model::{LibraryIndex, TrackRecord};
pub use pending::{PendingSet, PendingTrack};
pub use publisher::{PendingSetPublisher, PendingSnapshot};
pub use relocator::{FileRelocator, RelocationOutcome};
pub use scanner::LibraryScanner;
