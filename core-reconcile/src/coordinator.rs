//! # Reconcile Coordinator
//!
//! Drives one reconciliation run from session handoff to convergence.
//!
//! ## Workflow
//!
//! 1. **Init**: wait for the session, make sure both roots exist, republish
//!    the pending set left by a previous run as round 0
//! 2. **Scanning**: index the authoritative root, fetch the remote playlists,
//!    create folders for remote-only playlists and diff every playlist
//! 3. **RelocatingInitial**: move every unresolved record into staging,
//!    persist and publish the pending set (staging contents plus records
//!    that could not be moved)
//! 4. **Polling**: every `poll_interval`, rescan staging and diff it against
//!    the current remote playlists. Confirmed records are queued and leave the
//!    pending set. Stops once nothing is pending
//! 5. **Finalizing**: move the queued records back into the authoritative
//!    root and relaunch the external application if it had to be closed
//!
//! Per-record and per-playlist failures are logged and counted. A rejected
//! session, a failed initial playlist listing or an abandoned bootstrap end
//! the run in `Failed`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_reconcile::ReconcileCoordinator;
//! use core_runtime::events::EventBus;
//!
//! let coordinator = ReconcileCoordinator::new(config, EventBus::default());
//! let mut pending = coordinator.publisher().subscribe();
//!
//! let stats = coordinator.run(session_receiver).await?;
//! println!("restored {} files", stats.files_restored);
//! ```

use bridge_traits::RemotePlaylist;
use core_auth::{AuthError, SessionHandle, SessionReceiver};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, ReconcileEvent};
use core_runtime::ReconcileConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, error, info, instrument, warn};

use crate::differ::diff;
use crate::job::{ReconcileJob, ReconcilePhase, ReconcileStats};
use crate::model::{record_count, LibraryIndex, TrackRecord};
use crate::pending::PendingSet;
use crate::publisher::PendingSetPublisher;
use crate::relocator::{FileRelocator, RelocationOutcome};
use crate::scanner::LibraryScanner;
use crate::{ReconcileError, Result};

/// A confirmed record waiting to be moved back into the authoritative root
#[derive(Debug, Clone)]
struct QueuedMove {
    playlist: String,
    record: TrackRecord,
}

/// Mutable state of one run
struct RunState {
    session: SessionHandle,
    /// Last successfully fetched playlist listing
    playlists: Vec<RemotePlaylist>,
    /// Unresolved records still sitting in the authoritative root
    unstaged: LibraryIndex,
    /// Confirmed moves keyed by source path
    queued: BTreeMap<PathBuf, QueuedMove>,
    stats: ReconcileStats,
}

/// What happened to one playlist during a polling round
enum PlaylistRound {
    Diffed,
    /// Remote tracks unavailable this round; entries kept as they are
    Skipped,
}

pub struct ReconcileCoordinator {
    config: ReconcileConfig,
    scanner: LibraryScanner,
    relocator: FileRelocator,
    publisher: PendingSetPublisher,
    event_bus: EventBus,
}

impl ReconcileCoordinator {
    pub fn new(config: ReconcileConfig, event_bus: EventBus) -> Self {
        let scanner = LibraryScanner::new(&config);
        let relocator = FileRelocator::new(
            config.file_system.clone(),
            config.tag_reader.clone(),
            config.lock_breaker.clone(),
        );

        Self {
            config,
            scanner,
            relocator,
            publisher: PendingSetPublisher::new(),
            event_bus,
        }
    }

    /// Slot the pending set is published to after every round
    pub fn publisher(&self) -> PendingSetPublisher {
        self.publisher.clone()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Run until the pending set converges or a fatal error occurs.
    #[instrument(skip(self, session))]
    pub async fn run(&self, session: SessionReceiver) -> Result<ReconcileStats> {
        let mut job = ReconcileJob::new();
        let job_id = job.id.to_string();
        info!(job_id = %job_id, "Starting reconciliation");
        self.emit(ReconcileEvent::Started {
            job_id: job_id.clone(),
        });

        match self.execute(&mut job, session).await {
            Ok(stats) => {
                let duration_secs = job.duration_secs().unwrap_or(0);
                info!(
                    job_id = %job_id,
                    staged = stats.files_staged,
                    restored = stats.files_restored,
                    failures = stats.relocation_failures,
                    rounds = stats.rounds,
                    "Reconciliation completed in {}s",
                    duration_secs
                );
                self.emit(ReconcileEvent::Completed {
                    job_id,
                    files_staged: stats.files_staged,
                    files_restored: stats.files_restored,
                    relocation_failures: stats.relocation_failures,
                    forced_closes: stats.forced_closes,
                    rounds: stats.rounds,
                    duration_secs,
                });
                Ok(stats)
            }
            Err(e) => {
                error!(job_id = %job_id, phase = %job.phase, error = %e, "Reconciliation failed");
                if let Err(transition) = job.fail(e.to_string()) {
                    warn!(error = %transition, "Could not mark job as failed");
                }
                self.emit(ReconcileEvent::Failed {
                    job_id,
                    message: e.to_string(),
                    phase: job.failed_in.unwrap_or(job.phase).to_string(),
                });
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        job: &mut ReconcileJob,
        session: SessionReceiver,
    ) -> Result<ReconcileStats> {
        let session = self.init(session).await?;

        self.enter(job, ReconcilePhase::Scanning)?;
        let (playlists, misplaced) = self.scan(&session).await?;

        let mut state = RunState {
            session,
            playlists,
            unstaged: LibraryIndex::new(),
            queued: BTreeMap::new(),
            stats: ReconcileStats::default(),
        };

        self.enter(job, ReconcilePhase::RelocatingInitial)?;
        let pending = self.relocate_initial(&mut state, misplaced).await?;
        self.persist_and_publish(0, &pending).await;

        if pending.is_empty() {
            info!("Nothing to reconcile");
            self.relaunch_if_needed(&mut state).await;
            self.emit(ReconcileEvent::Converged {
                job_id: job.id.to_string(),
                rounds: 0,
            });
            self.enter(job, ReconcilePhase::Done)?;
            job.stats = state.stats;
            return Ok(state.stats);
        }

        self.enter(job, ReconcilePhase::Polling)?;
        self.poll_until_converged(job, &mut state).await?;

        self.enter(job, ReconcilePhase::Finalizing)?;
        self.finalize(&mut state).await;

        self.enter(job, ReconcilePhase::Done)?;
        job.stats = state.stats;
        Ok(state.stats)
    }

    // ========================================================================
    // Init
    // ========================================================================

    #[instrument(skip(self, receiver))]
    async fn init(&self, receiver: SessionReceiver) -> Result<SessionHandle> {
        info!("Phase: waiting for session");
        self.event_bus
            .emit(CoreEvent::Auth(AuthEvent::AwaitingSession))
            .ok();

        let session = match receiver.await_session().await {
            Ok(session) => session,
            Err(e) => {
                self.event_bus
                    .emit(CoreEvent::Auth(AuthEvent::BootstrapAbandoned {
                        message: e.to_string(),
                    }))
                    .ok();
                return Err(e.into());
            }
        };

        session.ensure_valid().map_err(|e| match e {
            AuthError::SessionExpired(at) => ReconcileError::SessionExpired(at),
            other => ReconcileError::Auth(other),
        })?;

        self.event_bus
            .emit(CoreEvent::Auth(AuthEvent::SessionReady {
                expires_at: session.expires_at().map(|at| at.timestamp()),
            }))
            .ok();

        for root in [&self.config.authoritative_root, &self.config.staging_root] {
            self.config
                .file_system
                .create_dir_all(root)
                .await
                .map_err(|e| ReconcileError::Structural {
                    path: root.display().to_string(),
                    message: e.to_string(),
                })?;
        }

        let path = self.config.pending_set_path();
        match PendingSet::load(self.config.file_system.as_ref(), &path).await {
            Ok(Some(previous)) => {
                info!(
                    playlists = previous.playlist_count(),
                    tracks = previous.track_count(),
                    "Restored pending set from previous run"
                );
                self.publisher.publish(0, previous);
            }
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Ignoring unreadable pending set"),
        }

        Ok(session)
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    /// Returns the remote playlists and the unresolved local records per playlist.
    #[instrument(skip(self, session))]
    async fn scan(&self, session: &SessionHandle) -> Result<(Vec<RemotePlaylist>, LibraryIndex)> {
        let local = self.scanner.scan_authoritative().await?;
        info!(
            playlists = local.len(),
            tracks = record_count(&local),
            "Indexed authoritative library"
        );

        let playlists = self
            .config
            .catalog
            .fetch_playlists(session.access_token())
            .await
            .map_err(ReconcileError::from_catalog)?;
        info!(playlists = playlists.len(), "Fetched remote playlists");

        let mut misplaced = LibraryIndex::new();

        for playlist in &playlists {
            if local.contains_key(&playlist.name) {
                continue;
            }
            let folder = self.config.authoritative_root.join(&playlist.name);
            match self.config.file_system.create_dir_all(&folder).await {
                Ok(()) => info!(playlist = %playlist.name, "Created folder for remote playlist"),
                Err(e) => warn!(
                    playlist = %playlist.name,
                    error = %e,
                    "Could not create folder for remote playlist"
                ),
            }
        }

        for (name, records) in &local {
            let Some(playlist) = find_playlist(&playlists, name) else {
                debug!(playlist = %name, "No remote playlist, leaving folder alone");
                continue;
            };

            let Some(remote) = self.fetch_remote(session, playlist).await? else {
                continue;
            };

            let outcome = diff(records, &remote);
            debug!(
                playlist = %name,
                confirmed = outcome.confirmed.len(),
                unresolved = outcome.unresolved.len(),
                "Playlist diffed"
            );
            if !outcome.unresolved.is_empty() {
                misplaced.insert(name.clone(), outcome.unresolved);
            }
        }

        Ok((playlists, misplaced))
    }

    /// Remote records of `playlist`. `Ok(None)` means the playlist is skipped
    /// this time; a rejected session is fatal.
    async fn fetch_remote(
        &self,
        session: &SessionHandle,
        playlist: &RemotePlaylist,
    ) -> Result<Option<Vec<TrackRecord>>> {
        match self
            .config
            .catalog
            .fetch_playlist_tracks(session.access_token(), &playlist.id, self.config.page_size)
            .await
        {
            Ok(tracks) => Ok(Some(
                tracks
                    .into_iter()
                    .filter_map(|track| TrackRecord::from_remote(track, &playlist.name))
                    .collect(),
            )),
            Err(e) if e.is_session_invalid() => Err(ReconcileError::from_catalog(e)),
            Err(e) => {
                warn!(playlist = %playlist.name, error = %e, "Skipping playlist, tracks unavailable");
                Ok(None)
            }
        }
    }

    // ========================================================================
    // Initial relocation
    // ========================================================================

    #[instrument(skip(self, state, misplaced), fields(tracks = record_count(&misplaced)))]
    async fn relocate_initial(
        &self,
        state: &mut RunState,
        misplaced: LibraryIndex,
    ) -> Result<PendingSet> {
        for (playlist, records) in misplaced {
            let mut records = records.into_iter();
            while let Some(record) = records.next() {
                match self.stage(state, &playlist, &record).await {
                    Ok(_) => {}
                    Err(ReconcileError::Structural { path, message }) => {
                        warn!(
                            playlist = %playlist,
                            path = %path,
                            error = %message,
                            "Cannot prepare staging folder, leaving playlist in place"
                        );
                        let unstaged = state.unstaged.entry(playlist.clone()).or_default();
                        unstaged.push(record);
                        unstaged.extend(records.by_ref());
                    }
                    Err(_) => state.unstaged.entry(playlist.clone()).or_default().push(record),
                }
            }
        }

        let staged = self.scanner.scan_staging().await?;
        let mut pending = PendingSet::from_index(&staged);
        for (playlist, records) in &state.unstaged {
            pending.extend(playlist, records);
        }

        info!(
            playlists = pending.playlist_count(),
            tracks = pending.track_count(),
            unstaged = record_count(&state.unstaged),
            "Initial relocation finished"
        );
        Ok(pending)
    }

    /// Move one record authoritative → staging, counting and reporting the result.
    async fn stage(
        &self,
        state: &mut RunState,
        playlist: &str,
        record: &TrackRecord,
    ) -> Result<RelocationOutcome> {
        let result = self
            .relocator
            .relocate(
                record,
                &self.config.authoritative_root,
                &self.config.staging_root,
                playlist,
            )
            .await;

        match &result {
            Ok(outcome) if outcome.moved() => {
                state.stats.files_staged += 1;
                info!(playlist, file = %record.file_name, "Staged misplaced track");
                self.emit(ReconcileEvent::FileStaged {
                    playlist: playlist.to_string(),
                    file_name: record.file_name.clone(),
                });
            }
            Ok(_) => {}
            Err(ReconcileError::Structural { .. }) => {}
            Err(e) => self.record_failure(state, playlist, record, e),
        }
        result
    }

    // ========================================================================
    // Polling
    // ========================================================================

    async fn poll_until_converged(&self, job: &ReconcileJob, state: &mut RunState) -> Result<()> {
        let mut round = 0u32;

        loop {
            tokio::time::sleep(self.config.poll_interval).await;
            round += 1;

            let pending = self.poll_round(state, round).await?;
            state.stats.rounds = round;
            self.persist_and_publish(round, &pending).await;

            self.emit(ReconcileEvent::RoundCompleted {
                job_id: job.id.to_string(),
                round,
                pending_playlists: pending.playlist_count() as u64,
                pending_tracks: pending.track_count() as u64,
            });

            if pending.is_empty() {
                info!(rounds = round, queued = state.queued.len(), "Pending set converged");
                self.emit(ReconcileEvent::Converged {
                    job_id: job.id.to_string(),
                    rounds: round,
                });
                return Ok(());
            }
        }
    }

    #[instrument(skip(self, state))]
    async fn poll_round(&self, state: &mut RunState, round: u32) -> Result<PendingSet> {
        match self
            .config
            .catalog
            .fetch_playlists(state.session.access_token())
            .await
        {
            Ok(playlists) => state.playlists = playlists,
            Err(e) if e.is_session_invalid() => return Err(ReconcileError::from_catalog(e)),
            Err(e) => warn!(error = %e, "Playlist refresh failed, using previous listing"),
        }

        let mut staged = self.scanner.scan_staging().await?;
        for records in staged.values_mut() {
            records.retain(|record| {
                let source = record.path_under(&self.config.staging_root, &record.playlist_name);
                !state.queued.contains_key(&source)
            });
        }
        staged.retain(|_, records| !records.is_empty());

        let names: BTreeSet<String> = staged
            .keys()
            .chain(state.unstaged.keys())
            .cloned()
            .collect();

        let mut pending = PendingSet::new();
        for name in names {
            let staged_records = staged.remove(&name).unwrap_or_default();
            let outcome = self
                .poll_playlist(state, &name, &staged_records, &mut pending)
                .await?;
            if let PlaylistRound::Skipped = outcome {
                pending.extend(&name, &staged_records);
                if let Some(unstaged) = state.unstaged.get(&name) {
                    pending.extend(&name, unstaged);
                }
            }
        }

        debug!(
            round,
            playlists = pending.playlist_count(),
            tracks = pending.track_count(),
            "Round finished"
        );
        Ok(pending)
    }

    async fn poll_playlist(
        &self,
        state: &mut RunState,
        name: &str,
        staged: &[TrackRecord],
        pending: &mut PendingSet,
    ) -> Result<PlaylistRound> {
        let remote = match find_playlist(&state.playlists, name).cloned() {
            Some(playlist) => match self.fetch_remote(&state.session, &playlist).await? {
                Some(remote) => remote,
                None => return Ok(PlaylistRound::Skipped),
            },
            // Nothing can confirm records of a playlist the catalog does not know
            None => Vec::new(),
        };

        let outcome = diff(staged, &remote);
        for record in outcome.confirmed {
            let source = record.path_under(&self.config.staging_root, name);
            info!(playlist = name, file = %record.file_name, "Track confirmed");
            state.queued.entry(source).or_insert(QueuedMove {
                playlist: name.to_string(),
                record,
            });
        }
        pending.extend(name, &outcome.unresolved);

        let Some(unstaged) = state.unstaged.remove(name) else {
            return Ok(PlaylistRound::Diffed);
        };

        let outcome = diff(&unstaged, &remote);
        for record in &outcome.confirmed {
            debug!(playlist = name, file = %record.file_name, "Unstaged track now listed remotely");
        }

        let mut still_unstaged = Vec::new();
        for record in outcome.unresolved {
            let source = record.path_under(&self.config.authoritative_root, name);
            if !self.config.file_system.exists(&source).await? {
                debug!(playlist = name, file = %record.file_name, "Unstaged track is gone");
                continue;
            }

            match self.stage(state, name, &record).await {
                Ok(RelocationOutcome::AlreadyPresent) => {}
                Ok(_) => pending.extend(name, std::iter::once(&record)),
                Err(_) => {
                    pending.extend(name, std::iter::once(&record));
                    still_unstaged.push(record);
                }
            }
        }
        if !still_unstaged.is_empty() {
            state.unstaged.insert(name.to_string(), still_unstaged);
        }

        Ok(PlaylistRound::Diffed)
    }

    // ========================================================================
    // Finalizing
    // ========================================================================

    #[instrument(skip(self, state), fields(queued = state.queued.len()))]
    async fn finalize(&self, state: &mut RunState) {
        let queued = std::mem::take(&mut state.queued);

        for (_, queued) in queued {
            let QueuedMove { playlist, record } = queued;
            let result = self
                .relocator
                .relocate(
                    &record,
                    &self.config.staging_root,
                    &self.config.authoritative_root,
                    &playlist,
                )
                .await;

            match result {
                Ok(outcome) if outcome.moved() => {
                    state.stats.files_restored += 1;
                    info!(playlist = %playlist, file = %record.file_name, "Restored track");
                    self.emit(ReconcileEvent::FileRestored {
                        playlist: playlist.clone(),
                        file_name: record.file_name.clone(),
                    });
                }
                Ok(_) => debug!(playlist = %playlist, file = %record.file_name, "Already restored"),
                Err(e) => self.record_failure(state, &playlist, &record, &e),
            }
        }

        self.relaunch_if_needed(state).await;
    }

    async fn relaunch_if_needed(&self, state: &mut RunState) {
        state.stats.forced_closes = self.relocator.forced_closes();
        if state.stats.forced_closes == 0 {
            return;
        }

        let Some(executable) = self.config.relaunch_executable.as_deref() else {
            warn!("External application was closed but no executable is configured, skipping relaunch");
            return;
        };

        match self.config.lock_breaker.relaunch(executable).await {
            Ok(()) => info!(executable = %executable.display(), "Relaunched external application"),
            Err(e) => warn!(
                executable = %executable.display(),
                error = %e,
                "Could not relaunch external application"
            ),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn enter(&self, job: &mut ReconcileJob, phase: ReconcilePhase) -> Result<()> {
        job.advance(phase)?;
        info!("Phase: {}", phase);
        self.emit(ReconcileEvent::PhaseChanged {
            job_id: job.id.to_string(),
            phase: phase.to_string(),
        });
        Ok(())
    }

    async fn persist_and_publish(&self, round: u32, pending: &PendingSet) {
        let path = self.config.pending_set_path();
        if let Err(e) = pending
            .save(self.config.file_system.as_ref(), &path)
            .await
        {
            warn!(path = %path.display(), error = %e, "Failed to persist pending set");
        }
        self.publisher.publish(round, pending.clone());
    }

    fn record_failure(
        &self,
        state: &mut RunState,
        playlist: &str,
        record: &TrackRecord,
        error: &ReconcileError,
    ) {
        state.stats.relocation_failures += 1;
        warn!(playlist, file = %record.file_name, error = %error, "Relocation failed");
        self.emit(ReconcileEvent::RelocationFailed {
            playlist: playlist.to_string(),
            file_name: record.file_name.clone(),
            message: error.to_string(),
        });
    }

    fn emit(&self, event: ReconcileEvent) {
        self.event_bus.emit(CoreEvent::Reconcile(event)).ok();
    }
}

fn find_playlist<'a>(playlists: &'a [RemotePlaylist], name: &str) -> Option<&'a RemotePlaylist> {
    playlists.iter().find(|playlist| playlist.name == name)
}
