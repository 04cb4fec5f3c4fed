//! File relocation: plain moves, idempotence and lock recovery

mod common;

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{BridgeError, LockBreaker};
use common::{FakeTagReader, LockedFileSystem, Scratch};
use core_reconcile::{FileRelocator, ReconcileError, RelocationOutcome, TrackRecord};
use mockall::mock;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

mock! {
    pub Breaker {}

    #[async_trait]
    impl LockBreaker for Breaker {
        async fn force_close(&self) -> BridgeResult<bool>;
        async fn relaunch(&self, executable: &Path) -> BridgeResult<()>;
    }
}

fn ocean() -> TrackRecord {
    TrackRecord::new("Ocean", "X", "Y")
        .with_playlist("Chill")
        .with_file_name("a.mp3")
}

fn tags() -> Arc<FakeTagReader> {
    Arc::new(FakeTagReader::default().with("a.mp3", "Ocean", "X", "Y"))
}

// ============================================================================
// Plain moves
// ============================================================================

#[tokio::test]
async fn test_relocate_moves_file_and_creates_folder() {
    let scratch = Scratch::new();
    scratch.put(&scratch.library(), "Chill", "a.mp3");

    let mut breaker = MockBreaker::new();
    breaker.expect_force_close().never();

    let relocator = FileRelocator::new(
        Arc::new(TokioFileSystem::new()),
        tags(),
        Arc::new(breaker),
    );

    let outcome = relocator
        .relocate(&ocean(), &scratch.library(), &scratch.staging(), "Chill")
        .await
        .unwrap();

    assert_eq!(outcome, RelocationOutcome::Moved);
    assert!(!scratch.library().join("Chill/a.mp3").exists());
    assert!(scratch.staging().join("Chill/a.mp3").exists());
    assert_eq!(relocator.forced_closes(), 0);
}

#[tokio::test]
async fn test_relocate_twice_is_noop() {
    let scratch = Scratch::new();
    scratch.put(&scratch.library(), "Chill", "a.mp3");

    let mut breaker = MockBreaker::new();
    breaker.expect_force_close().never();

    let relocator = FileRelocator::new(
        Arc::new(TokioFileSystem::new()),
        tags(),
        Arc::new(breaker),
    );

    let first = relocator
        .relocate(&ocean(), &scratch.library(), &scratch.staging(), "Chill")
        .await
        .unwrap();
    let second = relocator
        .relocate(&ocean(), &scratch.library(), &scratch.staging(), "Chill")
        .await
        .unwrap();

    assert_eq!(first, RelocationOutcome::Moved);
    assert_eq!(second, RelocationOutcome::AlreadyPresent);
    assert!(scratch.staging().join("Chill/a.mp3").exists());
}

#[tokio::test]
async fn test_existing_destination_is_not_overwritten() {
    let scratch = Scratch::new();
    scratch.put(&scratch.library(), "Chill", "a.mp3");
    let dest = scratch.put(&scratch.staging(), "Chill", "a.mp3");
    std::fs::write(&dest, b"older copy").unwrap();

    let relocator = FileRelocator::new(
        Arc::new(TokioFileSystem::new()),
        tags(),
        Arc::new(MockBreaker::new()),
    );

    let outcome = relocator
        .relocate(&ocean(), &scratch.library(), &scratch.staging(), "Chill")
        .await
        .unwrap();

    assert_eq!(outcome, RelocationOutcome::AlreadyPresent);
    assert_eq!(std::fs::read(&dest).unwrap(), b"older copy");
    assert!(scratch.library().join("Chill/a.mp3").exists());
}

#[tokio::test]
async fn test_different_track_at_destination_fails_when_staging() {
    let scratch = Scratch::new();
    scratch.put(&scratch.library(), "Chill", "a.mp3");
    let dest = scratch.put(&scratch.staging(), "Chill", "a.mp3");
    std::fs::write(&dest, b"someone else").unwrap();
    let tags = Arc::new(
        FakeTagReader::default()
            .with("a.mp3", "Ocean", "X", "Y")
            .with_path(&dest, "Other", "Z", "W"),
    );

    let mut breaker = MockBreaker::new();
    breaker.expect_force_close().never();
    let relocator = FileRelocator::new(Arc::new(TokioFileSystem::new()), tags, Arc::new(breaker));

    let result = relocator
        .relocate(&ocean(), &scratch.library(), &scratch.staging(), "Chill")
        .await;

    assert!(matches!(
        result,
        Err(ReconcileError::RelocationFailed { ref message, .. }) if message.contains("different track")
    ));
    assert_eq!(std::fs::read(&dest).unwrap(), b"someone else");
    assert!(scratch.library().join("Chill/a.mp3").exists());
}

#[tokio::test]
async fn test_different_track_at_destination_fails_when_restoring() {
    let scratch = Scratch::new();
    scratch.put(&scratch.staging(), "Chill", "a.mp3");
    let dest = scratch.put(&scratch.library(), "Chill", "a.mp3");
    let tags = Arc::new(
        FakeTagReader::default()
            .with("a.mp3", "Ocean", "X", "Y")
            .with_path(&dest, "Other", "Z", "W"),
    );

    let relocator = FileRelocator::new(
        Arc::new(TokioFileSystem::new()),
        tags,
        Arc::new(MockBreaker::new()),
    );

    let result = relocator
        .relocate(&ocean(), &scratch.staging(), &scratch.library(), "Chill")
        .await;

    assert!(matches!(result, Err(ReconcileError::RelocationFailed { .. })));
    assert!(scratch.staging().join("Chill/a.mp3").exists());
}

#[tokio::test]
async fn test_renamed_copy_at_destination_counts_as_present() {
    let scratch = Scratch::new();
    // The record's own file is gone; a file with the same identity sits in staging
    scratch.put(&scratch.staging(), "Chill", "ocean-renamed.mp3");
    let tags = Arc::new(
        FakeTagReader::default().with("ocean-renamed.mp3", "ocean", "x", "y"),
    );

    let relocator = FileRelocator::new(
        Arc::new(TokioFileSystem::new()),
        tags,
        Arc::new(MockBreaker::new()),
    );

    let outcome = relocator
        .relocate(&ocean(), &scratch.library(), &scratch.staging(), "Chill")
        .await
        .unwrap();
    assert_eq!(outcome, RelocationOutcome::AlreadyPresent);
}

#[tokio::test]
async fn test_missing_source_fails_without_force_close() {
    let scratch = Scratch::new();

    let mut breaker = MockBreaker::new();
    breaker.expect_force_close().never();

    let relocator = FileRelocator::new(
        Arc::new(TokioFileSystem::new()),
        tags(),
        Arc::new(breaker),
    );

    let result = relocator
        .relocate(&ocean(), &scratch.library(), &scratch.staging(), "Chill")
        .await;
    assert!(matches!(
        result,
        Err(ReconcileError::RelocationFailed { ref playlist, ref file_name, .. })
            if playlist == "Chill" && file_name == "a.mp3"
    ));
}

#[tokio::test]
async fn test_destination_folder_failure_is_structural() {
    let scratch = Scratch::new();
    scratch.put(&scratch.library(), "Chill", "a.mp3");
    // A plain file where the staging root should be
    std::fs::write(scratch.staging(), b"in the way").unwrap();

    let relocator = FileRelocator::new(
        Arc::new(TokioFileSystem::new()),
        tags(),
        Arc::new(MockBreaker::new()),
    );

    let result = relocator
        .relocate(&ocean(), &scratch.library(), &scratch.staging(), "Chill")
        .await;
    assert!(matches!(result, Err(ReconcileError::Structural { .. })));
    assert!(scratch.library().join("Chill/a.mp3").exists());
}

// ============================================================================
// Lock recovery
// ============================================================================

#[tokio::test]
async fn test_locked_file_is_released_and_retried_once() {
    let scratch = Scratch::new();
    scratch.put(&scratch.library(), "Chill", "a.mp3");

    let mut breaker = MockBreaker::new();
    breaker.expect_force_close().times(1).returning(|| Ok(true));
    breaker.expect_relaunch().never();

    let fs = Arc::new(LockedFileSystem::new(1));
    let relocator = FileRelocator::new(fs.clone(), tags(), Arc::new(breaker));

    let outcome = relocator
        .relocate(&ocean(), &scratch.library(), &scratch.staging(), "Chill")
        .await
        .unwrap();

    assert_eq!(outcome, RelocationOutcome::MovedAfterForceClose);
    assert_eq!(fs.renames.load(Ordering::SeqCst), 2);
    assert_eq!(relocator.forced_closes(), 1);
    assert!(scratch.staging().join("Chill/a.mp3").exists());
}

#[tokio::test]
async fn test_second_failure_is_reported() {
    let scratch = Scratch::new();
    scratch.put(&scratch.library(), "Chill", "a.mp3");

    let mut breaker = MockBreaker::new();
    breaker.expect_force_close().times(1).returning(|| Ok(true));

    let fs = Arc::new(LockedFileSystem::new(u32::MAX));
    let relocator = FileRelocator::new(fs.clone(), tags(), Arc::new(breaker));

    let result = relocator
        .relocate(&ocean(), &scratch.library(), &scratch.staging(), "Chill")
        .await;

    assert!(matches!(result, Err(ReconcileError::RelocationFailed { .. })));
    assert_eq!(fs.renames.load(Ordering::SeqCst), 2);
    assert!(scratch.library().join("Chill/a.mp3").exists());
}

#[tokio::test]
async fn test_force_close_error_still_retries() {
    let scratch = Scratch::new();
    scratch.put(&scratch.library(), "Chill", "a.mp3");

    let mut breaker = MockBreaker::new();
    breaker
        .expect_force_close()
        .times(1)
        .returning(|| Err(BridgeError::NotAvailable("pkill".to_string())));

    let fs = Arc::new(LockedFileSystem::new(1));
    let relocator = FileRelocator::new(fs.clone(), tags(), Arc::new(breaker));

    let outcome = relocator
        .relocate(&ocean(), &scratch.library(), &scratch.staging(), "Chill")
        .await
        .unwrap();
    assert_eq!(outcome, RelocationOutcome::MovedAfterForceClose);
    assert_eq!(relocator.forced_closes(), 0);
}

#[tokio::test]
async fn test_app_not_running_is_not_counted() {
    let scratch = Scratch::new();
    scratch.put(&scratch.library(), "Chill", "a.mp3");

    let mut breaker = MockBreaker::new();
    breaker.expect_force_close().times(1).returning(|| Ok(false));

    let fs = Arc::new(LockedFileSystem::new(1));
    let relocator = FileRelocator::new(fs.clone(), tags(), Arc::new(breaker));

    let outcome = relocator
        .relocate(&ocean(), &scratch.library(), &scratch.staging(), "Chill")
        .await
        .unwrap();
    assert_eq!(outcome, RelocationOutcome::MovedAfterForceClose);
    assert_eq!(fs.renames.load(Ordering::SeqCst), 2);
    assert_eq!(relocator.forced_closes(), 0);
}
