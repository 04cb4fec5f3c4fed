//! Multiset diff between local files and a remote playlist
//!
//! Each remote record claims the first still-unclaimed local record it
//! matches. Matching is greedy: with several near-identical local files the
//! claimed instance may not be the best one. Every local record ends up in
//! exactly one of the two outputs.

use crate::matcher::records_match;
use crate::model::TrackRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOutcome {
    /// Local records no remote record claimed
    pub unresolved: Vec<TrackRecord>,
    /// Claimed records, carrying the remote identity and the local file
    pub confirmed: Vec<TrackRecord>,
}

pub fn diff(local: &[TrackRecord], remote: &[TrackRecord]) -> DiffOutcome {
    let mut remaining: Vec<&TrackRecord> = local.iter().collect();
    let mut confirmed = Vec::new();

    for wanted in remote {
        let Some(position) = remaining
            .iter()
            .position(|candidate| records_match(candidate, wanted))
        else {
            continue;
        };

        let claimed = remaining.remove(position);
        let file_name = if claimed.file_name.is_empty() {
            wanted.file_name.clone()
        } else {
            claimed.file_name.clone()
        };

        confirmed.push(TrackRecord {
            title: wanted.title.clone(),
            artist: wanted.artist.clone(),
            album: wanted.album.clone(),
            playlist_name: claimed.playlist_name.clone(),
            file_name,
        });

        if remaining.is_empty() {
            break;
        }
    }

    DiffOutcome {
        unresolved: remaining.into_iter().cloned().collect(),
        confirmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(title: &str, artist: &str, album: &str, file: &str) -> TrackRecord {
        TrackRecord::new(title, artist, album)
            .with_playlist("Chill")
            .with_file_name(file)
    }

    fn remote(title: &str, artist: &str, album: &str) -> TrackRecord {
        TrackRecord::new(title, artist, album).with_playlist("Chill")
    }

    #[test]
    fn test_empty_remote_leaves_everything_unresolved() {
        let locals = vec![local("Ocean", "X", "Y", "a.mp3"), local("Sky", "X", "Y", "b.mp3")];
        let outcome = diff(&locals, &[]);
        assert_eq!(outcome.unresolved, locals);
        assert!(outcome.confirmed.is_empty());
    }

    #[test]
    fn test_empty_local_yields_nothing() {
        let outcome = diff(&[], &[remote("Ocean", "X", "Y")]);
        assert!(outcome.unresolved.is_empty());
        assert!(outcome.confirmed.is_empty());
    }

    #[test]
    fn test_confirmed_takes_remote_identity_and_local_file() {
        let locals = vec![local("ocean ", "x", "y", "a.mp3")];
        let outcome = diff(&locals, &[remote("Ocean", "X", "Y")]);

        assert!(outcome.unresolved.is_empty());
        assert_eq!(outcome.confirmed.len(), 1);
        let confirmed = &outcome.confirmed[0];
        assert_eq!(confirmed.title, "Ocean");
        assert_eq!(confirmed.artist, "X");
        assert_eq!(confirmed.file_name, "a.mp3");
        assert_eq!(confirmed.playlist_name, "Chill");
    }

    #[test]
    fn test_each_remote_claims_one_local_instance() {
        let locals = vec![
            local("Ocean", "X", "Y", "a.mp3"),
            local("Ocean", "X", "Y", "a (copy).mp3"),
        ];
        let outcome = diff(&locals, &[remote("Ocean", "X", "Y")]);

        assert_eq!(outcome.confirmed.len(), 1);
        assert_eq!(outcome.confirmed[0].file_name, "a.mp3");
        assert_eq!(outcome.unresolved, vec![locals[1].clone()]);
    }

    #[test]
    fn test_duplicate_remote_entries_claim_distinct_files() {
        let locals = vec![
            local("Ocean", "X", "Y", "a.mp3"),
            local("Ocean", "X", "Y", "b.mp3"),
        ];
        let remotes = vec![remote("Ocean", "X", "Y"), remote("Ocean", "X", "Y")];
        let outcome = diff(&locals, &remotes);

        assert!(outcome.unresolved.is_empty());
        let files: Vec<_> = outcome.confirmed.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(files, vec!["a.mp3", "b.mp3"]);
    }

    #[test]
    fn test_partition_covers_local_exactly() {
        let locals = vec![
            local("Ocean", "X", "Y", "a.mp3"),
            local("Desert", "Q", "Z", "b.mp3"),
            local("Forest", "X", "Y", "c.mp3"),
            local("Ocean", "X", "Y", "d.mp3"),
        ];
        let remotes = vec![
            remote("Forest", "X", "Y"),
            remote("Ocean", "X", "Y"),
            remote("Mountain", "R", "S"),
        ];
        let outcome = diff(&locals, &remotes);

        let mut seen: Vec<String> = outcome
            .unresolved
            .iter()
            .chain(outcome.confirmed.iter())
            .map(|r| r.file_name.clone())
            .collect();
        seen.sort();
        assert_eq!(seen, vec!["a.mp3", "b.mp3", "c.mp3", "d.mp3"]);
        assert_eq!(outcome.confirmed.len(), 2);
        assert_eq!(outcome.unresolved.len(), 2);
    }
}
