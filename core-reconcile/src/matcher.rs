//! Fuzzy identity matching
//!
//! Two strings are similar when their normalized Levenshtein similarity
//! `1 - distance / max(len)` is strictly above [`SIMILARITY_THRESHOLD`].
//! Inputs are trimmed and lowercased first; lengths are counted in chars.

use crate::model::TrackRecord;

pub const SIMILARITY_THRESHOLD: f64 = 0.8;

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Similarity in `[0, 1]` between two normalized strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = strsim::levenshtein(&a, &b);
    1.0 - distance as f64 / max_len as f64
}

pub fn similar(a: &str, b: &str) -> bool {
    similarity(a, b) > SIMILARITY_THRESHOLD
}

/// All three identity fields must clear the threshold on their own.
pub fn records_match(x: &TrackRecord, y: &TrackRecord) -> bool {
    similar(&x.title, &y.title) && similar(&x.artist, &y.artist) && similar(&x.album, &y.album)
}
