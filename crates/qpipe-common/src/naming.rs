//! Artifact naming
//!
//! Every enrichment key maps to exactly one artifact name. The mapping is a
//! pure function of the key, so reprocessing a key overwrites the previous
//! artifact instead of adding a second one. Distinct keys may collide
//! (`"USA"` and `"U.S.A"` both become `usa.json`); the store keeps whichever
//! was written last.

use crate::error::{QpipeError, Result};

/// Extension appended to every artifact name.
pub const ARTIFACT_EXTENSION: &str = "json";

/// Normalize a key into a filesystem-safe stem.
///
/// Whitespace runs become a single `_`, any other non-alphanumeric character
/// is dropped, and the result is lower-cased. Leading and trailing whitespace
/// is ignored.
pub fn normalize_key(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    let mut pending_space = false;

    for c in key.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else if c.is_alphanumeric() {
            if pending_space && !stem.is_empty() {
                stem.push('_');
            }
            pending_space = false;
            stem.extend(c.to_lowercase());
        }
    }

    stem
}

/// Derive the artifact file name for an enrichment key.
///
/// Fails when nothing of the key survives normalization.
pub fn artifact_name(key: &str) -> Result<String> {
    let stem = normalize_key(key);
    if stem.is_empty() {
        return Err(QpipeError::UnnameableKey(key.to_string()));
    }
    Ok(format!("{}.{}", stem, ARTIFACT_EXTENSION))
}
