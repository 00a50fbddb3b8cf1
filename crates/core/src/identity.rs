//! Pairing of an OS-visible device with the diagnostic handle that actually
//! answers SMART queries.
//!
//! On Windows a `//./PhysicalDriveN` handle can return an identity-only
//! document, while the health data is reachable under another handle listed
//! by `smartctl --scan-open`. Each candidate's identity is scored against the
//! target device and the best one is selected.

use serde_json::Value;
use tracing::debug;

use crate::error::{ProbeError, ProbeResult};
use crate::extract::extract_identity;
use crate::model::DeviceIdentity;

const SERIAL_MATCH_POINTS: i32 = 3;
const MODEL_MATCH_POINTS: i32 = 2;
const SIZE_MATCH_POINTS: i32 = 1;
const SIZE_TOLERANCE_FLOOR_BYTES: u64 = 10 * 1024 * 1024;

/// A diagnostic target reported by the candidate scan, with the protocol hint
/// (`-d` type) to query it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticCandidate {
    pub handle: String,
    pub protocol_hint: Option<String>,
}

impl DiagnosticCandidate {
    pub fn new(handle: impl Into<String>, protocol_hint: Option<&str>) -> Self {
        Self {
            handle: handle.into(),
            protocol_hint: protocol_hint.map(str::to_string),
        }
    }
}

pub fn identity_score(target: &DeviceIdentity, candidate: &DeviceIdentity) -> i32 {
    let mut score = 0;
    if texts_match(target.serial.as_deref(), candidate.serial.as_deref()) {
        score += SERIAL_MATCH_POINTS;
    }
    if texts_match(target.model.as_deref(), candidate.model.as_deref()) {
        score += MODEL_MATCH_POINTS;
    }
    if let (Some(expected), Some(actual)) = (target.size_bytes, candidate.size_bytes) {
        if expected.abs_diff(actual) <= size_tolerance(expected) {
            score += SIZE_MATCH_POINTS;
        }
    }
    score
}

/// Picks the candidate whose identity best matches `target`.
///
/// Identity fetch failures skip that candidate. Any reachable candidate beats
/// the empty starting point, even with a score of zero, and the first one wins
/// a tie. When no candidate was reachable and a single one was offered, that
/// candidate is returned anyway.
pub fn resolve_candidate<F>(
    target: &DeviceIdentity,
    candidates: &[DiagnosticCandidate],
    mut fetch_identity: F,
) -> ProbeResult<DiagnosticCandidate>
where
    F: FnMut(&DiagnosticCandidate) -> ProbeResult<Value>,
{
    let mut best: Option<(&DiagnosticCandidate, i32)> = None;
    for candidate in candidates {
        let doc = match fetch_identity(candidate) {
            Ok(doc) => doc,
            Err(err) => {
                debug!("skipping candidate {}: {}", candidate.handle, err);
                continue;
            }
        };

        let score = identity_score(target, &extract_identity(&doc));
        debug!("candidate {} scored {}", candidate.handle, score);
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((candidate, score)),
        }
    }

    match (best, candidates) {
        (Some((candidate, _)), _) => Ok(candidate.clone()),
        (None, [only]) => {
            debug!("falling back to single candidate {}", only.handle);
            Ok(only.clone())
        }
        (None, _) => Err(ProbeError::NoMatch),
    }
}

fn texts_match(left: Option<&str>, right: Option<&str>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => {
            let left = left.trim();
            !left.is_empty() && left.to_lowercase() == right.trim().to_lowercase()
        }
        _ => false,
    }
}

fn size_tolerance(size_bytes: u64) -> u64 {
    SIZE_TOLERANCE_FLOOR_BYTES.max(size_bytes / 100)
}
