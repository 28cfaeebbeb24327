//! Per-document verification progress.
//!
//! A checkpoint records the last line of the script that verified as part of
//! a prefix and, when the last run was rejected, the line that failed.
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;

/// Stable handle for an open document, used only as a map key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub(crate) struct DocumentId(String);

impl DocumentId {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Verification progress for one document.
///
/// `None` stands for "no line": both absent is the reset state. When `failed`
/// is present it is strictly greater than `passed`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub(crate) struct Checkpoint {
    pub(crate) failed: Option<usize>,
    pub(crate) passed: Option<usize>,
}

/// Line ranges a presentation layer would highlight for a checkpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Highlights {
    pub(crate) verified: Option<RangeInclusive<usize>>,
    pub(crate) failed: Option<usize>,
}

impl Checkpoint {
    pub(crate) const RESET: Checkpoint = Checkpoint {
        failed: None,
        passed: None,
    };

    pub(crate) fn verified(passed: usize) -> Self {
        Self {
            failed: None,
            passed: Some(passed),
        }
    }

    pub(crate) fn rejected(failed: usize, passed: Option<usize>) -> Self {
        Self {
            failed: Some(failed),
            passed,
        }
    }

    pub(crate) fn is_reset(&self) -> bool {
        self.failed.is_none() && self.passed.is_none()
    }

    pub(crate) fn highlights(&self) -> Highlights {
        Highlights {
            verified: self.passed.map(|passed| 0..=passed),
            failed: self.failed,
        }
    }
}

/// Checkpoints for every document observed during a session.
#[derive(Debug, Default)]
pub(crate) struct CheckpointStore {
    entries: HashMap<DocumentId, Checkpoint>,
}

impl CheckpointStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Checkpoint for `doc`, or the reset state if it was never recorded.
    pub(crate) fn get(&self, doc: &DocumentId) -> Checkpoint {
        self.entries.get(doc).copied().unwrap_or_default()
    }

    pub(crate) fn set(&mut self, doc: &DocumentId, checkpoint: Checkpoint) {
        self.entries.insert(doc.clone(), checkpoint);
    }

    /// Whether `doc` has been observed, even if its checkpoint is reset.
    pub(crate) fn contains(&self, doc: &DocumentId) -> bool {
        self.entries.contains_key(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_document_reads_as_reset() {
        let store = CheckpointStore::new();
        let doc = DocumentId::new("file:///a.dd");
        assert!(store.get(&doc).is_reset());
        assert!(!store.contains(&doc));
    }

    #[test]
    fn documents_are_independent() {
        let mut store = CheckpointStore::new();
        let a = DocumentId::new("file:///a.dd");
        let b = DocumentId::new("file:///b.dd");
        store.set(&a, Checkpoint::verified(4));
        store.set(&b, Checkpoint::rejected(2, Some(1)));

        assert_eq!(store.get(&a), Checkpoint::verified(4));
        assert_eq!(store.get(&b).failed, Some(2));
        assert_eq!(store.get(&b).passed, Some(1));
    }

    #[test]
    fn reset_entry_is_still_tracked() {
        let mut store = CheckpointStore::new();
        let doc = DocumentId::new("file:///a.dd");
        store.set(&doc, Checkpoint::RESET);
        assert!(store.contains(&doc));
        assert!(store.get(&doc).is_reset());
    }

    #[test]
    fn highlights_cover_verified_prefix_and_failed_line() {
        let highlights = Checkpoint::rejected(3, Some(2)).highlights();
        assert_eq!(highlights.verified, Some(0..=2));
        assert_eq!(highlights.failed, Some(3));

        let empty = Checkpoint::RESET.highlights();
        assert_eq!(empty.verified, None);
        assert_eq!(empty.failed, None);
    }
}
