//! Navigation over a proof script's verified prefix.
//!
//! The controller owns the session's single verifier and the checkpoint of
//! every document it has seen. Each operation resolves a target line from the
//! current checkpoint, verifies the prefix up to it, and records the outcome.
//! Checkpoints only change after a reply arrives; a verifier error leaves the
//! last known-good checkpoint in place.
use crate::checkpoint::{Checkpoint, CheckpointStore, DocumentId};
use crate::document::{EditRegion, ScriptDocument};
use crate::invalidation;
use crate::verifier::{VerificationOutcome, Verifier, VerifierError};

pub(crate) struct NavigationController<V> {
    verifier: V,
    checkpoints: CheckpointStore,
}

impl<V: Verifier> NavigationController<V> {
    pub(crate) fn new(verifier: V, checkpoints: CheckpointStore) -> Self {
        Self {
            verifier,
            checkpoints,
        }
    }

    pub(crate) fn checkpoint(&self, doc: &DocumentId) -> Checkpoint {
        self.checkpoints.get(doc)
    }

    /// Verify lines `0..=target` of `doc`; `None` resets without verifying.
    ///
    /// Targets past the end of the document are clamped to its last line.
    pub(crate) fn run_to_line<D>(
        &mut self,
        doc: &D,
        target: Option<usize>,
    ) -> Result<VerificationOutcome, VerifierError>
    where
        D: ScriptDocument + ?Sized,
    {
        let last_line = doc.line_count().checked_sub(1);
        let Some(target) = target.zip(last_line).map(|(t, last)| t.min(last)) else {
            tracing::debug!(doc = %doc.id(), "reset checkpoint");
            self.checkpoints.set(doc.id(), Checkpoint::RESET);
            return Ok(VerificationOutcome::empty());
        };

        tracing::debug!(doc = %doc.id(), line = target, "verify prefix");
        let outcome = self.verifier.verify(&doc.prefix_text(target))?;
        let checkpoint = match &outcome {
            VerificationOutcome::Success { .. } => Checkpoint::verified(target),
            VerificationOutcome::Failure(failure) => {
                Checkpoint::rejected(failure.failed_line, failure.checked_line)
            }
        };
        self.checkpoints.set(doc.id(), checkpoint);
        Ok(outcome)
    }

    pub(crate) fn run_to_cursor<D>(
        &mut self,
        doc: &D,
        cursor_line: usize,
    ) -> Result<VerificationOutcome, VerifierError>
    where
        D: ScriptDocument + ?Sized,
    {
        self.run_to_line(doc, Some(cursor_line))
    }

    /// Advance one line, or retry the failed line.
    pub(crate) fn step_forward<D>(&mut self, doc: &D) -> Result<VerificationOutcome, VerifierError>
    where
        D: ScriptDocument + ?Sized,
    {
        let checkpoint = self.checkpoints.get(doc.id());
        let target = match checkpoint {
            Checkpoint {
                failed: Some(failed),
                ..
            } => failed,
            Checkpoint {
                passed: Some(passed),
                ..
            } => passed + 1,
            _ => 0,
        };
        self.run_to_line(doc, Some(target))
    }

    /// Retreat to the line before the failed or last verified line.
    pub(crate) fn step_backward<D>(
        &mut self,
        doc: &D,
    ) -> Result<VerificationOutcome, VerifierError>
    where
        D: ScriptDocument + ?Sized,
    {
        let checkpoint = self.checkpoints.get(doc.id());
        let target = checkpoint
            .failed
            .or(checkpoint.passed)
            .and_then(|line| line.checked_sub(1));
        self.run_to_line(doc, target)
    }

    pub(crate) fn run_to_end<D>(&mut self, doc: &D) -> Result<VerificationOutcome, VerifierError>
    where
        D: ScriptDocument + ?Sized,
    {
        self.run_to_line(doc, doc.line_count().checked_sub(1))
    }

    pub(crate) fn reset<D>(&mut self, doc: &D) -> Result<VerificationOutcome, VerifierError>
    where
        D: ScriptDocument + ?Sized,
    {
        self.run_to_line(doc, None)
    }

    /// Start tracking a newly focused document or resume where it left off.
    pub(crate) fn on_document_opened<D>(
        &mut self,
        doc: &D,
    ) -> Result<VerificationOutcome, VerifierError>
    where
        D: ScriptDocument + ?Sized,
    {
        if !self.checkpoints.contains(doc.id()) {
            self.checkpoints.set(doc.id(), Checkpoint::RESET);
            return self.run_to_line(doc, None);
        }
        let checkpoint = self.checkpoints.get(doc.id());
        self.run_to_line(doc, checkpoint.failed.or(checkpoint.passed))
    }

    /// Re-verify up to the last line `edits` left intact, if any verified
    /// line was touched.
    ///
    /// `doc` must already reflect the edits.
    pub(crate) fn on_document_edited<D>(
        &mut self,
        doc: &D,
        edits: &[EditRegion],
    ) -> Result<Option<VerificationOutcome>, VerifierError>
    where
        D: ScriptDocument + ?Sized,
    {
        let passed = self.checkpoints.get(doc.id()).passed;
        let Some(target) = invalidation::decide(edits, passed, |line| doc.line_len(line)) else {
            return Ok(None);
        };
        tracing::debug!(doc = %doc.id(), line = ?target, "edit invalidated verified lines");
        self.run_to_line(doc, target).map(Some)
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
