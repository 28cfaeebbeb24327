//! Outcome printing for the command-line host.
//!
//! Text output numbers lines from 1 the way editors do; JSON output carries
//! the raw 0-based indices from the checkpoint and the verifier reply.
use crate::checkpoint::{Checkpoint, DocumentId};
use crate::verifier::VerificationOutcome;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub(crate) fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Checkpoint of one document plus the outcome that produced it, if any.
#[derive(Debug, Serialize)]
pub(crate) struct Report {
    pub(crate) document: DocumentId,
    pub(crate) checkpoint: Checkpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) result: Option<VerificationOutcome>,
    pub(crate) complete: bool,
}

impl Report {
    pub(crate) fn new(
        document: DocumentId,
        checkpoint: Checkpoint,
        result: Option<VerificationOutcome>,
    ) -> Self {
        let complete = result
            .as_ref()
            .is_some_and(VerificationOutcome::is_complete);
        Self {
            document,
            checkpoint,
            result,
            complete,
        }
    }

    pub(crate) fn is_rejected(&self) -> bool {
        matches!(self.result, Some(VerificationOutcome::Failure(_)))
    }
}

pub(crate) fn write_report<W: Write>(
    out: &mut W,
    format: OutputFormat,
    report: &Report,
) -> Result<()> {
    let text = match format {
        OutputFormat::Text => render_text(report),
        OutputFormat::Json => serde_json::to_string(report).context("serialize report")?,
    };
    writeln!(out, "{text}").context("write report")?;
    out.flush().context("flush report")?;
    Ok(())
}

pub(crate) fn write_error<W: Write>(
    out: &mut W,
    format: OutputFormat,
    message: &str,
) -> Result<()> {
    let written = match format {
        OutputFormat::Text => writeln!(out, "error: {message}"),
        OutputFormat::Json => writeln!(out, "{}", serde_json::json!({ "error": message })),
    };
    written.context("write error")?;
    out.flush().context("flush error")?;
    Ok(())
}

fn render_text(report: &Report) -> String {
    let mut text = format!("{}: {}", report.document, summary(&report.checkpoint));
    match &report.result {
        Some(VerificationOutcome::Success { proof_state }) => {
            push_block(&mut text, proof_state);
        }
        Some(VerificationOutcome::Failure(failure)) => {
            push_block(&mut text, &failure.state);
            text.push_str(&format!("\nerror: {}", failure.message.trim_end()));
        }
        None => {}
    }
    if report.complete {
        text.push_str("\nproof complete");
    }
    text
}

fn summary(checkpoint: &Checkpoint) -> String {
    if checkpoint.is_reset() {
        return "nothing verified".to_string();
    }
    let highlights = checkpoint.highlights();
    let verified = match highlights.verified {
        Some(range) => format!("verified lines 1-{}", range.end() + 1),
        None => "nothing verified".to_string(),
    };
    match highlights.failed {
        Some(failed) => format!("line {} failed; {verified}", failed + 1),
        None => verified,
    }
}

fn push_block(text: &mut String, block: &str) {
    let block = block.trim_end();
    if !block.is_empty() {
        text.push('\n');
        text.push_str(block);
    }
}
