//! Interactive stepping session driven by line commands.
//!
//! The session stands in for an editor: it keeps the open scripts, tracks
//! which one is active, and turns each command into a controller call.
//! `reload` re-reads the active script from disk and reports the difference
//! as an edit, which may move the checkpoint back.
use crate::checkpoint::DocumentId;
use crate::controller::NavigationController;
use crate::document::{ScriptDocument, TextDocument};
use crate::output::{write_error, write_report, OutputFormat, Report};
use crate::verifier::{Verifier, VerifierError};
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One line of session input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionCommand {
    Open(PathBuf),
    Next,
    Back,
    /// 1-based cursor line.
    Cursor(usize),
    /// 1-based line; 0 resets.
    Line(usize),
    End,
    Reset,
    Reload,
    Status,
    Quit,
}

impl FromStr for SessionCommand {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(anyhow!("empty command"));
        }
        let (verb, rest) = raw.split_once(char::is_whitespace).unwrap_or((raw, ""));
        let rest = rest.trim();
        if verb == "open" {
            if rest.is_empty() {
                return Err(anyhow!("usage: open <FILE>"));
            }
            return Ok(SessionCommand::Open(PathBuf::from(rest)));
        }
        let args: Vec<&str> = rest.split_whitespace().collect();
        let command = match (verb, args.as_slice()) {
            ("next" | "n" | "step", []) => SessionCommand::Next,
            ("back" | "b" | "prev", []) => SessionCommand::Back,
            ("cursor", [line]) => {
                let line = parse_line(line)?;
                if line == 0 {
                    return Err(anyhow!("cursor lines start at 1"));
                }
                SessionCommand::Cursor(line)
            }
            ("line", [line]) => SessionCommand::Line(parse_line(line)?),
            ("end", []) => SessionCommand::End,
            ("reset", []) => SessionCommand::Reset,
            ("reload", []) => SessionCommand::Reload,
            ("status", []) => SessionCommand::Status,
            ("quit" | "exit" | "q", []) => SessionCommand::Quit,
            _ => return Err(anyhow!("unrecognized command: {raw}")),
        };
        Ok(command)
    }
}

fn parse_line(raw: &str) -> Result<usize> {
    raw.parse()
        .with_context(|| format!("line must be a non-negative integer (got {raw:?})"))
}

/// Read a script from disk, keyed by its canonical path.
pub(crate) fn load_document(path: &Path) -> Result<TextDocument> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(TextDocument::new(document_id(path), text))
}

fn document_id(path: &Path) -> DocumentId {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    DocumentId::new(path.display().to_string())
}

struct OpenDocument {
    path: PathBuf,
    doc: TextDocument,
}

pub(crate) struct Session<V> {
    controller: NavigationController<V>,
    documents: HashMap<DocumentId, OpenDocument>,
    active: Option<DocumentId>,
    format: OutputFormat,
}

impl<V: Verifier> Session<V> {
    pub(crate) fn new(controller: NavigationController<V>, format: OutputFormat) -> Self {
        Self {
            controller,
            documents: HashMap::new(),
            active: None,
            format,
        }
    }

    /// Process commands until input ends, `quit`, or the verifier dies.
    pub(crate) fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        for line in input.lines() {
            let line = line.context("read session input")?;
            if line.trim().is_empty() {
                continue;
            }
            let command = match line.parse::<SessionCommand>() {
                Ok(command) => command,
                Err(err) => {
                    write_error(out, self.format, &format!("{err:#}"))?;
                    continue;
                }
            };
            if command == SessionCommand::Quit {
                break;
            }
            match self.execute(command) {
                Ok(report) => write_report(out, self.format, &report)?,
                Err(err) => {
                    write_error(out, self.format, &format!("{err:#}"))?;
                    if is_fatal(&err) {
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn execute(&mut self, command: SessionCommand) -> Result<Report> {
        let id = match &command {
            SessionCommand::Open(path) => return self.open(path),
            SessionCommand::Reload => return self.reload(),
            _ => self.active_id()?,
        };
        let entry = self
            .documents
            .get(&id)
            .ok_or_else(|| anyhow!("active document {id} is not loaded"))?;
        let controller = &mut self.controller;
        let doc = &entry.doc;

        let result = match command {
            SessionCommand::Next => Some(controller.step_forward(doc)?),
            SessionCommand::Back => Some(controller.step_backward(doc)?),
            SessionCommand::Cursor(line) => {
                Some(controller.run_to_cursor(doc, line.saturating_sub(1))?)
            }
            SessionCommand::Line(line) => Some(controller.run_to_line(doc, line.checked_sub(1))?),
            SessionCommand::End => Some(controller.run_to_end(doc)?),
            SessionCommand::Reset => Some(controller.reset(doc)?),
            SessionCommand::Status
            | SessionCommand::Open(_)
            | SessionCommand::Reload
            | SessionCommand::Quit => None,
        };
        Ok(Report::new(id.clone(), controller.checkpoint(&id), result))
    }

    fn active_id(&self) -> Result<DocumentId> {
        self.active
            .clone()
            .ok_or_else(|| anyhow!("no document open; use `open <FILE>`"))
    }

    /// Re-read the active script and re-verify whatever the change touched.
    fn reload(&mut self) -> Result<Report> {
        let id = self.active_id()?;
        let entry = self
            .documents
            .get_mut(&id)
            .ok_or_else(|| anyhow!("active document {id} is not loaded"))?;
        let text = fs::read_to_string(&entry.path)
            .with_context(|| format!("read {}", entry.path.display()))?;
        let result = match entry.doc.replace_text(text) {
            Some(edit) => {
                tracing::debug!(
                    doc = %id,
                    start_line = edit.start_line,
                    end_line = edit.end_line,
                    "document changed on disk"
                );
                self.controller.on_document_edited(&entry.doc, &[edit])?
            }
            None => None,
        };
        Ok(Report::new(id.clone(), self.controller.checkpoint(&id), result))
    }

    fn open(&mut self, path: &Path) -> Result<Report> {
        let id = document_id(path);
        if !self.documents.contains_key(&id) {
            let doc = load_document(path)?;
            tracing::info!(doc = %id, lines = doc.line_count(), "opened document");
            self.documents.insert(
                id.clone(),
                OpenDocument {
                    path: path.to_path_buf(),
                    doc,
                },
            );
        }
        self.active = Some(id.clone());
        let entry = self
            .documents
            .get(&id)
            .ok_or_else(|| anyhow!("document {id} is not loaded"))?;
        let result = self.controller.on_document_opened(&entry.doc)?;
        Ok(Report::new(id.clone(), self.controller.checkpoint(&id), Some(result)))
    }
}

fn is_fatal(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<VerifierError>(),
        Some(VerifierError::ProcessTerminated { .. })
    )
}
