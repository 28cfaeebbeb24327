//! Document model consumed by the navigation controller.
//!
//! The controller never owns editor state. It reads line counts, prefixes and
//! line lengths through [`ScriptDocument`], and receives edits as
//! [`EditRegion`]s in the coordinates of the text before the change.
use crate::checkpoint::DocumentId;

/// Read-only view of an open proof script.
pub(crate) trait ScriptDocument {
    fn id(&self) -> &DocumentId;

    /// Number of lines, counting a trailing empty line after a final `\n`.
    fn line_count(&self) -> usize;

    /// Text of lines `0..=last_line`, including the break ending `last_line`.
    fn prefix_text(&self, last_line: usize) -> String;

    /// Length in characters of `line`, excluding its line break.
    fn line_len(&self, line: usize) -> usize;
}

/// One discrete text change.
///
/// Positions refer to the document before the change; character offsets
/// count Unicode scalar values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EditRegion {
    pub(crate) start_line: usize,
    pub(crate) start_char: usize,
    pub(crate) end_line: usize,
    pub(crate) end_char: usize,
    pub(crate) inserted_text: String,
}

/// In-memory script backed by an owned string.
#[derive(Debug, Clone)]
pub(crate) struct TextDocument {
    id: DocumentId,
    text: String,
    line_starts: Vec<usize>,
}

impl TextDocument {
    pub(crate) fn new(id: DocumentId, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = line_starts(&text);
        Self {
            id,
            text,
            line_starts,
        }
    }

    #[cfg(test)]
    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// Swap in a new version of the text and describe what changed.
    pub(crate) fn replace_text(&mut self, text: impl Into<String>) -> Option<EditRegion> {
        let text = text.into();
        let edit = edit_between(&self.text, &text);
        self.line_starts = line_starts(&text);
        self.text = text;
        edit
    }

    fn line_text(&self, line: usize) -> &str {
        let Some(&start) = self.line_starts.get(line) else {
            return "";
        };
        let end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let raw = &self.text[start..end];
        raw.strip_suffix('\r').unwrap_or(raw)
    }
}

impl ScriptDocument for TextDocument {
    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn prefix_text(&self, last_line: usize) -> String {
        let end = self
            .line_starts
            .get(last_line + 1)
            .copied()
            .unwrap_or(self.text.len());
        self.text[..end].to_string()
    }

    fn line_len(&self, line: usize) -> usize {
        self.line_text(line).chars().count()
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(idx, _)| idx + 1))
        .collect()
}

/// Describe the change from `old` to `new` as a single region.
///
/// The region spans everything between the longest common prefix and the
/// longest common suffix. Returns `None` when the texts are identical.
pub(crate) fn edit_between(old: &str, new: &str) -> Option<EditRegion> {
    if old == new {
        return None;
    }
    let prefix: usize = old
        .chars()
        .zip(new.chars())
        .take_while(|(a, b)| a == b)
        .map(|(ch, _)| ch.len_utf8())
        .sum();
    let suffix: usize = old[prefix..]
        .chars()
        .rev()
        .zip(new[prefix..].chars().rev())
        .take_while(|(a, b)| a == b)
        .map(|(ch, _)| ch.len_utf8())
        .sum();

    let (start_line, start_char) = position_of(old, prefix);
    let (end_line, end_char) = position_of(old, old.len() - suffix);
    Some(EditRegion {
        start_line,
        start_char,
        end_line,
        end_char,
        inserted_text: new[prefix..new.len() - suffix].to_string(),
    })
}

fn position_of(text: &str, byte: usize) -> (usize, usize) {
    let before = &text[..byte];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    (line, before[line_start..].chars().count())
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
