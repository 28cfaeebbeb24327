//! Decide how far back an edit invalidates verified progress.
//!
//! Lines are `Option<usize>` where `None` means "before line 0". `Option`'s
//! ordering puts `None` below every line, so a candidate of `None` is always
//! inside the verified prefix and resolves to a reset.
use crate::document::EditRegion;

/// Target to re-verify after `edits`, or `None` when no verified line is
/// affected.
///
/// `line_len` reports line lengths of the document after the change. The
/// first region whose candidate falls inside the verified prefix wins.
pub(crate) fn decide<F>(
    edits: &[EditRegion],
    passed: Option<usize>,
    line_len: F,
) -> Option<Option<usize>>
where
    F: Fn(usize) -> usize,
{
    edits
        .iter()
        .map(|edit| candidate(edit, &line_len))
        .find(|candidate| *candidate <= passed)
}

/// Last line whose content is still trustworthy after `edit`.
fn candidate<F>(edit: &EditRegion, line_len: &F) -> Option<usize>
where
    F: Fn(usize) -> usize,
{
    let at_line_end = edit.start_char == line_len(edit.start_line);
    let breaks_line = edit.inserted_text.starts_with('\n')
        || edit.inserted_text.starts_with("\r\n");
    let joins_line = edit.inserted_text.is_empty() && edit.end_char == 0;
    if at_line_end && (breaks_line || joins_line) {
        Some(edit.start_line)
    } else {
        edit.start_line.checked_sub(1)
    }
}
