//! Plain-text edits.
//!
//! Positions and lengths count Unicode scalar values (`char`s), not bytes,
//! so edits stay valid for any UTF-8 text.
//!
//! ## Transform rules
//!
//! | Left \ Right | Insert | Delete |
//! |--------------|--------|--------|
//! | Insert | order by position, then content; identical inserts collapse | shift, or swallowed if strictly inside the delete |
//! | Delete | mirror of insert/delete | shift if disjoint, conflict if the ranges overlap |

use otsync_core::algebra::{invert_each, squash_adjacent};
use otsync_core::{InvalidDiff, OtState, OtSystem, PairTransform, StateError, TransformError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single edit to a text document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum TextEdit {
    /// Insert `content` before the char at `position`
    Insert {
        /// Char offset
        position: usize,
        /// Inserted text
        content: String,
    },
    /// Remove `content`, which starts at `position`
    Delete {
        /// Char offset
        position: usize,
        /// Removed text
        content: String,
    },
}

impl TextEdit {
    /// Insert `content` at `position`.
    #[must_use]
    pub fn insert(position: usize, content: impl Into<String>) -> Self {
        Self::Insert {
            position,
            content: content.into(),
        }
    }

    /// Delete `content` found at `position`.
    #[must_use]
    pub fn delete(position: usize, content: impl Into<String>) -> Self {
        Self::Delete {
            position,
            content: content.into(),
        }
    }

    /// Char offset the edit applies at.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::Insert { position, .. } | Self::Delete { position, .. } => *position,
        }
    }

    /// Text inserted or removed.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Insert { content, .. } | Self::Delete { content, .. } => content,
        }
    }

    /// Length of the content in chars.
    #[must_use]
    pub fn len(&self) -> usize {
        char_len(self.content())
    }

    /// Whether the content is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content().is_empty()
    }

    /// Whether this is an insert.
    #[must_use]
    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Insert { .. })
    }

    /// End of the affected range.
    #[must_use]
    pub fn end(&self) -> usize {
        self.position().saturating_add(self.len())
    }

    /// The edit that undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        match self {
            Self::Insert { position, content } => Self::delete(*position, content.clone()),
            Self::Delete { position, content } => Self::insert(*position, content.clone()),
        }
    }
}

impl fmt::Display for TextEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert { position, content } => write!(f, "insert({position}, {content:?})"),
            Self::Delete { position, content } => write!(f, "delete({position}, {content:?})"),
        }
    }
}

/// Transform rules for [`TextEdit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TextOtSystem;

impl TextOtSystem {
    /// Create the system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl OtSystem for TextOtSystem {
    type Diff = TextEdit;

    fn is_empty(&self, diff: &TextEdit) -> bool {
        diff.is_empty()
    }

    fn invert(&self, diffs: &[TextEdit]) -> Vec<TextEdit> {
        invert_each(diffs, |edit| [edit.inverse()])
    }

    fn squash(&self, diffs: &[TextEdit]) -> Vec<TextEdit> {
        squash_adjacent(diffs, TextEdit::is_empty, squash_pair)
    }

    fn transform_pair(
        &self,
        left: &TextEdit,
        right: &TextEdit,
    ) -> Result<PairTransform<TextEdit>, TransformError> {
        match (left, right) {
            (TextEdit::Insert { .. }, TextEdit::Insert { .. }) => transform_inserts(left, right),
            (TextEdit::Delete { .. }, TextEdit::Delete { .. }) => Ok(transform_deletes(left, right)),
            (TextEdit::Insert { .. }, TextEdit::Delete { .. }) => insert_against_delete(left, right),
            (TextEdit::Delete { .. }, TextEdit::Insert { .. }) => {
                insert_against_delete(right, left).map(PairTransform::swapped)
            }
        }
    }

    fn validate(&self, diff: &TextEdit) -> Result<(), InvalidDiff> {
        if diff.position().checked_add(diff.len()).is_none() {
            return Err(InvalidDiff::new(format!(
                "{} chars at position {} overflow",
                diff.len(),
                diff.position()
            )));
        }
        Ok(())
    }
}

/// Move `edit` past `by` chars inserted before it.
fn shift(edit: &TextEdit, by: usize) -> Result<usize, TransformError> {
    edit.position().checked_add(by).ok_or_else(|| {
        TransformError::Inconsistent(format!("{edit} cannot move {by} chars right"))
    })
}

fn transform_inserts(
    left: &TextEdit,
    right: &TextEdit,
) -> Result<PairTransform<TextEdit>, TransformError> {
    if left == right {
        return Ok(PairTransform::empty());
    }

    let left_first = (left.position(), left.content()) < (right.position(), right.content());
    Ok(if left_first {
        PairTransform::of(
            left.clone(),
            TextEdit::insert(shift(right, left.len())?, right.content()),
        )
    } else {
        PairTransform::of(
            TextEdit::insert(shift(left, right.len())?, left.content()),
            right.clone(),
        )
    })
}

fn transform_deletes(left: &TextEdit, right: &TextEdit) -> PairTransform<TextEdit> {
    if left.position() < right.end() && right.position() < left.end() {
        return PairTransform::conflict(format!(
            "deletes overlap: {}..{} and {}..{}",
            left.position(),
            left.end(),
            right.position(),
            right.end()
        ));
    }

    if left.end() <= right.position() {
        PairTransform::of(
            left.clone(),
            TextEdit::delete(right.position() - left.len(), right.content()),
        )
    } else {
        PairTransform::of(
            TextEdit::delete(left.position() - right.len(), left.content()),
            right.clone(),
        )
    }
}

/// Rebase an insert and a delete over each other. The returned `left` side
/// is the insert, `right` the delete.
fn insert_against_delete(
    insert: &TextEdit,
    delete: &TextEdit,
) -> Result<PairTransform<TextEdit>, TransformError> {
    let (at, start) = (insert.position(), delete.position());

    if start < at && at < delete.end() {
        tracing::trace!(position = at, "Insert swallowed by concurrent delete");
        let content = splice(delete.content(), at - start, insert.content());
        return Ok(PairTransform::only_right(TextEdit::delete(start, content)));
    }

    Ok(if at <= start {
        PairTransform::of(
            insert.clone(),
            TextEdit::delete(shift(delete, insert.len())?, delete.content()),
        )
    } else {
        PairTransform::of(
            TextEdit::insert(at - delete.len(), insert.content()),
            delete.clone(),
        )
    })
}

/// Combine `first` then `second` into one edit, if they touch.
fn squash_pair(first: &TextEdit, second: &TextEdit) -> Option<TextEdit> {
    let (fp, sp) = (first.position(), second.position());
    let (fc, sc) = (first.content(), second.content());

    match (first, second) {
        (TextEdit::Insert { .. }, TextEdit::Insert { .. }) => (fp <= sp && sp <= first.end())
            .then(|| TextEdit::insert(fp, splice(fc, sp - fp, sc))),

        (TextEdit::Delete { .. }, TextEdit::Delete { .. }) => (sp <= fp && fp <= second.end())
            .then(|| TextEdit::delete(sp, splice(sc, fp - sp, fc))),

        (TextEdit::Insert { .. }, TextEdit::Delete { .. }) => {
            if sp <= fp && first.end() <= second.end() {
                Some(TextEdit::delete(sp, cut(sc, fp - sp, first.len())))
            } else if fp <= sp && second.end() <= first.end() {
                Some(TextEdit::insert(fp, cut(fc, sp - fp, second.len())))
            } else {
                None
            }
        }

        (TextEdit::Delete { .. }, TextEdit::Insert { .. }) => {
            if fp != sp {
                None
            } else if let Some(rest) = fc.strip_prefix(sc) {
                fp.checked_add(second.len()).map(|at| TextEdit::delete(at, rest))
            } else if let Some(rest) = fc.strip_suffix(sc) {
                Some(TextEdit::delete(fp, rest))
            } else if let Some(rest) = sc.strip_prefix(fc) {
                fp.checked_add(first.len()).map(|at| TextEdit::insert(at, rest))
            } else {
                sc.strip_suffix(fc).map(|rest| TextEdit::insert(fp, rest))
            }
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i)
}

/// `outer` with `inner` inserted at char `at`.
fn splice(outer: &str, at: usize, inner: &str) -> String {
    let (head, tail) = outer.split_at(byte_offset(outer, at));
    let mut spliced = String::with_capacity(outer.len() + inner.len());
    spliced.push_str(head);
    spliced.push_str(inner);
    spliced.push_str(tail);
    spliced
}

/// `text` without the `len` chars starting at char `at`.
fn cut(text: &str, at: usize, len: usize) -> String {
    let start = byte_offset(text, at);
    let stop = byte_offset(text, at + len);
    let mut remaining = String::with_capacity(text.len() - (stop - start));
    remaining.push_str(&text[..start]);
    remaining.push_str(&text[stop..]);
    remaining
}

/// A text document that [`TextEdit`]s apply to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TextDocument {
    text: String,
}

impl TextDocument {
    /// Create a document with initial text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Current text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in chars.
    #[must_use]
    pub fn len(&self) -> usize {
        char_len(&self.text)
    }

    /// Whether the document is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Take the text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

impl From<&str> for TextDocument {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for TextDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl OtState<TextEdit> for TextDocument {
    fn apply(&mut self, edit: &TextEdit) -> Result<(), StateError> {
        let len = self.len();
        match edit {
            TextEdit::Insert { position, content } => {
                if *position > len {
                    return Err(StateError::OutOfBounds {
                        position: *position,
                        len,
                    });
                }
                let at = byte_offset(&self.text, *position);
                self.text.insert_str(at, content);
            }
            TextEdit::Delete { position, content } => {
                let end = edit.end();
                if end > len {
                    return Err(StateError::OutOfBounds { position: end, len });
                }
                let start = byte_offset(&self.text, *position);
                let stop = byte_offset(&self.text, end);
                let found = &self.text[start..stop];
                if found != content {
                    return Err(StateError::Mismatch(format!(
                        "expected {content:?} at {position}, found {found:?}"
                    )));
                }
                self.text.replace_range(start..stop, "");
            }
        }
        Ok(())
    }
}
