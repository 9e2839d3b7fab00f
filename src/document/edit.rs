// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! The edit applier: turns a text plus change events into a new text.

use lsp_types::{Position, TextDocumentContentChangeEvent};
use thiserror::Error;

use super::encoding::{PositionEncoding, column_to_byte, line_spans};

/// Why a change event could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The position names a line the document does not have.
    #[error("line {line} is past the end of the document ({line_count} lines)")]
    LineOutOfRange {
        /// Requested line.
        line: u32,
        /// Number of lines in the document.
        line_count: usize,
    },

    /// The character offset falls inside a multi-unit character.
    #[error("character {character} on line {line} splits a multi-unit character")]
    SplitCharacter {
        /// Requested line.
        line: u32,
        /// Requested character offset.
        character: u32,
    },

    /// The range ends before it starts.
    #[error(
        "range start {start_line}:{start_character} is after its end {end_line}:{end_character}"
    )]
    InvertedRange {
        /// Start line.
        start_line: u32,
        /// Start character.
        start_character: u32,
        /// End line.
        end_line: u32,
        /// End character.
        end_character: u32,
    },
}

/// Resolves a position to a byte offset in `text`.
///
/// A character past the end of its line clamps to the line end. The position
/// one line past the last line, at character 0, denotes the end of the text.
///
/// # Errors
///
/// Returns [`EditError::LineOutOfRange`] or [`EditError::SplitCharacter`].
pub fn offset_at(
    text: &str,
    position: Position,
    encoding: PositionEncoding,
) -> Result<usize, EditError> {
    let spans = line_spans(text);
    let line = position.line as usize;

    let Some(span) = spans.get(line) else {
        if line == spans.len() && position.character == 0 {
            return Ok(text.len());
        }
        return Err(EditError::LineOutOfRange {
            line: position.line,
            line_count: spans.len(),
        });
    };

    column_to_byte(&text[span.clone()], position.character, encoding)
        .map(|byte| span.start + byte)
        .ok_or(EditError::SplitCharacter {
            line: position.line,
            character: position.character,
        })
}

/// Applies a single change event to `text`.
///
/// A change without a range replaces the whole text. `range_length` is
/// deprecated in the protocol and ignored.
///
/// # Errors
///
/// Returns an [`EditError`] if the range cannot be resolved against `text`.
pub fn apply_change(
    text: &str,
    change: &TextDocumentContentChangeEvent,
    encoding: PositionEncoding,
) -> Result<String, EditError> {
    let Some(range) = change.range else {
        return Ok(change.text.clone());
    };

    if (range.start.line, range.start.character) > (range.end.line, range.end.character) {
        return Err(EditError::InvertedRange {
            start_line: range.start.line,
            start_character: range.start.character,
            end_line: range.end.line,
            end_character: range.end.character,
        });
    }

    let start = offset_at(text, range.start, encoding)?;
    let end = offset_at(text, range.end, encoding)?;

    let mut result = String::with_capacity(text.len() - (end - start) + change.text.len());
    result.push_str(&text[..start]);
    result.push_str(&change.text);
    result.push_str(&text[end..]);
    Ok(result)
}

/// Applies a batch of change events in order, each to the result of the
/// previous one.
///
/// The batch is all-or-nothing: on error the caller's text is untouched and
/// no partial result is returned.
///
/// # Errors
///
/// Returns the first [`EditError`] encountered.
pub fn apply_changes(
    text: &str,
    changes: &[TextDocumentContentChangeEvent],
    encoding: PositionEncoding,
) -> Result<String, EditError> {
    changes
        .iter()
        .try_fold(text.to_string(), |current, change| {
            apply_change(&current, change, encoding)
        })
}
