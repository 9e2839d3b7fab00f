// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Read-only position queries over a document snapshot.

use lsp_types::{Position, Range};

use super::encoding::{PositionEncoding, byte_to_column, column_to_byte, line_spans};

/// The word enclosing a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordAt {
    /// The word itself.
    pub word: String,
    /// Where the word sits, in the session's position encoding.
    pub range: Range,
}

/// Finds the maximal run of word characters touching `position`.
///
/// The cursor may sit anywhere inside the word or directly after it. Returns
/// `None` when the line does not exist, the cursor is past the end of its
/// line, or no word touches the cursor; none of these is an error.
#[must_use]
pub fn word_at(text: &str, position: Position, encoding: PositionEncoding) -> Option<WordAt> {
    let span = line_spans(text).into_iter().nth(position.line as usize)?;
    let line = &text[span];
    if position.character > byte_to_column(line, line.len(), encoding) {
        return None;
    }

    // A cursor inside a wide character snaps to that character's start.
    let cursor = column_to_byte(line, position.character, encoding).unwrap_or_else(|| {
        line.char_indices()
            .map(|(idx, _)| idx)
            .take_while(|&idx| byte_to_column(line, idx, encoding) < position.character)
            .last()
            .unwrap_or(0)
    });

    let bytes = line.as_bytes();
    let start = bytes[..cursor]
        .iter()
        .rposition(|&b| !is_word_byte(b))
        .map_or(0, |idx| idx + 1);
    let end = bytes[cursor..]
        .iter()
        .position(|&b| !is_word_byte(b))
        .map_or(bytes.len(), |idx| cursor + idx);

    if start == end {
        return None;
    }

    Some(WordAt {
        word: line[start..end].to_string(),
        range: Range::new(
            Position::new(position.line, byte_to_column(line, start, encoding)),
            Position::new(position.line, byte_to_column(line, end, encoding)),
        ),
    })
}

/// ASCII letters, digits and underscore. Bytes of multi-byte UTF-8
/// sequences are never word bytes, so scanning bytes never splits a char.
const fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
