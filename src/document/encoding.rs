// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Position encodings and line/column arithmetic.
//!
//! LSP positions are `(line, character)` pairs where `character` is counted in
//! the encoding negotiated during `initialize`. UTF-16 code units are the
//! protocol default; UTF-8 bytes and UTF-32 code points may be negotiated.
//! Line terminators are `\n` and `\r\n`; a trailing `\r` never counts as a
//! character of its line.

use std::ops::Range;

use lsp_types::PositionEncodingKind;
use serde::{Deserialize, Serialize};

/// Unit in which `Position::character` is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionEncoding {
    /// UTF-8 code units (bytes).
    #[serde(rename = "utf-8")]
    Utf8,
    /// UTF-16 code units.
    #[default]
    #[serde(rename = "utf-16")]
    Utf16,
    /// Unicode code points.
    #[serde(rename = "utf-32")]
    Utf32,
}

impl PositionEncoding {
    /// Number of units `c` occupies in this encoding.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "a char is at most 4 units wide"
    )]
    pub const fn width(self, c: char) -> u32 {
        match self {
            Self::Utf8 => c.len_utf8() as u32,
            Self::Utf16 => c.len_utf16() as u32,
            Self::Utf32 => 1,
        }
    }

    /// The LSP wire name of this encoding.
    #[must_use]
    pub fn kind(self) -> PositionEncodingKind {
        match self {
            Self::Utf8 => PositionEncodingKind::UTF8,
            Self::Utf16 => PositionEncodingKind::UTF16,
            Self::Utf32 => PositionEncodingKind::UTF32,
        }
    }

    /// Parses an LSP wire name.
    #[must_use]
    pub fn from_kind(kind: &PositionEncodingKind) -> Option<Self> {
        match kind.as_str() {
            "utf-8" => Some(Self::Utf8),
            "utf-16" => Some(Self::Utf16),
            "utf-32" => Some(Self::Utf32),
            _ => None,
        }
    }

    /// Picks the encoding to use for a session.
    ///
    /// The preferred encoding is used only if the client offers it; UTF-16
    /// is mandatory for every client and is the fallback.
    #[must_use]
    pub fn negotiate(preferred: Self, offered: Option<&[PositionEncodingKind]>) -> Self {
        let offered = offered.unwrap_or_default();
        if offered
            .iter()
            .filter_map(Self::from_kind)
            .any(|encoding| encoding == preferred)
        {
            preferred
        } else {
            Self::Utf16
        }
    }
}

/// Byte spans of every line's content, terminators excluded.
///
/// A text ending in a newline has a final empty line, so `"a\n"` has two
/// lines and `""` has one.
pub(crate) fn line_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for piece in text.split('\n') {
        let content = piece.strip_suffix('\r').unwrap_or(piece);
        spans.push(start..start + content.len());
        start += piece.len() + 1;
    }
    spans
}

/// Converts a column in `encoding` units to a byte offset within `line`.
///
/// Columns past the end of the line clamp to its length. Returns `None` if
/// the column falls inside a character that spans several units.
pub(crate) fn column_to_byte(line: &str, character: u32, encoding: PositionEncoding) -> Option<usize> {
    let mut units = 0u32;
    for (idx, c) in line.char_indices() {
        if units == character {
            return Some(idx);
        }
        units += encoding.width(c);
        if units > character {
            return None;
        }
    }
    Some(line.len())
}

/// Converts a byte offset within `line` to a column in `encoding` units.
pub(crate) fn byte_to_column(line: &str, byte: usize, encoding: PositionEncoding) -> u32 {
    line.char_indices()
        .take_while(|(idx, _)| *idx < byte)
        .map(|(_, c)| encoding.width(c))
        .sum()
}
