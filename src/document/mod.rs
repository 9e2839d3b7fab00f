// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// Edit application for full and incremental changes.
mod edit;
/// Position encodings and line/column arithmetic.
mod encoding;
/// Word lookup under a cursor.
mod resolve;
/// Concurrent store of open documents.
mod store;

pub use edit::{EditError, apply_change, apply_changes, offset_at};
pub use encoding::PositionEncoding;
pub(crate) use encoding::{byte_to_column, line_spans};
pub use resolve::{WordAt, word_at};
pub use store::{Document, DocumentStore};
