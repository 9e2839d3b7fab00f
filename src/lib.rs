// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! gock3-lsp is a language server for Crusader Kings III script files.
//!
//! Its core keeps an authoritative copy of every open document, applies
//! full and incremental edits concurrently across files while serializing
//! them per file, and republishes diagnostics after every accepted change.

/// Diagnostics producers.
pub mod analysis;
/// Configuration handling for server settings.
pub mod config;
/// Document model: store, edits, encodings and position queries.
pub mod document;
/// Method-keyed entry points for document events and queries.
pub mod engine;
/// Error taxonomy and JSON-RPC error codes.
pub mod error;
/// LSP transport: framing and the stdio server.
pub mod lsp;
/// Event serialization and diagnostics publication.
pub mod sync;
/// Validated document URIs.
pub mod uri;

pub use engine::{Engine, HandlerError};
pub use error::SyncError;
pub use uri::DocumentUri;
