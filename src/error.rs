// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Error taxonomy for the synchronization core.
//!
//! Nothing here is fatal to the process: every variant describes a single
//! rejected event and leaves all other documents untouched.

use thiserror::Error;

use crate::document::EditError;
use crate::uri::DocumentUri;

/// JSON-RPC `ParseError` error code.
pub const PARSE_ERROR: i64 = -32700;
/// JSON-RPC `InvalidRequest` error code.
pub const INVALID_REQUEST: i64 = -32600;
/// JSON-RPC `MethodNotFound` error code.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC `InvalidParams` error code.
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC `InternalError` error code.
pub const INTERNAL_ERROR: i64 = -32603;
/// LSP `ServerNotInitialized` error code.
pub const SERVER_NOT_INITIALIZED: i64 = -32002;
/// LSP `RequestFailed` error code.
pub const REQUEST_FAILED: i64 = -32803;

/// Broad classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The event itself is malformed (bad URI, bad edit coordinates).
    InvalidInput,
    /// The event does not match the current document state.
    StateInconsistency,
}

/// A recoverable failure while applying or querying a document event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The URI is malformed or uses a scheme other than `file`.
    #[error("invalid document URI '{uri}': {reason}")]
    InvalidUri {
        /// The rejected URI as received.
        uri: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An edit in a change batch could not be applied.
    #[error("invalid edit for {uri}: {source}")]
    InvalidEdit {
        /// Document the edit targeted.
        uri: DocumentUri,
        /// The underlying edit failure.
        #[source]
        source: EditError,
    },

    /// The document was never opened, or has been closed.
    #[error("document not open: {0}")]
    NotOpen(DocumentUri),

    /// The change carries a version that does not advance the document.
    #[error("stale version {received} for {uri} (current version is {current})")]
    StaleVersion {
        /// Document the change targeted.
        uri: DocumentUri,
        /// Version currently held by the store.
        current: i32,
        /// Version carried by the rejected change.
        received: i32,
    },
}

impl SyncError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUri { .. } | Self::InvalidEdit { .. } => ErrorKind::InvalidInput,
            Self::NotOpen(_) | Self::StaleVersion { .. } => ErrorKind::StateInconsistency,
        }
    }

    /// Returns the JSON-RPC error code used when reporting this error.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self.kind() {
            ErrorKind::InvalidInput => INVALID_PARAMS,
            ErrorKind::StateInconsistency => REQUEST_FAILED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_error_kinds_and_codes() -> Result<()> {
        let uri = DocumentUri::parse("file:///a.ck3")?;

        let not_open = SyncError::NotOpen(uri.clone());
        assert_eq!(not_open.kind(), ErrorKind::StateInconsistency);
        assert_eq!(not_open.code(), REQUEST_FAILED);
        assert_eq!(not_open.to_string(), "document not open: file:///a.ck3");

        let invalid = SyncError::InvalidEdit {
            uri,
            source: EditError::LineOutOfRange {
                line: 9,
                line_count: 2,
            },
        };
        assert_eq!(invalid.kind(), ErrorKind::InvalidInput);
        assert_eq!(invalid.code(), INVALID_PARAMS);
        Ok(())
    }
}
