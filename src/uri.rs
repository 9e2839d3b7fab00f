// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Validated document identifiers.

use std::fmt;

use url::Url;

use crate::error::SyncError;

/// A `file://` URI identifying an open document.
///
/// The raw string is kept verbatim so that diagnostics are published under
/// exactly the URI the editor used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentUri(String);

impl DocumentUri {
    /// Parses and validates a document URI.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidUri`] if the string is not a URL or its
    /// scheme is not `file`.
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let url = Url::parse(raw).map_err(|e| SyncError::InvalidUri {
            uri: raw.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "file" {
            return Err(SyncError::InvalidUri {
                uri: raw.to_string(),
                reason: format!("unsupported URI scheme '{}'", url.scheme()),
            });
        }

        Ok(Self(raw.to_string()))
    }

    /// Returns the URI as received.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&lsp_types::Uri> for DocumentUri {
    type Error = SyncError;

    fn try_from(uri: &lsp_types::Uri) -> Result<Self, Self::Error> {
        Self::parse(uri.as_str())
    }
}

impl fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
