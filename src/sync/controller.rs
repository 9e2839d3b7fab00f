// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Per-document event serialization.
//!
//! Every open, change and close runs under the target document's exclusive
//! lock, from version check through edit application to diagnostics
//! publication. Events for one URI are therefore applied and published in
//! the order they acquire the lock; events for different URIs run in
//! parallel.

use std::sync::Arc;

use lsp_types::TextDocumentContentChangeEvent;
use tracing::{debug, warn};

use super::diagnostics::DiagnosticsCoordinator;
use crate::document::{DocumentStore, PositionEncoding, apply_changes};
use crate::error::SyncError;
use crate::uri::DocumentUri;

/// Behavior switches for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Unit of `Position::character` in change ranges.
    pub encoding: PositionEncoding,
    /// Reject changes whose version does not advance the document.
    pub reject_stale_versions: bool,
    /// Publish an empty diagnostics list when a document is closed.
    pub clear_diagnostics_on_close: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            encoding: PositionEncoding::Utf16,
            reject_stale_versions: true,
            clear_diagnostics_on_close: true,
        }
    }
}

/// Outcome of a successfully applied open or change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    /// Version now held by the store.
    pub version: i32,
    /// Generation stamp of the new document state.
    pub generation: u64,
    /// Whether diagnostics were published. `false` only if the analyzer
    /// failed and the previous diagnostics were kept.
    pub published: bool,
}

/// Applies open/change/close events to the store and drives diagnostics.
#[derive(Debug)]
pub struct SyncController {
    store: Arc<DocumentStore>,
    diagnostics: DiagnosticsCoordinator,
    options: SyncOptions,
}

impl SyncController {
    /// Creates a controller over a shared store.
    #[must_use]
    pub const fn new(
        store: Arc<DocumentStore>,
        diagnostics: DiagnosticsCoordinator,
        options: SyncOptions,
    ) -> Self {
        Self {
            store,
            diagnostics,
            options,
        }
    }

    /// Returns the controller's options.
    #[must_use]
    pub const fn options(&self) -> SyncOptions {
        self.options
    }

    /// Opens a document, discarding any previous state for the URI.
    pub fn did_open(&self, uri: DocumentUri, text: String, version: i32) -> Applied {
        debug!("didOpen {uri} (version {version}, {} bytes)", text.len());
        self.store.open_with(uri, text, version, |doc| Applied {
            version: doc.version,
            generation: doc.generation,
            published: self.diagnostics.refresh(doc),
        })
    }

    /// Applies a batch of changes in order, then republishes diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] if the document is not open,
    /// [`SyncError::StaleVersion`] if the version does not advance the
    /// document, or [`SyncError::InvalidEdit`] if any change in the batch is
    /// invalid. The document is unchanged on error.
    pub fn did_change(
        &self,
        uri: &DocumentUri,
        version: i32,
        changes: &[TextDocumentContentChangeEvent],
    ) -> Result<Applied, SyncError> {
        debug!("didChange {uri} (version {version}, {} changes)", changes.len());
        self.store
            .update(uri, |doc| {
                if self.options.reject_stale_versions && version <= doc.version {
                    return Err(SyncError::StaleVersion {
                        uri: uri.clone(),
                        current: doc.version,
                        received: version,
                    });
                }

                doc.text = apply_changes(&doc.text, changes, self.options.encoding).map_err(
                    |source| SyncError::InvalidEdit {
                        uri: uri.clone(),
                        source,
                    },
                )?;
                doc.version = version;
                doc.generation = self.store.next_generation();

                Ok(Applied {
                    version: doc.version,
                    generation: doc.generation,
                    published: self.diagnostics.refresh(doc),
                })
            })
            .inspect_err(|e| warn!("Rejected didChange: {e}"))
    }

    /// Closes a document.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] if the document is not open; closing
    /// twice is reported, never fatal.
    pub fn did_close(&self, uri: &DocumentUri) -> Result<(), SyncError> {
        debug!("didClose {uri}");
        self.store
            .close_with(uri, |doc| {
                if self.options.clear_diagnostics_on_close {
                    self.diagnostics.clear(doc.uri, self.store.next_generation());
                }
            })
            .inspect_err(|e| warn!("Rejected didClose: {e}"))
    }
}
