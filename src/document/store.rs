// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Concurrent store of open documents.
//!
//! The URI map sits behind a read/write lock that is only held long enough to
//! look up, insert or remove a slot. Each document lives in its own slot with
//! its own read/write lock, so writers to different documents never contend
//! and readers of one document never block each other.
//!
//! Re-opening a URI installs a fresh slot and retires the old one. A handler
//! that fetched the old slot before the re-open sees it as closed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use lsp_types::Diagnostic;
use tracing::{debug, trace};

use crate::error::SyncError;
use crate::uri::DocumentUri;

/// An open document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The document's identifier.
    pub uri: DocumentUri,
    /// Full buffer content.
    pub text: String,
    /// Editor-supplied version of `text`.
    pub version: i32,
    /// Diagnostics most recently computed for `text`.
    pub diagnostics: Vec<Diagnostic>,
    /// Store-wide stamp of the edit that produced `text`.
    pub generation: u64,
}

/// Per-document slot. `retired` is set once the slot has been removed from
/// the map, by close or by re-open.
#[derive(Debug)]
struct Slot {
    document: Document,
    retired: bool,
}

type SharedSlot = Arc<RwLock<Slot>>;

/// Keyed container of open documents, shared by every handler.
#[derive(Debug, Default)]
pub struct DocumentStore {
    slots: RwLock<HashMap<DocumentUri, SharedSlot>>,
    generation: AtomicU64,
}

impl DocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next generation stamp. Stamps strictly increase across
    /// the whole store; allocate them while holding the document's lock so
    /// that per-document stamp order matches apply order.
    pub fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Opens (or re-opens) a document and runs `f` on it while holding its
    /// exclusive lock.
    ///
    /// Any previous slot for `uri` is retired before `f` runs, after every
    /// handler already inside it has finished. Work done by `f` is therefore
    /// ordered after all work on the previous incarnation of the document.
    pub fn open_with<R>(
        &self,
        uri: DocumentUri,
        text: String,
        version: i32,
        f: impl FnOnce(&mut Document) -> R,
    ) -> R {
        let slot: SharedSlot = Arc::new(RwLock::new(Slot {
            document: Document {
                uri: uri.clone(),
                text,
                version,
                diagnostics: Vec::new(),
                generation: 0,
            },
            retired: false,
        }));

        // Nothing else can reach the fresh slot until it is in the map.
        let mut guard = write_slot(&slot);
        let previous = self.write_map().insert(uri, slot.clone());

        if let Some(previous) = previous {
            debug!("Re-opening document: {}", guard.document.uri);
            write_slot(&previous).retired = true;
        } else {
            debug!("Opening document: {}", guard.document.uri);
        }

        // Stamped only now, so it orders after everything the retired slot did.
        guard.document.generation = self.next_generation();
        f(&mut guard.document)
    }

    /// Runs `f` on an open document while holding its exclusive lock.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] if the document is not open, or any
    /// error produced by `f`.
    pub fn update<R>(
        &self,
        uri: &DocumentUri,
        f: impl FnOnce(&mut Document) -> Result<R, SyncError>,
    ) -> Result<R, SyncError> {
        let slot = self.slot(uri)?;
        let mut guard = write_slot(&slot);
        if guard.retired {
            return Err(SyncError::NotOpen(uri.clone()));
        }
        f(&mut guard.document)
    }

    /// Closes a document and runs `f` on its final state while still holding
    /// its exclusive lock.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] if the document is not open.
    pub fn close_with<R>(
        &self,
        uri: &DocumentUri,
        f: impl FnOnce(Document) -> R,
    ) -> Result<R, SyncError> {
        let slot = self
            .write_map()
            .remove(uri)
            .ok_or_else(|| SyncError::NotOpen(uri.clone()))?;

        let mut guard = write_slot(&slot);
        guard.retired = true;
        debug!("Closing document: {uri}");
        Ok(f(guard.document.clone()))
    }

    /// Runs `f` on an open document while holding its shared lock.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] if the document is not open.
    pub fn read<R>(
        &self,
        uri: &DocumentUri,
        f: impl FnOnce(&Document) -> R,
    ) -> Result<R, SyncError> {
        let slot = self.slot(uri)?;
        let guard = read_slot(&slot);
        if guard.retired {
            return Err(SyncError::NotOpen(uri.clone()));
        }
        Ok(f(&guard.document))
    }

    /// Creates or overwrites a document.
    pub fn open(&self, uri: DocumentUri, text: String, version: i32) {
        self.open_with(uri, text, version, |_| ());
    }

    /// Returns a snapshot of an open document.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] if the document is not open.
    pub fn get(&self, uri: &DocumentUri) -> Result<Document, SyncError> {
        self.read(uri, Document::clone)
    }

    /// Removes a document.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] if the document was not open. The store
    /// is unchanged in that case.
    pub fn close(&self, uri: &DocumentUri) -> Result<(), SyncError> {
        self.close_with(uri, drop)
    }

    /// Atomically replaces a document's text and version.
    ///
    /// The cached diagnostics described the old text, so they are cleared.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] if the document is not open.
    pub fn replace_text(
        &self,
        uri: &DocumentUri,
        text: String,
        version: i32,
    ) -> Result<(), SyncError> {
        self.update(uri, |doc| {
            doc.text = text;
            doc.version = version;
            doc.diagnostics.clear();
            doc.generation = self.next_generation();
            Ok(())
        })
    }

    /// Whether `uri` is currently open.
    #[must_use]
    pub fn contains(&self, uri: &DocumentUri) -> bool {
        self.read_map().contains_key(uri)
    }

    /// Number of open documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    /// Whether no documents are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    /// URIs of all open documents, sorted.
    #[must_use]
    pub fn uris(&self) -> Vec<DocumentUri> {
        let mut uris: Vec<_> = self.read_map().keys().cloned().collect();
        uris.sort();
        uris
    }

    fn slot(&self, uri: &DocumentUri) -> Result<SharedSlot, SyncError> {
        let slot = self.read_map().get(uri).cloned();
        slot.ok_or_else(|| {
            trace!("Lookup for unopened document: {uri}");
            SyncError::NotOpen(uri.clone())
        })
    }

    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<DocumentUri, SharedSlot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<DocumentUri, SharedSlot>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_slot(slot: &SharedSlot) -> RwLockReadGuard<'_, Slot> {
    slot.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_slot(slot: &SharedSlot) -> RwLockWriteGuard<'_, Slot> {
    slot.write().unwrap_or_else(PoisonError::into_inner)
}
