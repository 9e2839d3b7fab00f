// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Diagnostics computation, caching and publication.
//!
//! The coordinator runs while the controller holds a document's exclusive
//! lock, so per-document publications are enqueued in apply order. Each
//! publication carries the document's generation; the delivery side drops
//! any publication older than one it has already delivered for the same URI.

use std::collections::HashMap;
use std::sync::Arc;

use lsp_types::Diagnostic;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::analysis::Analyzer;
use crate::document::Document;
use crate::uri::DocumentUri;

/// One outbound `textDocument/publishDiagnostics` notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    /// Document the diagnostics belong to.
    pub uri: DocumentUri,
    /// Version of the text the diagnostics were computed from. `None` when
    /// clearing a closed document.
    pub version: Option<i32>,
    /// The complete diagnostics list; empty clears the client's view.
    pub diagnostics: Vec<Diagnostic>,
    /// Generation of the document state the diagnostics describe.
    pub generation: u64,
}

/// Sink for outbound publications.
///
/// `publish` is fire-and-forget and must never block the editing path.
pub trait Publisher: Send + Sync {
    /// Enqueues a publication for delivery.
    fn publish(&self, publication: Publication);
}

/// Creates a publisher and the queue draining it.
#[must_use]
pub fn publish_channel() -> (ChannelPublisher, PublishQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ChannelPublisher { tx },
        PublishQueue {
            rx,
            delivered: HashMap::new(),
        },
    )
}

/// [`Publisher`] backed by an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<Publication>,
}

impl Publisher for ChannelPublisher {
    fn publish(&self, publication: Publication) {
        if self.tx.send(publication).is_err() {
            debug!("Publish queue closed; dropping diagnostics");
        }
    }
}

/// Receiving end of [`publish_channel`], enforcing most-recent-wins.
#[derive(Debug)]
pub struct PublishQueue {
    rx: mpsc::UnboundedReceiver<Publication>,
    delivered: HashMap<DocumentUri, u64>,
}

impl PublishQueue {
    /// Waits for the next publication that is not superseded.
    ///
    /// Returns `None` once every publisher has been dropped and the queue is
    /// drained.
    pub async fn recv(&mut self) -> Option<Publication> {
        loop {
            let publication = self.rx.recv().await?;
            if self.accept(&publication) {
                return Some(publication);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<Publication> {
        while let Ok(publication) = self.rx.try_recv() {
            if self.accept(&publication) {
                return Some(publication);
            }
        }
        None
    }

    fn accept(&mut self, publication: &Publication) -> bool {
        let last = self.delivered.entry(publication.uri.clone()).or_insert(0);
        if publication.generation < *last {
            debug!(
                "Dropping superseded diagnostics for {} (generation {} < {})",
                publication.uri, publication.generation, *last
            );
            return false;
        }
        *last = publication.generation;
        true
    }
}

/// Runs the analyzer and publishes its results.
#[derive(Clone)]
pub struct DiagnosticsCoordinator {
    analyzer: Arc<dyn Analyzer>,
    publisher: Arc<dyn Publisher>,
}

impl DiagnosticsCoordinator {
    /// Creates a coordinator.
    pub fn new(analyzer: Arc<dyn Analyzer>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            analyzer,
            publisher,
        }
    }

    /// Recomputes diagnostics for `doc`, caches them on it and publishes them
    /// exactly once.
    ///
    /// If the analyzer fails, the previously cached diagnostics are kept,
    /// nothing is published and `false` is returned.
    pub fn refresh(&self, doc: &mut Document) -> bool {
        match self.analyzer.validate(&doc.text) {
            Ok(diagnostics) => {
                debug!(
                    "Publishing {} diagnostics for {} (version {})",
                    diagnostics.len(),
                    doc.uri,
                    doc.version
                );
                doc.diagnostics = diagnostics;
                self.publisher.publish(Publication {
                    uri: doc.uri.clone(),
                    version: Some(doc.version),
                    diagnostics: doc.diagnostics.clone(),
                    generation: doc.generation,
                });
                true
            }
            Err(e) => {
                warn!(
                    "Keeping previous diagnostics for {} (version {}): {e}",
                    doc.uri, doc.version
                );
                false
            }
        }
    }

    /// Publishes an empty list for a document that has just been closed.
    pub fn clear(&self, uri: DocumentUri, generation: u64) {
        debug!("Clearing diagnostics for {uri}");
        self.publisher.publish(Publication {
            uri,
            version: None,
            diagnostics: Vec::new(),
            generation,
        });
    }
}

impl std::fmt::Debug for DiagnosticsCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticsCoordinator").finish_non_exhaustive()
    }
}
