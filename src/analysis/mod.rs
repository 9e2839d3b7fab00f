// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! The analyzer capability: turns document text into diagnostics.
//!
//! The synchronization core only ever calls [`Analyzer::validate`]; a real
//! parser or linter can be dropped in without touching it.

mod brackets;

pub use brackets::BracketAnalyzer;

use std::sync::Arc;

use lsp_types::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::document::PositionEncoding;

/// Source tag attached to diagnostics produced by the built-in analyzers.
pub const DIAGNOSTIC_SOURCE: &str = "gock3";

/// A failed analysis run. Recoverable: the previous diagnostics stay cached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("analysis failed: {0}")]
pub struct AnalyzerError(pub String);

/// Produces diagnostics for a full document text.
///
/// Implementations must be deterministic for a given text and must not
/// block on I/O; they run while the document's lock is held.
pub trait Analyzer: Send + Sync {
    /// Validates `text` and returns its diagnostics in document order.
    ///
    /// # Errors
    ///
    /// Returns an [`AnalyzerError`] if the text could not be analyzed.
    fn validate(&self, text: &str) -> Result<Vec<Diagnostic>, AnalyzerError>;
}

/// Analyzer that never reports anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAnalyzer;

impl Analyzer for NullAnalyzer {
    fn validate(&self, _text: &str) -> Result<Vec<Diagnostic>, AnalyzerError> {
        Ok(Vec::new())
    }
}

/// Which built-in analyzer a server instance runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    /// [`NullAnalyzer`].
    None,
    /// [`BracketAnalyzer`].
    #[default]
    Brackets,
}

impl AnalyzerKind {
    /// Builds the analyzer, reporting ranges in `encoding`.
    #[must_use]
    pub fn build(self, encoding: PositionEncoding) -> Arc<dyn Analyzer> {
        match self {
            Self::None => Arc::new(NullAnalyzer),
            Self::Brackets => Arc::new(BracketAnalyzer::new(encoding)),
        }
    }
}
