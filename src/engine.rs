// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Method-keyed entry points for document events and queries.
//!
//! The engine owns the shared [`DocumentStore`] and routes decoded LSP
//! payloads to the [`SyncController`] (events) or the position resolver
//! (queries). It has no knowledge of framing or the process lifecycle.

use std::sync::Arc;

use lsp_types::{
    CompletionItem, CompletionItemKind, CompletionList, CompletionParams, CompletionResponse,
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    Documentation, Hover, HoverContents, HoverParams, LanguageString, MarkedString, Position,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::analysis::Analyzer;
use crate::document::{DocumentStore, PositionEncoding, WordAt, word_at};
use crate::error::{INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND, SyncError};
use crate::sync::{Applied, DiagnosticsCoordinator, Publisher, SyncController, SyncOptions};
use crate::uri::DocumentUri;

/// Failure of a dispatched request or notification.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// No handler is registered for the method.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// The params did not decode into the method's payload type.
    #[error("invalid params for {method}: {source}")]
    InvalidParams {
        /// Method whose params were rejected.
        method: String,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },

    /// The event or query was rejected by the synchronization core.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The result could not be encoded.
    #[error("failed to encode result: {0}")]
    Encode(#[source] serde_json::Error),
}

impl HandlerError {
    /// Returns the JSON-RPC error code used when reporting this error.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::MethodNotFound(_) => METHOD_NOT_FOUND,
            Self::InvalidParams { .. } => INVALID_PARAMS,
            Self::Sync(e) => e.code(),
            Self::Encode(_) => INTERNAL_ERROR,
        }
    }
}

/// Document synchronization and query engine for one server instance.
#[derive(Debug)]
pub struct Engine {
    store: Arc<DocumentStore>,
    controller: SyncController,
    encoding: PositionEncoding,
}

impl Engine {
    /// Creates an engine with an empty store.
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        publisher: Arc<dyn Publisher>,
        options: SyncOptions,
    ) -> Self {
        let store = Arc::new(DocumentStore::new());
        let coordinator = DiagnosticsCoordinator::new(analyzer, publisher);
        Self {
            controller: SyncController::new(store.clone(), coordinator, options),
            store,
            encoding: options.encoding,
        }
    }

    /// Returns the shared document store.
    #[must_use]
    pub const fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Returns the position encoding used for every coordinate.
    #[must_use]
    pub const fn encoding(&self) -> PositionEncoding {
        self.encoding
    }

    /// Handles `textDocument/didOpen`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidUri`] if the URI is not a `file` URI.
    pub fn did_open(&self, params: DidOpenTextDocumentParams) -> Result<Applied, SyncError> {
        let item = params.text_document;
        let uri = DocumentUri::try_from(&item.uri)?;
        Ok(self.controller.did_open(uri, item.text, item.version))
    }

    /// Handles `textDocument/didChange`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is invalid or the controller rejects the
    /// change; the store is unchanged in that case.
    pub fn did_change(&self, params: DidChangeTextDocumentParams) -> Result<Applied, SyncError> {
        let uri = DocumentUri::try_from(&params.text_document.uri)?;
        self.controller
            .did_change(&uri, params.text_document.version, &params.content_changes)
    }

    /// Handles `textDocument/didClose`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is invalid or the document is not open.
    pub fn did_close(&self, params: DidCloseTextDocumentParams) -> Result<(), SyncError> {
        let uri = DocumentUri::try_from(&params.text_document.uri)?;
        self.controller.did_close(&uri)
    }

    /// Finds the word under `position` in an open document.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotOpen`] if the document is not open. A cursor
    /// outside the text or away from any word is `Ok(None)`.
    pub fn word_at(
        &self,
        uri: &DocumentUri,
        position: Position,
    ) -> Result<Option<WordAt>, SyncError> {
        self.store
            .read(uri, |doc| word_at(&doc.text, position, self.encoding))
    }

    /// Handles `textDocument/hover`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is invalid or the document is not open.
    pub fn hover(&self, params: HoverParams) -> Result<Option<Hover>, SyncError> {
        let position = params.text_document_position_params;
        let uri = DocumentUri::try_from(&position.text_document.uri)?;

        let Some(found) = self.word_at(&uri, position.position)? else {
            trace!("No word at {uri}:{:?}", position.position);
            return Ok(None);
        };

        Ok(Some(Hover {
            contents: HoverContents::Scalar(MarkedString::LanguageString(LanguageString {
                language: "plaintext".to_string(),
                value: format!("Information about: {}", found.word),
            })),
            range: Some(found.range),
        }))
    }

    /// Handles `textDocument/completion`.
    ///
    /// The list is static; only the URI is validated and the document need
    /// not be open.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidUri`] if the URI is not a `file` URI.
    pub fn completion(&self, params: CompletionParams) -> Result<CompletionResponse, SyncError> {
        DocumentUri::try_from(&params.text_document_position.text_document.uri)?;

        Ok(CompletionResponse::List(CompletionList {
            is_incomplete: false,
            items: vec![CompletionItem {
                label: "namespace".to_string(),
                kind: Some(CompletionItemKind::TEXT),
                detail: Some("Namespace of events".to_string()),
                documentation: Some(Documentation::String(
                    "https://ck3.paradoxwikis.com/Event_modding".to_string(),
                )),
                ..Default::default()
            }],
        }))
    }

    /// Dispatches a notification by method name.
    ///
    /// Unknown notifications are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the params do not decode or the event is rejected.
    pub fn handle_notification(&self, method: &str, params: Value) -> Result<(), HandlerError> {
        match method {
            "textDocument/didOpen" => {
                self.did_open(decode(method, params)?)?;
            }
            "textDocument/didChange" => {
                self.did_change(decode(method, params)?)?;
            }
            "textDocument/didClose" => {
                self.did_close(decode(method, params)?)?;
            }
            _ => debug!("Ignoring notification: {method}"),
        }
        Ok(())
    }

    /// Dispatches a request by method name and encodes its result.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::MethodNotFound`] for unknown methods, or an
    /// error if the params do not decode or the query is rejected.
    pub fn handle_request(&self, method: &str, params: Value) -> Result<Value, HandlerError> {
        match method {
            "textDocument/hover" => encode(self.hover(decode(method, params)?)?),
            "textDocument/completion" => encode(self.completion(decode(method, params)?)?),
            _ => Err(HandlerError::MethodNotFound(method.to_string())),
        }
    }
}

fn decode<T: DeserializeOwned>(method: &str, params: Value) -> Result<T, HandlerError> {
    serde_json::from_value(params).map_err(|source| HandlerError::InvalidParams {
        method: method.to_string(),
        source,
    })
}

fn encode<T: serde::Serialize>(result: T) -> Result<Value, HandlerError> {
    serde_json::to_value(result).map_err(HandlerError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::NullAnalyzer;
    use crate::error::REQUEST_FAILED;
    use crate::sync::{PublishQueue, publish_channel};
    use anyhow::Result;
    use serde_json::json;

    fn engine() -> (Engine, PublishQueue) {
        let (publisher, queue) = publish_channel();
        let engine = Engine::new(
            Arc::new(NullAnalyzer),
            Arc::new(publisher),
            SyncOptions::default(),
        );
        (engine, queue)
    }

    fn open(engine: &Engine, uri: &str, text: &str) -> Result<()> {
        engine.handle_notification(
            "textDocument/didOpen",
            json!({
                "textDocument": {
                    "uri": uri,
                    "languageId": "paradox",
                    "version": 1,
                    "text": text,
                }
            }),
        )?;
        Ok(())
    }

    fn hover(engine: &Engine, uri: &str, line: u32, character: u32) -> Result<Value, HandlerError> {
        engine.handle_request(
            "textDocument/hover",
            json!({
                "textDocument": { "uri": uri },
                "position": { "line": line, "character": character },
            }),
        )
    }

    #[test]
    fn test_hover_word_under_cursor() -> Result<()> {
        let (engine, _queue) = engine();
        open(&engine, "file:///a.ck3", "foo bar\n")?;

        let result = hover(&engine, "file:///a.ck3", 0, 2)?;
        assert_eq!(result["contents"]["language"], "plaintext");
        assert_eq!(result["contents"]["value"], "Information about: foo");
        assert_eq!(result["range"]["start"]["character"], 0);
        assert_eq!(result["range"]["end"]["character"], 3);
        Ok(())
    }

    #[test]
    fn test_hover_past_end_is_empty() -> Result<()> {
        let (engine, _queue) = engine();
        open(&engine, "file:///a.ck3", "one\ntwo")?;

        assert_eq!(hover(&engine, "file:///a.ck3", 5, 0)?, Value::Null);
        assert_eq!(hover(&engine, "file:///a.ck3", 0, 10)?, Value::Null);
        assert_eq!(
            hover(&engine, "file:///a.ck3", 0, 3)?["contents"]["value"],
            "Information about: one"
        );
        Ok(())
    }

    #[test]
    fn test_hover_unopened_document_fails() {
        let (engine, _queue) = engine();
        let err = hover(&engine, "file:///missing.ck3", 0, 0);
        assert!(matches!(err, Err(HandlerError::Sync(SyncError::NotOpen(_)))));
        assert_eq!(err.map_err(|e| e.code()), Err(REQUEST_FAILED));
    }

    #[test]
    fn test_completion_does_not_require_open_document() -> Result<()> {
        let (engine, _queue) = engine();
        let result = engine.handle_request(
            "textDocument/completion",
            json!({
                "textDocument": { "uri": "file:///never-opened.ck3" },
                "position": { "line": 0, "character": 0 },
            }),
        )?;

        assert_eq!(result["isIncomplete"], false);
        assert_eq!(result["items"][0]["label"], "namespace");
        assert_eq!(result["items"][0]["detail"], "Namespace of events");
        Ok(())
    }

    #[test]
    fn test_non_file_uri_rejected_as_invalid_params() {
        let (engine, mut queue) = engine();
        let err = open(&engine, "untitled:Untitled-1", "x");
        assert!(err.is_err());
        assert!(engine.store().is_empty());
        assert!(queue.try_recv().is_none());
    }

    #[test]
    fn test_malformed_params_and_unknown_methods() {
        let (engine, _queue) = engine();

        let err = engine.handle_notification("textDocument/didOpen", json!({ "bogus": true }));
        assert!(matches!(err, Err(HandlerError::InvalidParams { .. })));
        assert_eq!(err.map_err(|e| e.code()), Err(INVALID_PARAMS));

        let err = engine.handle_request("textDocument/definition", Value::Null);
        assert_eq!(err.map_err(|e| e.code()), Err(METHOD_NOT_FOUND));

        assert!(engine.handle_notification("$/cancelRequest", json!({ "id": 1 })).is_ok());
    }
}
