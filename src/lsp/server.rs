// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Stdio language server: message loop, lifecycle and outbound traffic.
//!
//! Task layout:
//! - the reader loop (the caller's task) handles notifications inline, so
//!   document events apply in arrival order;
//! - each request runs on its own spawned task;
//! - one writer task owns the output stream;
//! - one forwarder task turns queued publications into
//!   `textDocument/publishDiagnostics` notifications.

use std::ops::ControlFlow;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::BytesMut;
use lsp_types::{
    CompletionOptions, HoverProviderCapability, InitializeParams, InitializeResult,
    LogMessageParams, MessageType, PublishDiagnosticsParams, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions, Uri,
};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use super::protocol::{self, Incoming, NotificationMessage, RequestMessage, ResponseMessage};
use crate::config::Config;
use crate::document::PositionEncoding;
use crate::engine::Engine;
use crate::error::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, PARSE_ERROR, SERVER_NOT_INITIALIZED,
};
use crate::sync::{PublishQueue, publish_channel};

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "gock3-lsp";

type Outbox = mpsc::UnboundedSender<Vec<u8>>;

/// How the message loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// `exit` (or end of input) after a `shutdown` request.
    AfterShutdown,
    /// `exit` (or end of input) without a prior `shutdown` request.
    WithoutShutdown,
}

impl ExitReason {
    /// Process exit code: 0 after shutdown, 1 otherwise.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::AfterShutdown => 0,
            Self::WithoutShutdown => 1,
        }
    }
}

enum Phase {
    Uninitialized,
    Running(Arc<Engine>),
    ShuttingDown,
}

/// Serves the language server protocol over a pair of byte streams.
///
/// Returns once the client sends `exit` or closes `input`, after all
/// pending output has been written.
///
/// # Errors
///
/// Returns an error if reading `input` fails.
pub async fn run<R, W>(config: Config, input: R, output: W) -> Result<ExitReason>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbox, outgoing) = mpsc::unbounded_channel();
    let writer = tokio::spawn(writer_task(output, outgoing));

    let mut server = Server {
        config,
        outbox,
        phase: Phase::Uninitialized,
        shutdown_requested: false,
        forwarder: None,
    };
    let result = server.serve(input).await;
    server.finish(writer).await;
    result
}

struct Server {
    config: Config,
    outbox: Outbox,
    phase: Phase,
    shutdown_requested: bool,
    forwarder: Option<JoinHandle<()>>,
}

impl Server {
    async fn serve<R: AsyncRead + Unpin>(&mut self, mut input: R) -> Result<ExitReason> {
        let mut buffer = BytesMut::with_capacity(8192);

        loop {
            let n = input
                .read_buf(&mut buffer)
                .await
                .context("Failed to read from client")?;
            if n == 0 {
                info!("Client closed input");
                return Ok(self.exit_reason());
            }

            loop {
                let body = match protocol::try_parse_message(&mut buffer) {
                    Ok(Some(body)) => body,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Dropping malformed message: {e:#}");
                        continue;
                    }
                };
                trace!("Received message: {body}");

                if self.dispatch(&body).is_break() {
                    return Ok(self.exit_reason());
                }
            }
        }
    }

    const fn exit_reason(&self) -> ExitReason {
        if self.shutdown_requested {
            ExitReason::AfterShutdown
        } else {
            ExitReason::WithoutShutdown
        }
    }

    fn dispatch(&mut self, body: &str) -> ControlFlow<()> {
        let value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to parse JSON: {e}");
                send(
                    &self.outbox,
                    &ResponseMessage::failure(None, PARSE_ERROR, e.to_string()),
                );
                return ControlFlow::Continue(());
            }
        };

        match Incoming::from_value(value) {
            Ok(Incoming::Request(request)) => self.on_request(request),
            Ok(Incoming::Notification(notification)) => return self.on_notification(notification),
            Ok(Incoming::Response(response)) => {
                debug!("Ignoring client response: {:?}", response.id);
            }
            Err(e) => {
                warn!("Invalid message: {e:#}");
                send(
                    &self.outbox,
                    &ResponseMessage::failure(None, INVALID_REQUEST, format!("{e:#}")),
                );
            }
        }
        ControlFlow::Continue(())
    }

    fn on_request(&mut self, request: RequestMessage) {
        let RequestMessage {
            id, method, params, ..
        } = request;
        debug!("Request {method} (id: {id:?})");

        let engine = match (&self.phase, method.as_str()) {
            (Phase::Uninitialized, "initialize") => {
                let response = match serde_json::from_value::<InitializeParams>(params) {
                    Ok(params) => match serde_json::to_value(self.initialize(&params)) {
                        Ok(result) => ResponseMessage::success(id, result),
                        Err(e) => {
                            ResponseMessage::failure(Some(id), INTERNAL_ERROR, e.to_string())
                        }
                    },
                    Err(e) => ResponseMessage::failure(
                        Some(id),
                        INVALID_PARAMS,
                        format!("invalid params for initialize: {e}"),
                    ),
                };
                send(&self.outbox, &response);
                return;
            }
            (Phase::Uninitialized, _) => {
                send(
                    &self.outbox,
                    &ResponseMessage::failure(
                        Some(id),
                        SERVER_NOT_INITIALIZED,
                        "Server not initialized",
                    ),
                );
                return;
            }
            (_, "initialize") => {
                send(
                    &self.outbox,
                    &ResponseMessage::failure(Some(id), INVALID_REQUEST, "Server already initialized"),
                );
                return;
            }
            (Phase::ShuttingDown, _) => {
                send(
                    &self.outbox,
                    &ResponseMessage::failure(Some(id), INVALID_REQUEST, "Server is shutting down"),
                );
                return;
            }
            (Phase::Running(_), "shutdown") => {
                info!("Shutdown requested");
                self.phase = Phase::ShuttingDown;
                self.shutdown_requested = true;
                send(
                    &self.outbox,
                    &ResponseMessage::success(id, serde_json::Value::Null),
                );
                return;
            }
            (Phase::Running(engine), _) => Arc::clone(engine),
        };

        let outbox = self.outbox.clone();
        tokio::spawn(async move {
            let response = match engine.handle_request(&method, params) {
                Ok(result) => ResponseMessage::success(id, result),
                Err(e) => {
                    debug!("Request {method} failed: {e}");
                    ResponseMessage::failure(Some(id), e.code(), e.to_string())
                }
            };
            send(&outbox, &response);
        });
    }

    fn on_notification(&mut self, notification: NotificationMessage) -> ControlFlow<()> {
        match notification.method.as_str() {
            "exit" => {
                info!("Exit received");
                return ControlFlow::Break(());
            }
            "initialized" => info!("Client initialized"),
            method => match &self.phase {
                Phase::Running(engine) => {
                    if let Err(e) = engine.handle_notification(method, notification.params) {
                        warn!("{method} failed: {e}");
                        log_message(&self.outbox, MessageType::ERROR, format!("{method}: {e}"));
                    }
                }
                Phase::Uninitialized | Phase::ShuttingDown => {
                    debug!("Dropping notification outside running phase: {method}");
                }
            },
        }
        ControlFlow::Continue(())
    }

    fn initialize(&mut self, params: &InitializeParams) -> InitializeResult {
        if let Some(client) = &params.client_info {
            info!(
                "Client: {} {}",
                client.name,
                client.version.as_deref().unwrap_or("")
            );
        }

        let offered = params
            .capabilities
            .general
            .as_ref()
            .and_then(|general| general.position_encodings.as_deref());
        let encoding = PositionEncoding::negotiate(self.config.position_encoding, offered);

        let (publisher, queue) = publish_channel();
        let engine = Engine::new(
            self.config.analyzer.build(encoding),
            Arc::new(publisher),
            self.config.sync_options(encoding),
        );
        self.forwarder = Some(tokio::spawn(forward_diagnostics(
            queue,
            self.outbox.clone(),
        )));
        self.phase = Phase::Running(Arc::new(engine));

        info!(
            "Initialized (encoding: {:?}, analyzer: {:?})",
            encoding, self.config.analyzer
        );

        InitializeResult {
            capabilities: ServerCapabilities {
                position_encoding: Some(encoding.kind()),
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        ..Default::default()
                    },
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(self.config.trigger_characters.clone()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: SERVER_NAME.to_string(),
                version: Some(env!("GOCK3_VERSION").to_string()),
            }),
        }
    }

    /// Drops the engine, lets queued diagnostics drain and waits for the
    /// writer to flush everything.
    async fn finish(self, writer: JoinHandle<()>) {
        let Self {
            outbox,
            phase,
            forwarder,
            ..
        } = self;
        drop(phase);
        drop(outbox);

        if let Some(forwarder) = forwarder
            && let Err(e) = forwarder.await
        {
            warn!("Diagnostics forwarder failed: {e}");
        }
        if let Err(e) = writer.await {
            warn!("Writer task failed: {e}");
        }
    }
}

fn send<T: Serialize>(outbox: &Outbox, message: &T) {
    match protocol::encode_message(message) {
        Ok(frame) => {
            if outbox.send(frame).is_err() {
                debug!("Output closed; dropping message");
            }
        }
        Err(e) => error!("Failed to encode message: {e:#}"),
    }
}

fn log_message(outbox: &Outbox, typ: MessageType, message: String) {
    match NotificationMessage::new("window/logMessage", LogMessageParams { typ, message }) {
        Ok(notification) => send(outbox, &notification),
        Err(e) => error!("Failed to build logMessage: {e:#}"),
    }
}

async fn forward_diagnostics(mut queue: PublishQueue, outbox: Outbox) {
    while let Some(publication) = queue.recv().await {
        let uri: Uri = match publication.uri.as_str().parse() {
            Ok(uri) => uri,
            Err(e) => {
                warn!("Cannot publish diagnostics for {}: {e}", publication.uri);
                continue;
            }
        };

        let params =
            PublishDiagnosticsParams::new(uri, publication.diagnostics, publication.version);
        match NotificationMessage::new("textDocument/publishDiagnostics", params) {
            Ok(notification) => send(&outbox, &notification),
            Err(e) => error!("Failed to build publishDiagnostics: {e:#}"),
        }
    }
    debug!("Diagnostics forwarder exiting");
}

async fn writer_task<W: AsyncWrite + Unpin>(
    mut output: W,
    mut outgoing: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    while let Some(frame) = outgoing.recv().await {
        let written = async {
            output.write_all(&frame).await?;
            output.flush().await
        };
        if let Err(e) = written.await {
            error!("Failed to write to client: {e}");
            break;
        }
    }
}
