// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! End-to-end tests driving the gock3-lsp binary over stdio.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "tests fail loudly on unexpected errors"
)]

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};

use serde_json::{Value, json};

/// Helper to spawn the server with framed stdio
struct ServerProcess {
    child: std::process::Child,
    stdin: Option<std::process::ChildStdin>,
    stdout: BufReader<std::process::ChildStdout>,
    _config: tempfile::NamedTempFile,
}

impl ServerProcess {
    fn spawn() -> Self {
        let config = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("Failed to create config file");

        let mut child = Command::new(env!("CARGO_BIN_EXE_gock3-lsp"))
            .arg("--stdio")
            .arg("--config")
            .arg(config.path())
            .env("RUST_LOG", "gock3_lsp=debug")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn server");

        let stdin = child.stdin.take().expect("Failed to get stdin");
        let stdout = BufReader::new(child.stdout.take().expect("Failed to get stdout"));

        Self {
            child,
            stdin: Some(stdin),
            stdout,
            _config: config,
        }
    }

    fn send(&mut self, message: &Value) {
        let body = serde_json::to_string(message).unwrap();
        let stdin = self.stdin.as_mut().expect("stdin closed");
        write!(stdin, "Content-Length: {}\r\n\r\n{}", body.len(), body)
            .expect("Failed to write to stdin");
        stdin.flush().expect("Failed to flush stdin");
    }

    fn recv(&mut self) -> Value {
        let mut content_length = None;
        loop {
            let mut line = String::new();
            let n = self
                .stdout
                .read_line(&mut line)
                .expect("Failed to read header");
            assert!(n > 0, "server closed stdout");

            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':')
                && name.eq_ignore_ascii_case("content-length")
            {
                content_length = Some(value.trim().parse::<usize>().unwrap());
            }
        }

        let mut body = vec![0; content_length.expect("missing Content-Length")];
        self.stdout
            .read_exact(&mut body)
            .expect("Failed to read body");
        serde_json::from_slice(&body).expect("Failed to parse JSON message")
    }

    /// Reads until the response for `id`, returning it and everything before it.
    fn response(&mut self, id: i64) -> (Value, Vec<Value>) {
        let mut others = Vec::new();
        loop {
            let message = self.recv();
            if message["id"] == id {
                return (message, others);
            }
            others.push(message);
        }
    }

    fn initialize(&mut self) -> Value {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "processId": null,
                "clientInfo": { "name": "integration-test" },
                "capabilities": {}
            }
        }));
        let (response, _) = self.response(1);
        self.send(&json!({ "jsonrpc": "2.0", "method": "initialized", "params": {} }));
        response
    }

    fn exit_code(mut self) -> Option<i32> {
        drop(self.stdin.take());
        self.child.wait().expect("Failed to wait for server").code()
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

#[test]
fn test_initialize_advertises_capabilities() {
    let mut server = ServerProcess::spawn();
    let response = server.initialize();

    let capabilities = &response["result"]["capabilities"];
    assert_eq!(capabilities["positionEncoding"], "utf-16");
    assert_eq!(capabilities["textDocumentSync"]["change"], 2);
    assert_eq!(capabilities["hoverProvider"], true);
    assert_eq!(response["result"]["serverInfo"]["name"], "gock3-lsp");
}

#[test]
fn test_open_change_hover_close() {
    let mut server = ServerProcess::spawn();
    server.initialize();

    server.send(&json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didOpen",
        "params": { "textDocument": {
            "uri": "file:///mod/events/test.txt",
            "languageId": "paradox",
            "version": 1,
            "text": "namespace = test\ntest.0001 = {\n"
        }}
    }));
    let published = server.recv();
    assert_eq!(published["method"], "textDocument/publishDiagnostics");
    assert_eq!(published["params"]["version"], 1);
    assert_eq!(published["params"]["diagnostics"][0]["source"], "gock3");
    assert_eq!(published["params"]["diagnostics"][0]["range"]["start"]["line"], 1);

    server.send(&json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didChange",
        "params": {
            "textDocument": { "uri": "file:///mod/events/test.txt", "version": 2 },
            "contentChanges": [{
                "range": { "start": { "line": 2, "character": 0 }, "end": { "line": 2, "character": 0 } },
                "text": "}\n"
            }]
        }
    }));
    let published = server.recv();
    assert_eq!(published["params"]["version"], 2);
    assert_eq!(published["params"]["diagnostics"], json!([]));

    server.send(&json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "textDocument/hover",
        "params": {
            "textDocument": { "uri": "file:///mod/events/test.txt" },
            "position": { "line": 0, "character": 3 }
        }
    }));
    let (response, _) = server.response(2);
    assert_eq!(
        response["result"]["contents"]["value"],
        "Information about: namespace"
    );

    server.send(&json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "textDocument/completion",
        "params": {
            "textDocument": { "uri": "file:///mod/events/test.txt" },
            "position": { "line": 0, "character": 0 }
        }
    }));
    let (response, _) = server.response(3);
    assert_eq!(response["result"]["items"][0]["label"], "namespace");

    server.send(&json!({
        "jsonrpc": "2.0",
        "method": "textDocument/didClose",
        "params": { "textDocument": { "uri": "file:///mod/events/test.txt" } }
    }));
    let cleared = server.recv();
    assert_eq!(cleared["method"], "textDocument/publishDiagnostics");
    assert_eq!(cleared["params"]["diagnostics"], json!([]));

    server.send(&json!({ "jsonrpc": "2.0", "id": 4, "method": "shutdown" }));
    let (response, _) = server.response(4);
    assert_eq!(response["result"], Value::Null);

    server.send(&json!({ "jsonrpc": "2.0", "method": "exit" }));
    assert_eq!(server.exit_code(), Some(0));
}

#[test]
fn test_hover_on_unopened_document_fails() {
    let mut server = ServerProcess::spawn();
    server.initialize();

    server.send(&json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "textDocument/hover",
        "params": {
            "textDocument": { "uri": "file:///nowhere.txt" },
            "position": { "line": 0, "character": 0 }
        }
    }));
    let (response, _) = server.response(2);
    assert_eq!(response["error"]["code"], -32803);

    server.send(&json!({ "jsonrpc": "2.0", "id": 3, "method": "workspace/symbol", "params": {} }));
    let (response, _) = server.response(3);
    assert_eq!(response["error"]["code"], -32601);
}

#[test]
fn test_exit_without_shutdown_is_an_error() {
    let mut server = ServerProcess::spawn();
    server.initialize();

    server.send(&json!({ "jsonrpc": "2.0", "method": "exit" }));
    assert_eq!(server.exit_code(), Some(1));
}

#[test]
fn test_version_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_gock3-lsp"))
        .arg("--version")
        .output()
        .expect("Failed to run gock3-lsp --version");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("gock3-lsp "), "unexpected: {stdout}");
}
