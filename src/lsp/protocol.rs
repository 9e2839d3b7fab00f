// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

use anyhow::{Context, Result, bail};
use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};

const HEADER_END: &[u8] = b"\r\n\r\n";

/// Largest message body accepted, in bytes.
pub const MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

fn default_null() -> serde_json::Value {
    serde_json::Value::Null
}

/// A client request; expects exactly one response.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RequestMessage {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Correlates the response.
    pub id: RequestId,
    /// LSP method name.
    pub method: String,
    /// Method payload.
    #[serde(default = "default_null")]
    pub params: serde_json::Value,
}

/// Reply to a [`RequestMessage`].
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponseMessage {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Id of the request being answered; `None` if it could not be read.
    pub id: Option<RequestId>,
    /// Result on success. `Some(Value::Null)` is sent as an explicit `null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl ResponseMessage {
    /// A successful response.
    #[must_use]
    pub fn success(id: RequestId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// An error response.
    #[must_use]
    pub fn failure(id: Option<RequestId>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(ResponseError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// A one-way message in either direction.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationMessage {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// LSP method name.
    pub method: String,
    /// Method payload.
    #[serde(default = "default_null")]
    pub params: serde_json::Value,
}

impl NotificationMessage {
    /// Builds a notification from a serializable payload.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` cannot be serialized.
    pub fn new<P: Serialize>(method: &str, params: P) -> Result<Self> {
        Ok(Self {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params: serde_json::to_value(params)?,
        })
    }
}

/// JSON-RPC request id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id.
    Number(i64),
    /// String id.
    String(String),
}

/// Error payload of a [`ResponseMessage`].
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponseError {
    /// JSON-RPC or LSP error code.
    pub code: i64,
    /// Human-readable description.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// An inbound message, classified by shape.
#[derive(Debug, Clone)]
pub enum Incoming {
    /// Has `method` and `id`.
    Request(RequestMessage),
    /// Has `method` but no `id`.
    Notification(NotificationMessage),
    /// Has `id` but no `method`.
    Response(ResponseMessage),
}

impl Incoming {
    /// Classifies an already-decoded message.
    ///
    /// # Errors
    ///
    /// Returns an error if the value matches no message shape.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let has_method = value.get("method").is_some();
        let has_id = value.get("id").is_some_and(|id| !id.is_null());

        let message = match (has_method, has_id) {
            (true, true) => Self::Request(serde_json::from_value(value)?),
            (true, false) => Self::Notification(serde_json::from_value(value)?),
            (false, true) => Self::Response(serde_json::from_value(value)?),
            (false, false) => bail!("Unknown message format"),
        };
        Ok(message)
    }
}

/// Helper to parse the Content-Length header and body from a buffer
///
/// Returns `Ok(None)` until a complete message is buffered.
///
/// # Errors
///
/// Returns an error for a header block without a valid `Content-Length`, a
/// length above [`MAX_CONTENT_LENGTH`], or a body that is not UTF-8. The
/// offending header block (and body, if read) is consumed from `buffer` so
/// that reading can continue with the next message.
pub fn try_parse_message(buffer: &mut BytesMut) -> Result<Option<String>> {
    let Some(header_len) = buffer
        .windows(HEADER_END.len())
        .position(|w| w == HEADER_END)
        .map(|i| i + HEADER_END.len())
    else {
        return Ok(None);
    };

    let content_len = match parse_content_length(&buffer[..header_len]) {
        Ok(len) => len,
        Err(e) => {
            buffer.advance(header_len);
            return Err(e);
        }
    };

    let Some(total_len) = header_len.checked_add(content_len) else {
        buffer.advance(header_len);
        bail!("Content-Length overflows: {content_len}");
    };
    if buffer.len() < total_len {
        return Ok(None);
    }

    buffer.advance(header_len);
    let message_bytes = buffer.split_to(content_len);
    let message = String::from_utf8(message_bytes.to_vec()).context("Message body is not UTF-8")?;
    Ok(Some(message))
}

fn parse_content_length(headers: &[u8]) -> Result<usize> {
    let headers = std::str::from_utf8(headers).context("Failed to parse headers as UTF-8")?;

    for line in headers.lines() {
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            let len = value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid Content-Length: {}", value.trim()))?;
            if len > MAX_CONTENT_LENGTH {
                bail!("Content-Length {len} exceeds the {MAX_CONTENT_LENGTH} byte limit");
            }
            return Ok(len);
        }
    }

    bail!("Missing Content-Length header")
}

/// Frames a message with its Content-Length header.
///
/// # Errors
///
/// Returns an error if `message` cannot be serialized.
pub fn encode_message<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_string(message)?;
    let mut framed = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
    framed.extend_from_slice(body.as_bytes());
    Ok(framed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_message() -> Result<()> {
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#;
        let raw = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        let mut buffer = BytesMut::from(raw.as_str());

        let result = try_parse_message(&mut buffer)?;
        assert_eq!(result, Some(body.to_string()));
        assert!(buffer.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_incomplete_header_and_body() -> Result<()> {
        let mut buffer = BytesMut::from("Content-Length: 10\r\n");
        assert_eq!(try_parse_message(&mut buffer)?, None);

        let mut buffer = BytesMut::from("Content-Length: 100\r\n\r\n{\"partial\":");
        assert_eq!(try_parse_message(&mut buffer)?, None);
        Ok(())
    }

    #[test]
    fn test_parse_multiple_messages_with_extra_headers() -> Result<()> {
        let body1 = r#"{"jsonrpc":"2.0","id":1}"#;
        let body2 = r#"{"jsonrpc":"2.0","id":2}"#;
        let raw = format!(
            "content-length: {}\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\n\r\n{}Content-Length: {}\r\n\r\n{}",
            body1.len(),
            body1,
            body2.len(),
            body2
        );
        let mut buffer = BytesMut::from(raw.as_str());

        assert_eq!(try_parse_message(&mut buffer)?, Some(body1.to_string()));
        assert_eq!(try_parse_message(&mut buffer)?, Some(body2.to_string()));
        assert!(buffer.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_content_length_is_skipped() -> Result<()> {
        let body = r#"{"jsonrpc":"2.0","method":"exit"}"#;
        let raw = format!(
            "X-Bogus: 1\r\n\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let mut buffer = BytesMut::from(raw.as_str());

        assert!(try_parse_message(&mut buffer).is_err());
        assert_eq!(try_parse_message(&mut buffer)?, Some(body.to_string()));
        Ok(())
    }

    #[test]
    fn test_oversized_content_length_is_skipped() -> Result<()> {
        let body = r#"{"jsonrpc":"2.0","method":"exit"}"#;
        let raw = format!(
            "Content-Length: 18446744073709551615\r\n\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let mut buffer = BytesMut::from(raw.as_str());

        assert!(try_parse_message(&mut buffer).is_err());
        assert_eq!(try_parse_message(&mut buffer)?, Some(body.to_string()));

        let raw = format!("Content-Length: {}\r\n\r\n", MAX_CONTENT_LENGTH + 1);
        let mut buffer = BytesMut::from(raw.as_str());
        assert!(try_parse_message(&mut buffer).is_err());
        assert!(buffer.is_empty());
        Ok(())
    }

    #[test]
    fn test_encode_frames_body() -> Result<()> {
        let response = ResponseMessage::success(RequestId::Number(7), serde_json::Value::Null);
        let framed = encode_message(&response)?;

        let mut buffer = BytesMut::from(framed.as_slice());
        let body = try_parse_message(&mut buffer)?;
        assert_eq!(body.as_deref(), Some(r#"{"jsonrpc":"2.0","id":7,"result":null}"#));
        Ok(())
    }

    fn classify(body: &str) -> Result<Incoming> {
        Incoming::from_value(serde_json::from_str(body)?)
    }

    #[test]
    fn test_classify_messages() -> Result<()> {
        let request = classify(r#"{"jsonrpc":"2.0","id":"abc-123","method":"shutdown"}"#)?;
        assert!(matches!(
            request,
            Incoming::Request(RequestMessage { id: RequestId::String(ref s), .. }) if s == "abc-123"
        ));

        let notification =
            classify(r#"{"jsonrpc":"2.0","method":"initialized","params":{}}"#)?;
        assert!(matches!(notification, Incoming::Notification(ref n) if n.method == "initialized"));

        let response = classify(r#"{"jsonrpc":"2.0","id":1,"result":null}"#)?;
        assert!(matches!(response, Incoming::Response(_)));

        assert!(classify(r#"{"jsonrpc":"2.0"}"#).is_err());
        Ok(())
    }

    #[test]
    fn test_failure_response_shape() -> Result<()> {
        let response = ResponseMessage::failure(None, -32700, "Parse error");
        let value = serde_json::to_value(&response)?;
        assert_eq!(value["id"], serde_json::Value::Null);
        assert_eq!(value["error"]["code"], -32700);
        assert!(value.get("result").is_none());
        Ok(())
    }
}
