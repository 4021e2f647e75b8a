//! JSON-RPC 2.0 Protocol Implementation for LSP
//!
//! Defines the message envelope exchanged with editors. Method payloads
//! live in `models::lsp`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LangError;

// ============================================================================
// JSON-RPC 2.0 Core Types
// ============================================================================

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<RequestId>, error: ResponseError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Value, ResponseError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// JSON-RPC 2.0 Notification (no id, no response expected)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

/// Request ID - can be number or string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(msg: &str) -> Self {
        Self::new(error_codes::PARSE_ERROR, format!("Parse error: {msg}"))
    }
}

impl std::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ResponseError {}

impl From<&LangError> for ResponseError {
    fn from(error: &LangError) -> Self {
        Self::new(error.error_code(), error.to_string())
    }
}

impl From<LangError> for ResponseError {
    fn from(error: LangError) -> Self {
        Self::from(&error)
    }
}

/// Standard JSON-RPC error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // LSP-specific error codes
    pub const SERVER_NOT_INITIALIZED: i32 = -32002;
    pub const REQUEST_CANCELLED: i32 = -32800;

    // Server-defined error codes
    pub const SERVER_ERROR: i32 = -32000;
    pub const SCHEMA_NOT_READY: i32 = -32001;
}

/// LSP method names handled by the server
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "initialized";
    pub const SHUTDOWN: &str = "shutdown";
    pub const EXIT: &str = "exit";
    pub const CANCEL_REQUEST: &str = "$/cancelRequest";
    pub const DID_OPEN: &str = "textDocument/didOpen";
    pub const DID_CHANGE: &str = "textDocument/didChange";
    pub const DID_CLOSE: &str = "textDocument/didClose";
    pub const COMPLETION: &str = "textDocument/completion";
    pub const DOCUMENT_SYMBOL: &str = "textDocument/documentSymbol";
}

/// Incoming message from the client
#[derive(Debug, Clone)]
pub enum Message {
    Response(Response),
    Request(Request),
    Notification(Notification),
}

impl Message {
    /// Parse a JSON string into a Message
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let has_id = value.get("id").is_some();
        let has_method = value.get("method").is_some();

        match (has_id, has_method) {
            (true, true) => Ok(Message::Request(serde_json::from_value(value)?)),
            (true, false) => Ok(Message::Response(serde_json::from_value(value)?)),
            (false, true) => Ok(Message::Notification(serde_json::from_value(value)?)),
            (false, false) => {
                use serde::de::Error;
                Err(serde_json::Error::custom("Invalid LSP message"))
            }
        }
    }

    /// Best-effort id recovery from a frame that failed to parse
    pub fn salvage_id(json: &str) -> Option<RequestId> {
        let value: serde_json::Value = serde_json::from_str(json).ok()?;
        serde_json::from_value(value.get("id")?.clone()).ok()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parsing() {
        let json = r#"{"jsonrpc":"2.0","id":7,"method":"textDocument/completion","params":{}}"#;
        match Message::parse(json).unwrap() {
            Message::Request(req) => {
                assert_eq!(req.id, RequestId::Number(7));
                assert_eq!(req.method, methods::COMPLETION);
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn test_notification_parsing() {
        let json = r#"{"jsonrpc":"2.0","method":"initialized","params":{}}"#;
        assert!(matches!(
            Message::parse(json).unwrap(),
            Message::Notification(n) if n.method == methods::INITIALIZED
        ));
    }

    #[test]
    fn test_string_request_id() {
        let json = r#"{"jsonrpc":"2.0","id":"abc","method":"shutdown"}"#;
        let Message::Request(req) = Message::parse(json).unwrap() else {
            panic!("expected request");
        };
        assert_eq!(req.id, RequestId::from("abc"));
    }

    #[test]
    fn test_error_response_serialization() {
        let resp = Response::error(
            Some(RequestId::Number(3)),
            LangError::schema_not_ready("/work").into(),
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["error"]["code"], error_codes::SCHEMA_NOT_READY);
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_null_id_for_unparseable_frame() {
        let resp = Response::error(None, ResponseError::parse_error("eof"));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"id\":null"));
    }

    #[test]
    fn test_salvage_id() {
        assert_eq!(
            Message::salvage_id(r#"{"id":4,"method":5}"#),
            Some(RequestId::Number(4))
        );
        assert_eq!(Message::salvage_id("not json"), None);
    }
}
