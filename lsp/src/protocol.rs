//! LSP / JSON-RPC 2.0 message shapes, error codes, and method names.
//!
//! <https://microsoft.github.io/language-server-protocol/specifications/lsp/3.17/specification/>

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use hxlink_types::{Position, Range, Severity};

use crate::server::HandlerError;

// Standard JSON-RPC error codes.
pub const ERROR_PARSE: i64 = -32700;
pub const ERROR_INVALID_REQUEST: i64 = -32600;
pub const ERROR_METHOD_NOT_FOUND: i64 = -32601;
pub const ERROR_INVALID_PARAMS: i64 = -32602;
pub const ERROR_INTERNAL: i64 = -32603;

/// The closed set of methods this server understands.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "initialized";
    pub const SHUTDOWN: &str = "shutdown";
    pub const EXIT: &str = "exit";
    pub const CANCEL: &str = "$/cancelRequest";
    pub const DID_OPEN: &str = "textDocument/didOpen";
    pub const DID_CHANGE: &str = "textDocument/didChange";
    pub const DID_CLOSE: &str = "textDocument/didClose";
    pub const DID_SAVE: &str = "textDocument/didSave";
    pub const HOVER: &str = "textDocument/hover";
    pub const DIAGNOSTIC: &str = "textDocument/diagnostic";
}

/// An incoming JSON-RPC request or notification.
///
/// The protocol allows string ids; like the editors this server targets, we
/// only ever see integers, and notifications (no id) decode as 0.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: i64,
    pub method: String,
    pub params: Option<serde_json::Value>,
}

/// An outgoing JSON-RPC response.
///
/// `result` and `error` are always present on the wire (null when unset),
/// matching what the reference clients expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: i64,
    pub result: serde_json::Value,
    pub error: Option<ResponseError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
}

impl Response {
    #[must_use]
    pub fn ok(id: i64, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result,
            error: None,
        }
    }

    #[must_use]
    pub fn error(id: i64, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: serde_json::Value::Null,
            error: Some(ResponseError {
                code,
                message: message.into(),
            }),
        }
    }

    /// A success response whose result serializes from `value`.
    ///
    /// Serialization of our own response types cannot fail; an error here
    /// would be a programming bug, surfaced as an internal error response.
    #[must_use]
    pub fn from_value(id: i64, value: &impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(result) => Self::ok(id, result),
            Err(err) => Self::error(id, ERROR_INTERNAL, format!("encode error: {err}")),
        }
    }
}

/// Decode a request's params, mapping any failure to `InvalidParams`.
pub fn decode_params<T: DeserializeOwned>(req: &Request) -> Result<T, HandlerError> {
    let params = req.params.clone().ok_or(HandlerError::InvalidParams)?;
    serde_json::from_value(params).map_err(|_| HandlerError::InvalidParams)
}

/// Best-effort conversion of a document URI to a filesystem path.
///
/// Editors send `file://` URIs; anything that does not parse as one is
/// passed through untouched (the index keys documents by this string).
#[must_use]
pub fn document_path(uri: &str) -> String {
    if let Ok(parsed) = url::Url::parse(uri) {
        if let Ok(path) = parsed.to_file_path() {
            return path.to_string_lossy().into_owned();
        }
    }
    uri.to_string()
}

// ── lifecycle ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub root_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitializeResult {
    pub capabilities: ServerCapabilities,
}

pub const TEXT_DOCUMENT_SYNC_FULL: u8 = 1;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    pub text_document_sync: u8,
    pub hover_provider: bool,
    pub diagnostic_provider: DiagnosticOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticOptions {
    pub identifier: String,
    pub inter_file_dependencies: bool,
    pub workspace_diagnostics: bool,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            text_document_sync: TEXT_DOCUMENT_SYNC_FULL,
            hover_provider: true,
            diagnostic_provider: DiagnosticOptions {
                identifier: "hxlink".to_string(),
                inter_file_dependencies: true,
                workspace_diagnostics: false,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelParams {
    pub id: i64,
}

// ── text document ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct TextDocument {
    pub uri: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidOpenParams {
    pub text_document: TextDocument,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidChangeParams {
    pub text_document: TextDocument,
    #[serde(default)]
    pub content_changes: Vec<ContentChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentChange {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidCloseParams {
    pub text_document: TextDocument,
}

// ── hover ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoverParams {
    pub text_document: TextDocument,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct Hover {
    pub contents: MarkupContent,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkupContent {
    pub kind: String,
    pub value: String,
}

/// The reply for positions with nothing to show.
#[derive(Debug, Clone, Serialize)]
pub struct EmptyHover {
    pub contents: String,
}

impl Default for EmptyHover {
    fn default() -> Self {
        Self {
            contents: String::new(),
        }
    }
}

// ── diagnostics ────────────────────────────────────────────────────────

pub const DIAGNOSTIC_KIND_FULL: &str = "full";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticParams {
    pub text_document: TextDocument,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullDiagnosticReport {
    pub kind: String,
    pub items: Vec<LspDiagnostic>,
}

impl FullDiagnosticReport {
    #[must_use]
    pub fn new(items: Vec<LspDiagnostic>) -> Self {
        Self {
            kind: DIAGNOSTIC_KIND_FULL.to_string(),
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LspDiagnostic {
    pub range: Range,
    pub severity: Severity,
    pub source: String,
    pub message: String,
}
