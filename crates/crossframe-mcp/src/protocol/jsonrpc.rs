//! JSON-RPC 2.0 Envelope
//!
//! The flat JSON-RPC message shape carried opaquely inside `MCP_MESSAGE`
//! records: `{ jsonrpc: "2.0", id?, method?, params?, result?, error? }`.
//! The transport validates only this shape; request/response semantics
//! belong to the embedding MCP runtime on either side.
//!
//! # Examples
//!
//! ```rust
//! use crossframe_mcp::protocol::JsonRpcMessage;
//! use serde_json::json;
//!
//! let request = JsonRpcMessage::new_request("tools/list", None, json!(1));
//! assert!(request.is_request());
//!
//! let response = JsonRpcMessage::new_response(json!({"tools": []}), json!(1));
//! assert!(response.is_response());
//! ```

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Layer 3: Internal module imports
// (none)

/// One JSON-RPC 2.0 envelope: request, response, or notification.
///
/// The design is intentionally flat: the `id` field distinguishes requests
/// and responses (present) from notifications (absent), and `result`/`error`
/// distinguish responses from requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcMessage {
    /// Always `"2.0"`.
    pub jsonrpc: String,

    /// Correlation id; absent for notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Method name for requests and notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Parameters for requests and notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,

    /// Result of a successful response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error of a failed response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcMessage {
    /// Create a request message.
    pub fn new_request(method: impl Into<String>, params: Option<Value>, id: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            method: Some(method.into()),
            params,
            result: None,
            error: None,
        }
    }

    /// Create a success response message.
    pub fn new_response(result: Value, id: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response message.
    pub fn new_error(error: JsonRpcError, id: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            method: None,
            params: None,
            result: None,
            error: Some(error),
        }
    }

    /// Create a notification message.
    pub fn new_notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: Some(method.into()),
            params,
            result: None,
            error: None,
        }
    }

    /// True for request messages (method + id).
    pub fn is_request(&self) -> bool {
        self.method.is_some() && self.id.is_some()
    }

    /// True for response messages (id + result or error, no method).
    pub fn is_response(&self) -> bool {
        self.id.is_some() && self.method.is_none() && (self.result.is_some() || self.error.is_some())
    }

    /// True for notification messages (method, no id).
    pub fn is_notification(&self) -> bool {
        self.method.is_some() && self.id.is_none()
    }

    /// True for error responses.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize directly into a reusable buffer, avoiding the
    /// intermediate `String` of [`to_json`](Self::to_json).
    pub fn serialize_to_buffer(&self, buffer: &mut BytesMut) -> Result<(), serde_json::Error> {
        serde_json::to_writer(buffer.writer(), self)
    }

    /// Serialize to a frozen byte buffer.
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        let mut buffer = BytesMut::with_capacity(256);
        self.serialize_to_buffer(&mut buffer)?;
        Ok(buffer.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classification_predicates() {
        let request = JsonRpcMessage::new_request("ping", None, json!("r-1"));
        assert!(request.is_request());
        assert!(!request.is_response());
        assert!(!request.is_notification());

        let response = JsonRpcMessage::new_response(json!("pong"), json!("r-1"));
        assert!(response.is_response());
        assert!(!response.is_request());

        let notification = JsonRpcMessage::new_notification("progress", Some(json!({"pct": 50})));
        assert!(notification.is_notification());
        assert!(!notification.is_request());

        let error = JsonRpcMessage::new_error(
            JsonRpcError {
                code: -32601,
                message: "Method not found".into(),
                data: None,
            },
            json!(7),
        );
        assert!(error.is_response());
        assert!(error.is_error());
    }

    #[test]
    fn wire_shape_omits_absent_fields() {
        let notification = JsonRpcMessage::new_notification("initialized", None);
        let json = notification.to_json().unwrap();

        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""method":"initialized""#));
        assert!(!json.contains("id"));
        assert!(!json.contains("params"));
        assert!(!json.contains("result"));
    }

    #[test]
    fn round_trip_preserves_structure() {
        let original = JsonRpcMessage::new_request(
            "resources/read",
            Some(json!({"uri": "file:///tmp/notes.txt"})),
            json!(42),
        );
        let parsed = JsonRpcMessage::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn buffer_serialization_matches_string_form() {
        let message = JsonRpcMessage::new_response(json!({"ok": true}), json!("id-9"));
        let bytes = message.to_bytes().unwrap();
        assert_eq!(bytes, Bytes::from(message.to_json().unwrap()));
    }
}
