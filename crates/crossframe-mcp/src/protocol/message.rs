//! Wire Message Union and the Protocol-Tag Guard
//!
//! The eight protocol records as one tagged union, plus the single
//! classification point through which every inbound host record passes.
//! Nothing else in the crate inspects the `type` string: code either holds
//! a [`WireMessage`] variant or it holds nothing.
//!
//! Classification outcomes mirror the acceptance rules of the protocol:
//! records whose tag does not begin `MCP_` are foreign page noise and are
//! ignored; records inside the namespace that fail to decode are malformed
//! and likewise dropped (with a warning) rather than closing the channel.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Layer 3: Internal module imports
use super::constants::{tags, PROTOCOL_TAG_PREFIX};
use super::jsonrpc::JsonRpcMessage;
use super::types::{
    Phase, ProtocolVersion, SessionId, SetupError, SetupRequired, SetupStatus, TransportVisibility,
};

/// Inner → Outer: opens the setup phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupHandshake {
    pub protocol_version: ProtocolVersion,
    pub requires_visible_setup: bool,
}

/// Outer → Inner: answers the setup handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupHandshakeReply {
    pub protocol_version: ProtocolVersion,
    pub session_id: SessionId,
}

/// Inner → Outer: terminates the setup phase.
///
/// On `status: success` the title and visibility fields are expected; on
/// `status: error` the `error` field carries the failure detail. Absent
/// optional fields are omitted from the wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupComplete {
    pub status: SetupStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_visibility: Option<TransportVisibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SetupError>,
}

/// Inner → Outer: opens the transport phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportHandshake {
    pub protocol_version: ProtocolVersion,
}

/// Outer → Inner: answers the transport handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportHandshakeReply {
    pub protocol_version: ProtocolVersion,
    pub session_id: SessionId,
}

/// Inner → Outer: acknowledges the session id, completing the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportAccepted {
    pub session_id: SessionId,
}

/// Bidirectional: one opaque JSON-RPC 2.0 envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpPayload {
    pub payload: JsonRpcMessage,
}

/// Every record of the cross-window wire protocol.
///
/// Serialized with an internal `type` tag in the `MCP_*` namespace; field
/// names are camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    #[serde(rename = "MCP_SETUP_HANDSHAKE")]
    SetupHandshake(SetupHandshake),
    #[serde(rename = "MCP_SETUP_HANDSHAKE_REPLY")]
    SetupHandshakeReply(SetupHandshakeReply),
    #[serde(rename = "MCP_SETUP_COMPLETE")]
    SetupComplete(SetupComplete),
    #[serde(rename = "MCP_TRANSPORT_HANDSHAKE")]
    TransportHandshake(TransportHandshake),
    #[serde(rename = "MCP_TRANSPORT_HANDSHAKE_REPLY")]
    TransportHandshakeReply(TransportHandshakeReply),
    #[serde(rename = "MCP_TRANSPORT_ACCEPTED")]
    TransportAccepted(TransportAccepted),
    #[serde(rename = "MCP_MESSAGE")]
    Mcp(McpPayload),
    #[serde(rename = "MCP_SETUP_REQUIRED")]
    SetupRequired(SetupRequired),
}

impl WireMessage {
    /// Wrap a JSON-RPC envelope for the wire.
    pub fn mcp(payload: JsonRpcMessage) -> Self {
        WireMessage::Mcp(McpPayload { payload })
    }

    /// The wire tag of this record.
    pub fn tag(&self) -> &'static str {
        match self {
            WireMessage::SetupHandshake(_) => tags::SETUP_HANDSHAKE,
            WireMessage::SetupHandshakeReply(_) => tags::SETUP_HANDSHAKE_REPLY,
            WireMessage::SetupComplete(_) => tags::SETUP_COMPLETE,
            WireMessage::TransportHandshake(_) => tags::TRANSPORT_HANDSHAKE,
            WireMessage::TransportHandshakeReply(_) => tags::TRANSPORT_HANDSHAKE_REPLY,
            WireMessage::TransportAccepted(_) => tags::TRANSPORT_ACCEPTED,
            WireMessage::Mcp(_) => tags::MCP_MESSAGE,
            WireMessage::SetupRequired(_) => tags::SETUP_REQUIRED,
        }
    }

    /// The phase this record belongs to.
    ///
    /// `MCP_SETUP_REQUIRED` is a transport-phase record despite its name:
    /// it is legal only on a connected channel, never during setup.
    pub fn phase(&self) -> Phase {
        match self {
            WireMessage::SetupHandshake(_)
            | WireMessage::SetupHandshakeReply(_)
            | WireMessage::SetupComplete(_) => Phase::Setup,
            WireMessage::TransportHandshake(_)
            | WireMessage::TransportHandshakeReply(_)
            | WireMessage::TransportAccepted(_)
            | WireMessage::Mcp(_)
            | WireMessage::SetupRequired(_) => Phase::Transport,
        }
    }
}

/// Outcome of classifying one raw host record.
#[derive(Debug)]
pub enum Classified {
    /// A well-formed protocol record.
    Message(WireMessage),
    /// Inside the `MCP_` namespace but undecodable; dropped with a warning.
    Malformed { tag: String, detail: String },
    /// Not a protocol record at all; ignored silently.
    Foreign,
}

impl Classified {
    /// Classify one raw record received from the host channel.
    ///
    /// This is the only place the `type` string is inspected.
    pub fn from_value(value: Value) -> Self {
        let Some(tag) = value.get("type").and_then(Value::as_str) else {
            return Classified::Foreign;
        };
        if !tag.starts_with(PROTOCOL_TAG_PREFIX) {
            return Classified::Foreign;
        }
        let tag = tag.to_string();
        match serde_json::from_value::<WireMessage>(value) {
            Ok(message) => Classified::Message(message),
            Err(error) => Classified::Malformed {
                tag,
                detail: error.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{ReSetupReason, SetupErrorCode, VisibilityRequirement};
    use serde_json::json;

    #[test]
    fn setup_handshake_wire_form() {
        let message = WireMessage::SetupHandshake(SetupHandshake {
            protocol_version: ProtocolVersion::current(),
            requires_visible_setup: true,
        });
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["type"], "MCP_SETUP_HANDSHAKE");
        assert_eq!(value["protocolVersion"], "1.0");
        assert_eq!(value["requiresVisibleSetup"], true);
    }

    #[test]
    fn reply_and_accepted_carry_session_id() {
        let reply = WireMessage::TransportHandshakeReply(TransportHandshakeReply {
            protocol_version: ProtocolVersion::current(),
            session_id: SessionId::new("S1"),
        });
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["type"], "MCP_TRANSPORT_HANDSHAKE_REPLY");
        assert_eq!(value["sessionId"], "S1");

        let accepted = WireMessage::TransportAccepted(TransportAccepted {
            session_id: SessionId::new("S1"),
        });
        let value = serde_json::to_value(&accepted).unwrap();
        assert_eq!(value["type"], "MCP_TRANSPORT_ACCEPTED");
        assert_eq!(value["sessionId"], "S1");
    }

    #[test]
    fn setup_complete_round_trip() {
        let wire = json!({
            "type": "MCP_SETUP_COMPLETE",
            "status": "success",
            "serverTitle": "Demo",
            "transportVisibility": {"requirement": "hidden"},
        });
        let Classified::Message(WireMessage::SetupComplete(complete)) =
            Classified::from_value(wire)
        else {
            panic!("expected a setup completion");
        };
        assert_eq!(complete.status, SetupStatus::Success);
        assert_eq!(complete.server_title.as_deref(), Some("Demo"));
        assert_eq!(
            complete.transport_visibility.unwrap().requirement,
            VisibilityRequirement::Hidden
        );
        assert!(complete.error.is_none());
    }

    #[test]
    fn setup_complete_error_carries_code() {
        let wire = json!({
            "type": "MCP_SETUP_COMPLETE",
            "status": "error",
            "error": {"code": "USER_CANCELLED", "message": "closed dialog"},
        });
        let Classified::Message(WireMessage::SetupComplete(complete)) =
            Classified::from_value(wire)
        else {
            panic!("expected a setup completion");
        };
        assert_eq!(complete.status, SetupStatus::Error);
        assert_eq!(
            complete.error.unwrap().code,
            SetupErrorCode::UserCancelled
        );
    }

    #[test]
    fn mcp_message_payload_is_json_rpc() {
        let message = WireMessage::mcp(JsonRpcMessage::new_request("ping", None, json!(1)));
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["type"], "MCP_MESSAGE");
        assert_eq!(value["payload"]["jsonrpc"], "2.0");
        assert_eq!(value["payload"]["method"], "ping");
    }

    #[test]
    fn setup_required_is_a_transport_phase_record() {
        let message = WireMessage::SetupRequired(SetupRequired {
            reason: ReSetupReason::AuthExpired,
            message: "token expired".into(),
            can_continue: false,
        });
        assert_eq!(message.phase(), Phase::Transport);
        assert_eq!(message.tag(), "MCP_SETUP_REQUIRED");
    }

    #[test]
    fn classify_ignores_foreign_records() {
        assert!(matches!(
            Classified::from_value(json!({"source": "react-devtools", "payload": {}})),
            Classified::Foreign
        ));
        assert!(matches!(
            Classified::from_value(json!({"type": "WEBPACK_OK"})),
            Classified::Foreign
        ));
        assert!(matches!(Classified::from_value(json!(42)), Classified::Foreign));
    }

    #[test]
    fn classify_flags_malformed_namespace_records() {
        // Unknown tag inside the namespace.
        assert!(matches!(
            Classified::from_value(json!({"type": "MCP_FUTURE_RECORD"})),
            Classified::Malformed { .. }
        ));
        // Known tag with a missing required field.
        assert!(matches!(
            Classified::from_value(json!({"type": "MCP_TRANSPORT_ACCEPTED"})),
            Classified::Malformed { .. }
        ));
    }

    #[test]
    fn classify_accepts_every_tag() {
        let samples = [
            json!({"type": "MCP_SETUP_HANDSHAKE", "protocolVersion": "1.0", "requiresVisibleSetup": false}),
            json!({"type": "MCP_SETUP_HANDSHAKE_REPLY", "protocolVersion": "1.0", "sessionId": "S1"}),
            json!({"type": "MCP_SETUP_COMPLETE", "status": "success"}),
            json!({"type": "MCP_TRANSPORT_HANDSHAKE", "protocolVersion": "1.0"}),
            json!({"type": "MCP_TRANSPORT_HANDSHAKE_REPLY", "protocolVersion": "1.0", "sessionId": "S1"}),
            json!({"type": "MCP_TRANSPORT_ACCEPTED", "sessionId": "S1"}),
            json!({"type": "MCP_MESSAGE", "payload": {"jsonrpc": "2.0", "method": "ping", "id": 1}}),
            json!({"type": "MCP_SETUP_REQUIRED", "reason": "OTHER", "message": "m", "canContinue": true}),
        ];
        for sample in samples {
            let tag = sample["type"].as_str().unwrap().to_string();
            match Classified::from_value(sample) {
                Classified::Message(message) => assert_eq!(message.tag(), tag),
                other => panic!("{tag} did not classify as a message: {other:?}"),
            }
        }
    }
}
