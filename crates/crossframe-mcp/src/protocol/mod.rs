//! Protocol Layer - Wire Schema, Types, and Errors
//!
//! Everything that defines the cross-window wire protocol independently of
//! how windows are created or messages delivered:
//!
//! - `constants`: tag namespace, version literals, handshake defaults
//! - `message`: the tagged [`WireMessage`] union and the classification guard
//! - `jsonrpc`: the flat JSON-RPC 2.0 envelope carried by `MCP_MESSAGE`
//! - `types`: versions, session ids, phases, setup outcome structures
//! - `origin`: origins, target origins, allowlists, the write-once pin
//! - `errors`: the [`TransportError`] taxonomy

// Module declarations (declarations only in mod.rs)
pub mod constants;
pub mod errors;
pub mod jsonrpc;
pub mod message;
pub mod origin;
pub mod types;

// Public re-exports (clean API surface)
pub use errors::{TransportError, TransportResult};
pub use jsonrpc::{JsonRpcError, JsonRpcMessage};
pub use message::{
    Classified, McpPayload, SetupComplete, SetupHandshake, SetupHandshakeReply, TransportAccepted,
    TransportHandshake, TransportHandshakeReply, WireMessage,
};
pub use origin::{AllowedOrigins, Origin, PinnedOrigin, TargetOrigin};
pub use types::{
    default_handshake_timeout, Phase, ProtocolVersion, ReSetupReason, SessionId, SetupError,
    SetupErrorCode, SetupRequired, SetupResult, SetupStatus, TransportVisibility, VersionRange,
    VisibilityRequirement,
};
