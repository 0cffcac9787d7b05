//! Wire Protocol Constants
//!
//! Central definitions for the cross-window wire protocol: message type tags,
//! the protocol tag namespace, version literals, and handshake defaults.
//!
//! All tag strings are defined here and referenced through the typed
//! [`WireMessage`](crate::protocol::WireMessage) union; nothing outside the
//! single classification point in `protocol::message` inspects tag strings.

/// Namespace prefix shared by every protocol record.
///
/// Any inbound record whose `type` field does not begin with this prefix is
/// not part of the protocol and must be ignored without closing the channel.
pub const PROTOCOL_TAG_PREFIX: &str = "MCP_";

/// Message type tags as they appear on the wire.
pub mod tags {
    /// Inner → Outer: opens the setup phase.
    pub const SETUP_HANDSHAKE: &str = "MCP_SETUP_HANDSHAKE";

    /// Outer → Inner: answers the setup handshake, carries the session id.
    pub const SETUP_HANDSHAKE_REPLY: &str = "MCP_SETUP_HANDSHAKE_REPLY";

    /// Inner → Outer: terminates the setup phase with success or error.
    pub const SETUP_COMPLETE: &str = "MCP_SETUP_COMPLETE";

    /// Inner → Outer: opens the transport phase.
    pub const TRANSPORT_HANDSHAKE: &str = "MCP_TRANSPORT_HANDSHAKE";

    /// Outer → Inner: answers the transport handshake, carries the session id.
    pub const TRANSPORT_HANDSHAKE_REPLY: &str = "MCP_TRANSPORT_HANDSHAKE_REPLY";

    /// Inner → Outer: acknowledges the session id and completes the handshake.
    pub const TRANSPORT_ACCEPTED: &str = "MCP_TRANSPORT_ACCEPTED";

    /// Bidirectional: carries one opaque JSON-RPC 2.0 envelope.
    pub const MCP_MESSAGE: &str = "MCP_MESSAGE";

    /// Inner → Outer: mid-session request to re-run setup.
    pub const SETUP_REQUIRED: &str = "MCP_SETUP_REQUIRED";
}

/// Current (and only) wire protocol version.
pub const PROTOCOL_VERSION: &str = "1.0";

/// URL fragment that signals the setup phase to the inner window.
///
/// The container URL carries `#setup` iff the outer endpoint is running the
/// setup phase; any other fragment, or none, means transport phase.
pub const SETUP_FRAGMENT: &str = "setup";

/// Default per-phase handshake timeout in milliseconds.
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 30_000;
