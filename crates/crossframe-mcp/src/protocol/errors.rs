//! Transport Error Taxonomy
//!
//! One error enum covers every failure the transport can surface to an
//! embedding layer. Conditions that are deliberately *not* surfaced (origin
//! drift after pinning, non-protocol records from co-tenant frames) have no
//! variant here: they are dropped at the window-control layer so that noisy
//! neighbours cannot break a legitimate session.
//!
//! Every surfaced error closes the container and unsubscribes listeners;
//! callers observe exactly one terminal outcome per started phase.

// Layer 1: Standard library imports
// (None required for current thiserror implementation)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use super::origin::Origin;
use super::types::{Phase, ProtocolVersion, SetupError, VersionRange};

/// Transport-level errors for the cross-window channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Peer advertised a protocol version outside the supported range.
    ///
    /// Raised before pinning; a rejected peer is never pinned.
    #[error("unsupported protocol version {advertised} (supported {supported})")]
    VersionMismatch {
        advertised: ProtocolVersion,
        supported: VersionRange,
    },

    /// First inbound message of a phase arrived from an origin outside the
    /// configured allowlist.
    #[error("origin {origin} is not in the allowed origin list")]
    OriginRejected { origin: Origin },

    /// Attempt to pin a second, different origin onto a write-once slot.
    #[error("origin already pinned to {pinned}, refusing {attempted}")]
    OriginConflict { pinned: Origin, attempted: Origin },

    /// A configured or reported origin string is not `scheme://host[:port]`.
    #[error("invalid origin: {value:?}")]
    InvalidOrigin { value: String },

    /// Wildcard targeting is permitted at most once per phase, only before
    /// the peer origin has been pinned.
    #[error("wildcard target origin is forbidden once the peer origin is pinned")]
    WildcardAfterPin,

    /// The phase timer expired with the handshake incomplete.
    #[error("{phase} handshake timed out after {timeout_ms}ms")]
    HandshakeTimeout { phase: Phase, timeout_ms: u64 },

    /// A well-formed protocol record arrived in a state that does not
    /// accept it.
    #[error("unexpected {tag} while in state {state}")]
    UnexpectedMessage {
        state: &'static str,
        tag: &'static str,
    },

    /// The inner endpoint reported that setup did not succeed.
    #[error("setup failed: {0}")]
    Setup(#[source] SetupError),

    /// The container was closed or navigated away while in use.
    #[error("peer window closed or navigated away")]
    PeerClosed,

    /// A caller-requested `close()` resolved an outstanding await.
    #[error("operation cancelled by local close")]
    Cancelled,

    /// The transport (or its window control) has already been closed.
    #[error("transport is closed")]
    Closed,

    /// Operation requires a connected transport-phase channel.
    #[error("transport is not connected")]
    NotConnected,

    /// An operation was invoked in a container bound to the other phase.
    #[error("{operation} is not available during the {phase} phase")]
    WrongPhase {
        operation: &'static str,
        phase: Phase,
    },

    /// A window/host operation (navigate, show, open) failed.
    #[error("window control error: {message}")]
    Frame { message: String },

    /// Locally supplied configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Wire record could not be serialized.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl TransportError {
    /// Create an unexpected-message error for a handshake state.
    pub fn unexpected(state: &'static str, tag: &'static str) -> Self {
        Self::UnexpectedMessage { state, tag }
    }

    /// Create a handshake timeout error.
    pub fn timeout(phase: Phase, timeout_ms: u64) -> Self {
        Self::HandshakeTimeout { phase, timeout_ms }
    }

    /// Create a window/host operation error.
    pub fn frame(message: impl Into<String>) -> Self {
        Self::Frame {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// True for terminal conditions that should not be retried on the same
    /// container (the container is gone or the transport object is spent).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PeerClosed | Self::Cancelled | Self::Closed | Self::HandshakeTimeout { .. }
        )
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
        }
    }
}

/// Convenient result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::SetupErrorCode;

    #[test]
    fn error_display_names_the_condition() {
        let err = TransportError::timeout(Phase::Setup, 30_000);
        assert_eq!(err.to_string(), "setup handshake timed out after 30000ms");

        let err = TransportError::unexpected("AwaitingComplete", "MCP_MESSAGE");
        assert_eq!(
            err.to_string(),
            "unexpected MCP_MESSAGE while in state AwaitingComplete"
        );
    }

    #[test]
    fn setup_failure_preserves_source() {
        let err = TransportError::Setup(SetupError {
            code: SetupErrorCode::UserCancelled,
            message: "user closed the dialog".into(),
        });
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("setup failed"));
    }

    #[test]
    fn terminal_classification() {
        assert!(TransportError::PeerClosed.is_terminal());
        assert!(TransportError::timeout(Phase::Transport, 0).is_terminal());
        assert!(!TransportError::NotConnected.is_terminal());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TransportError>();
    }
}
