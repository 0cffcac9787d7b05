//! Event-Driven Message Handling
//!
//! The embedding MCP runtime receives traffic through a [`MessageHandler`]
//! configured at transport construction, keeping transport (delivery) and
//! protocol (MCP semantics) concerns separate. Handlers are invoked from
//! the transport's single pump task, one event at a time, and each
//! invocation runs to completion before the next record is dispatched.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// Layer 3: Internal module imports
use crate::protocol::{JsonRpcMessage, Origin, SessionId, SetupRequired, TransportError};

/// Session and sender information delivered with each message.
#[derive(Debug, Clone)]
pub struct MessageContext {
    session_id: SessionId,
    peer_origin: Origin,
    received_at: DateTime<Utc>,
}

impl MessageContext {
    pub(crate) fn new(session_id: SessionId, peer_origin: Origin) -> Self {
        Self {
            session_id,
            peer_origin,
            received_at: Utc::now(),
        }
    }

    /// Session the message belongs to.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Pinned origin the message arrived from.
    pub fn peer_origin(&self) -> &Origin {
        &self.peer_origin
    }

    /// When the transport accepted the message.
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

/// Event-driven sink for a connected channel.
///
/// # Examples
///
/// ```rust
/// use crossframe_mcp::protocol::{JsonRpcMessage, TransportError};
/// use crossframe_mcp::transport::{MessageContext, MessageHandler};
/// use async_trait::async_trait;
///
/// struct LoggingRuntime;
///
/// #[async_trait]
/// impl MessageHandler for LoggingRuntime {
///     async fn handle_message(&self, message: JsonRpcMessage, context: MessageContext) {
///         println!("{} sent {:?}", context.peer_origin(), message.method);
///     }
///
///     async fn handle_error(&self, error: TransportError) {
///         eprintln!("channel error: {error}");
///     }
///
///     async fn handle_close(&self) {
///         println!("channel closed");
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// One inbound JSON-RPC envelope from the connected peer.
    ///
    /// Never invoked before the transport reaches `Connected` nor after it
    /// reaches `Closed`.
    async fn handle_message(&self, message: JsonRpcMessage, context: MessageContext);

    /// Mid-session request from the server to re-run setup.
    ///
    /// Forwarded, not thrown. When the notice says the session cannot
    /// continue, the transport closes the channel right after this returns.
    async fn handle_setup_required(&self, _notice: SetupRequired, _context: MessageContext) {}

    /// A transport-level error that terminated the channel.
    async fn handle_error(&self, error: TransportError);

    /// The channel reached its terminal state. Invoked exactly once.
    async fn handle_close(&self);
}
