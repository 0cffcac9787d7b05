//! Cross-Window MCP Transport
//!
//! A bidirectional transport that lets a Model Context Protocol endpoint
//! speak to a counterpart hosted in a separate browser-style window (an
//! embedded frame or a popup), using only cross-window message passing.
//! A two-phase handshake with strict origin pinning turns the untrusted
//! cross-window channel into a single authenticated, framed stream
//! carrying opaque JSON-RPC 2.0 traffic.
//!
//! # Architecture
//!
//! The crate is organized in layers:
//!
//! - **Protocol Layer** (`protocol`): wire schema, the `MCP_*` tagged
//!   union, origins and the write-once pin, the error taxonomy
//! - **Window Layer** (`window`): the window-control abstraction and its
//!   iframe/popup/inner variants over an in-process host channel
//! - **Handshake Layer** (`handshake`): the per-phase state machines
//!   (internal, driven by the transports)
//! - **Transport Layer** (`transport`): the embedding API —
//!   [`OuterFrameTransport`] and [`InnerFrameTransport`] with event-driven
//!   [`MessageHandler`] delivery
//!
//! # Trust model
//!
//! Two peers cooperate across a host message channel. The **outer** peer
//! owns a container whose navigation and visibility it controls; the
//! **inner** peer runs inside that container. The party inside the
//! container speaks first in each phase (it is the one that just loaded),
//! targeting the wildcard origin exactly once; the first validated inbound
//! message pins the peer origin, which from then on is the only acceptable
//! sender and target. Records from other origins are dropped silently so
//! noisy co-tenant frames cannot break a session.
//!
//! # Wire messages
//!
//! ```rust
//! use crossframe_mcp::protocol::{JsonRpcMessage, WireMessage};
//! use serde_json::json;
//!
//! let envelope = JsonRpcMessage::new_request("tools/list", None, json!(1));
//! let record = WireMessage::mcp(envelope);
//!
//! let wire = serde_json::to_value(&record).unwrap();
//! assert_eq!(wire["type"], "MCP_MESSAGE");
//! assert_eq!(wire["payload"]["jsonrpc"], "2.0");
//! ```
//!
//! # Connecting the inner side
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use crossframe_mcp::protocol::{
//!     AllowedOrigins, JsonRpcMessage, Origin, TransportError,
//! };
//! use crossframe_mcp::transport::{
//!     InnerConfig, InnerFrameTransport, MessageContext, MessageHandler,
//! };
//! use crossframe_mcp::window::{PostMessageInnerControl, WindowLink};
//! use url::Url;
//!
//! struct Runtime;
//!
//! #[async_trait]
//! impl MessageHandler for Runtime {
//!     async fn handle_message(&self, message: JsonRpcMessage, _context: MessageContext) {
//!         println!("inbound: {:?}", message.method);
//!     }
//!     async fn handle_error(&self, error: TransportError) {
//!         eprintln!("channel error: {error}");
//!     }
//!     async fn handle_close(&self) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), TransportError> {
//!     let outer = Origin::new("https://host.example")?;
//!     let inner = Origin::new("https://server.example")?;
//!     let (_outer_end, inner_end) = WindowLink::pair(outer, inner);
//!
//!     let control = Arc::new(PostMessageInnerControl::new(
//!         inner_end,
//!         Url::parse("https://server.example/app").expect("static url"),
//!         AllowedOrigins::parse(["https://host.example"])?,
//!     ));
//!     let transport = InnerFrameTransport::new(control, InnerConfig::default(), Arc::new(Runtime));
//!
//!     let session = transport.prepare_to_connect().await?;
//!     println!("connected as {session}");
//!     transport
//!         .send(JsonRpcMessage::new_notification("initialized", None))
//!         .await?;
//!     Ok(())
//! }
//! ```

// Protocol layer modules
pub mod protocol;

// Window-control layer modules
pub mod window;

// Handshake engines (internal)
pub(crate) mod handshake;

// Transport layer modules
pub mod transport;

// Re-export commonly used types for convenience
pub use protocol::{
    AllowedOrigins, JsonRpcError, JsonRpcMessage, Origin, Phase, ProtocolVersion, SessionId,
    SetupError, SetupErrorCode, SetupRequired, SetupResult, TransportError, TransportResult,
    TransportVisibility, VersionRange, VisibilityRequirement, WireMessage,
};
pub use transport::{
    InnerConfig, InnerFrameTransport, MessageContext, MessageHandler, OuterConfig,
    OuterFrameTransport, SetupHandle,
};
pub use window::{
    EmbeddedFrame, IframeWindowControl, PopupWindow, PopupWindowControl, PostMessageInnerControl,
    SingleUseFactory, WindowControl, WindowControlFactory, WindowEvent, WindowLink,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the crate version as a string.
pub fn version() -> &'static str {
    VERSION
}
