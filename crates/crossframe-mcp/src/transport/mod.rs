//! Transport Layer - Embedding API
//!
//! The two endpoints an application embeds:
//!
//! - `outer`: [`OuterFrameTransport`], owning the container and the session
//! - `inner`: [`InnerFrameTransport`], running inside the container
//! - `handler`: the event-driven [`MessageHandler`] sink both sides use

// Module declarations (declarations only in mod.rs)
pub mod handler;
pub mod inner;
pub mod outer;

// Public re-exports (clean API surface)
pub use handler::{MessageContext, MessageHandler};
pub use inner::{InnerConfig, InnerFrameTransport, SetupHandle};
pub use outer::{OuterConfig, OuterFrameTransport};
