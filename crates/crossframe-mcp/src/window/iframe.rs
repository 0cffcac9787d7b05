//! Embedded-Frame Window Control (Outer Side)
//!
//! Wraps a child frame whose element the embedding application owns. The
//! host-specific mechanics of the frame (setting its source, toggling its
//! display, removing it from the page) are injected through the
//! [`EmbeddedFrame`] trait so the transport holds no host globals.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use url::Url;

// Layer 3: Internal module imports
use crate::protocol::{AllowedOrigins, Origin, TargetOrigin, TransportResult, WireMessage};
use crate::window::control::{ControlCore, WindowControl, WindowEvents};
use crate::window::link::WindowLink;

/// Host-side handle to an embeddable child frame.
#[async_trait]
pub trait EmbeddedFrame: Send + Sync {
    /// Point the frame at `url` (sets its source and loads the document).
    async fn navigate(&self, url: &Url) -> TransportResult<()>;

    /// Toggle the frame's display.
    fn set_visible(&self, visible: bool) -> TransportResult<()>;

    /// Remove the frame from the page. Idempotent.
    fn destroy(&self);
}

/// Outer window control over an embedded child frame.
pub struct IframeWindowControl {
    core: ControlCore,
    frame: Arc<dyn EmbeddedFrame>,
}

impl IframeWindowControl {
    /// Wrap a frame handle and its message link.
    ///
    /// Must be called within a Tokio runtime. Origin acceptance is decided
    /// by the outer handshake engine, so the control itself applies no
    /// inbound allowlist; see
    /// [`with_inbound_allowlist`](Self::with_inbound_allowlist) for
    /// embeddings that want endpoint-level filtering as well.
    pub fn new(frame: Arc<dyn EmbeddedFrame>, link: WindowLink) -> Self {
        Self {
            core: ControlCore::new(link, None),
            frame,
        }
    }

    /// Wrap a frame handle with an endpoint-level inbound origin filter.
    pub fn with_inbound_allowlist(
        frame: Arc<dyn EmbeddedFrame>,
        link: WindowLink,
        allowlist: AllowedOrigins,
    ) -> Self {
        Self {
            core: ControlCore::new(link, Some(allowlist)),
            frame,
        }
    }
}

#[async_trait]
impl WindowControl for IframeWindowControl {
    fn post(&self, message: &WireMessage, target: &TargetOrigin) -> TransportResult<()> {
        self.core.post(message, target)
    }

    fn subscribe(&self) -> WindowEvents {
        self.core.subscribe()
    }

    async fn navigate(&self, url: &Url) -> TransportResult<()> {
        self.frame.navigate(url).await
    }

    fn set_visible(&self, visible: bool) -> TransportResult<()> {
        self.frame.set_visible(visible)
    }

    fn close(&self) {
        self.core.close();
        self.frame.destroy();
    }

    fn pinned_origin(&self) -> Option<Origin> {
        self.core.pinned_origin()
    }

    fn pin_origin(&self, origin: &Origin) -> TransportResult<()> {
        self.core.pin_origin(origin)
    }
}
