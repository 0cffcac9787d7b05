//! Inner Window Control
//!
//! Attached inside the subordinate window. The inner side has no control
//! over its own lifecycle: `navigate` and `set_visible` are no-ops, and
//! `close` only tears down the local subscription (there is no bye record
//! in the protocol; the close is silent).
//!
//! The configured allowlist is enforced at this layer: before pinning,
//! records from origins outside it are dropped before any subscriber sees
//! them, so a hostile embedder never reaches the handshake engine.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use url::Url;

// Layer 3: Internal module imports
use crate::protocol::{
    AllowedOrigins, Origin, TargetOrigin, TransportResult, WireMessage,
};
use crate::window::control::{ControlCore, WindowControl, WindowEvents};
use crate::window::link::WindowLink;

/// Window control for code running inside the container.
pub struct PostMessageInnerControl {
    core: ControlCore,
    page_url: Url,
}

impl PostMessageInnerControl {
    /// Attach inside the subordinate window.
    ///
    /// `page_url` is the window's own location; the inner transport reads
    /// it to decide which phase the outer side is running. Must be called
    /// within a Tokio runtime.
    pub fn new(link: WindowLink, page_url: Url, allowed_origins: AllowedOrigins) -> Self {
        Self {
            core: ControlCore::new(link, Some(allowed_origins)),
            page_url,
        }
    }
}

#[async_trait]
impl WindowControl for PostMessageInnerControl {
    fn post(&self, message: &WireMessage, target: &TargetOrigin) -> TransportResult<()> {
        self.core.post(message, target)
    }

    fn subscribe(&self) -> WindowEvents {
        self.core.subscribe()
    }

    async fn navigate(&self, _url: &Url) -> TransportResult<()> {
        // The inner side cannot navigate its own frame.
        Ok(())
    }

    fn set_visible(&self, _visible: bool) -> TransportResult<()> {
        // Visibility belongs to the outer side.
        Ok(())
    }

    fn close(&self) {
        self.core.close();
    }

    fn pinned_origin(&self) -> Option<Origin> {
        self.core.pinned_origin()
    }

    fn pin_origin(&self, origin: &Origin) -> TransportResult<()> {
        self.core.pin_origin(origin)
    }

    fn current_url(&self) -> Option<Url> {
        Some(self.page_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Phase;

    #[tokio::test]
    async fn exposes_its_own_location_for_phase_detection() {
        let outer = Origin::new("https://outer.example").unwrap();
        let inner = Origin::new("https://inner.example").unwrap();
        let (_outer_end, inner_end) = WindowLink::pair(outer, inner);

        let url = Url::parse("https://inner.example/app#setup").unwrap();
        let control = PostMessageInnerControl::new(inner_end, url, AllowedOrigins::Any);

        let location = control.current_url().expect("inner control has a location");
        assert_eq!(Phase::of_url(&location), Phase::Setup);
    }
}
