//! Popup Window Control (Outer Side)
//!
//! Wraps a popup window handle. A popup is user-visible by definition, so
//! `set_visible` is a no-op; `close` terminates the window outright.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use url::Url;

// Layer 3: Internal module imports
use crate::protocol::{Origin, TargetOrigin, TransportResult, WireMessage};
use crate::window::control::{ControlCore, WindowControl, WindowEvents};
use crate::window::link::WindowLink;

/// Host-side handle to an opened popup window.
#[async_trait]
pub trait PopupWindow: Send + Sync {
    /// Point the popup at `url`.
    async fn navigate(&self, url: &Url) -> TransportResult<()>;

    /// Terminate the window. Idempotent.
    fn close(&self);
}

/// Outer window control over a popup window.
pub struct PopupWindowControl {
    core: ControlCore,
    popup: Arc<dyn PopupWindow>,
}

impl PopupWindowControl {
    /// Wrap a popup handle and its message link.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(popup: Arc<dyn PopupWindow>, link: WindowLink) -> Self {
        Self {
            core: ControlCore::new(link, None),
            popup,
        }
    }
}

#[async_trait]
impl WindowControl for PopupWindowControl {
    fn post(&self, message: &WireMessage, target: &TargetOrigin) -> TransportResult<()> {
        self.core.post(message, target)
    }

    fn subscribe(&self) -> WindowEvents {
        self.core.subscribe()
    }

    async fn navigate(&self, url: &Url) -> TransportResult<()> {
        self.popup.navigate(url).await
    }

    fn set_visible(&self, _visible: bool) -> TransportResult<()> {
        // A popup cannot be hidden; visibility requests are satisfied trivially.
        Ok(())
    }

    fn close(&self) {
        self.core.close();
        self.popup.close();
    }

    fn pinned_origin(&self) -> Option<Origin> {
        self.core.pinned_origin()
    }

    fn pin_origin(&self, origin: &Origin) -> TransportResult<()> {
        self.core.pin_origin(origin)
    }
}
