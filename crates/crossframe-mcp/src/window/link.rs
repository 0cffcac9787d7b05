//! In-Process Cross-Window Channel
//!
//! [`WindowLink`] models the host's cross-window message channel for
//! process-internal embeddings and test harnesses, with the delivery rules
//! of browser `postMessage`:
//!
//! - every delivered event is stamped with the *sender's* origin;
//! - a non-wildcard target origin that does not match the receiving
//!   window's origin suppresses delivery silently;
//! - delivery is FIFO per (sender, receiver) pair;
//! - dropping an endpoint closes the peer's inbound stream.
//!
//! A link endpoint carries raw JSON values. Classification, origin pinning,
//! and drift filtering happen one layer up, in the window control.

// Layer 1: Standard library imports
use std::sync::Mutex;

// Layer 2: Third-party crate imports
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

// Layer 3: Internal module imports
use crate::protocol::{Origin, TargetOrigin, TransportError, TransportResult};

/// One raw record as received by a window: sender origin plus data.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// Origin of the window that posted the record.
    pub origin: Origin,
    /// The posted JSON value.
    pub data: Value,
}

/// One endpoint of an in-process window-to-window channel.
#[derive(Debug)]
pub struct WindowLink {
    local_origin: Origin,
    peer_origin: Origin,
    to_peer: mpsc::UnboundedSender<MessageEvent>,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<MessageEvent>>>,
}

impl WindowLink {
    /// Create a connected pair of endpoints with the given window origins.
    ///
    /// The first endpoint speaks as `first` and hears the peer as `second`;
    /// the second endpoint is the mirror image.
    pub fn pair(first: Origin, second: Origin) -> (WindowLink, WindowLink) {
        let (to_second, from_first) = mpsc::unbounded_channel();
        let (to_first, from_second) = mpsc::unbounded_channel();
        (
            WindowLink {
                local_origin: first.clone(),
                peer_origin: second.clone(),
                to_peer: to_second,
                inbound: Mutex::new(Some(from_second)),
            },
            WindowLink {
                local_origin: second,
                peer_origin: first,
                to_peer: to_first,
                inbound: Mutex::new(Some(from_first)),
            },
        )
    }

    /// Origin of the window this endpoint belongs to.
    pub fn local_origin(&self) -> &Origin {
        &self.local_origin
    }

    /// Origin the peer window is currently loaded from.
    pub fn peer_origin(&self) -> &Origin {
        &self.peer_origin
    }

    /// Post a record toward the peer window.
    ///
    /// Mirrors host semantics: a target origin that does not match the
    /// receiving window's origin drops the record without error; a closed
    /// peer surfaces [`TransportError::PeerClosed`].
    pub fn post(&self, data: Value, target: &TargetOrigin) -> TransportResult<()> {
        if !target.permits(&self.peer_origin) {
            trace!(
                target = %target,
                receiver = %self.peer_origin,
                "target origin does not match receiving window, dropping"
            );
            return Ok(());
        }
        self.to_peer
            .send(MessageEvent {
                origin: self.local_origin.clone(),
                data,
            })
            .map_err(|_| TransportError::PeerClosed)
    }

    /// Take the inbound stream; yields `None` once taken.
    ///
    /// The window control consumes this exactly once and owns dispatch from
    /// then on.
    pub fn take_inbound(&self) -> Option<mpsc::UnboundedReceiver<MessageEvent>> {
        self.inbound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// A sender handle for another window on the same page.
    ///
    /// Browsers let any frame holding a window reference post into it; this
    /// produces such a handle, stamping events with `origin` instead of the
    /// link's own origin. Used to model co-tenant noise and cross-origin
    /// interference.
    pub fn co_tenant(&self, origin: Origin) -> WindowPoster {
        WindowPoster {
            origin,
            receiver_origin: self.peer_origin.clone(),
            to_window: self.to_peer.clone(),
        }
    }
}

/// Sender handle representing a third window posting into the same target.
#[derive(Debug, Clone)]
pub struct WindowPoster {
    origin: Origin,
    receiver_origin: Origin,
    to_window: mpsc::UnboundedSender<MessageEvent>,
}

impl WindowPoster {
    /// Post a record into the target window under this poster's origin.
    pub fn post(&self, data: Value, target: &TargetOrigin) -> TransportResult<()> {
        if !target.permits(&self.receiver_origin) {
            return Ok(());
        }
        self.to_window
            .send(MessageEvent {
                origin: self.origin.clone(),
                data,
            })
            .map_err(|_| TransportError::PeerClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn origins() -> (Origin, Origin) {
        (
            Origin::new("https://outer.example").unwrap(),
            Origin::new("https://inner.example").unwrap(),
        )
    }

    #[tokio::test]
    async fn delivery_stamps_sender_origin() {
        let (outer, inner) = origins();
        let (outer_end, inner_end) = WindowLink::pair(outer.clone(), inner);
        let mut inbound = inner_end.take_inbound().unwrap();

        outer_end
            .post(json!({"n": 1}), &TargetOrigin::Wildcard)
            .unwrap();

        let event = inbound.recv().await.unwrap();
        assert_eq!(event.origin, outer);
        assert_eq!(event.data, json!({"n": 1}));
    }

    #[tokio::test]
    async fn mismatched_target_origin_suppresses_delivery() {
        let (outer, inner) = origins();
        let (outer_end, inner_end) = WindowLink::pair(outer, inner.clone());
        let mut inbound = inner_end.take_inbound().unwrap();

        let elsewhere = TargetOrigin::Pinned(Origin::new("https://elsewhere.example").unwrap());
        outer_end.post(json!({"n": 1}), &elsewhere).unwrap();
        outer_end
            .post(json!({"n": 2}), &TargetOrigin::Pinned(inner))
            .unwrap();

        // Only the correctly targeted record arrives.
        let event = inbound.recv().await.unwrap();
        assert_eq!(event.data, json!({"n": 2}));
    }

    #[tokio::test]
    async fn fifo_per_direction() {
        let (outer, inner) = origins();
        let (outer_end, inner_end) = WindowLink::pair(outer, inner);
        let mut inbound = inner_end.take_inbound().unwrap();

        for n in 0..5 {
            outer_end.post(json!(n), &TargetOrigin::Wildcard).unwrap();
        }
        for n in 0..5 {
            assert_eq!(inbound.recv().await.unwrap().data, json!(n));
        }
    }

    #[tokio::test]
    async fn dropping_an_endpoint_closes_the_peer_stream() {
        let (outer, inner) = origins();
        let (outer_end, inner_end) = WindowLink::pair(outer, inner);
        let mut inbound = inner_end.take_inbound().unwrap();

        drop(outer_end);
        assert!(inbound.recv().await.is_none());
    }

    #[tokio::test]
    async fn co_tenant_posts_under_its_own_origin() {
        let (outer, inner) = origins();
        let evil = Origin::new("https://evil.example").unwrap();
        let (outer_end, inner_end) = WindowLink::pair(outer, inner);
        let mut inbound = inner_end.take_inbound().unwrap();

        outer_end
            .co_tenant(evil.clone())
            .post(json!({"x": 1}), &TargetOrigin::Wildcard)
            .unwrap();

        let event = inbound.recv().await.unwrap();
        assert_eq!(event.origin, evil);
    }
}
