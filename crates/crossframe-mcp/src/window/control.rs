//! Window-Control Abstraction
//!
//! [`WindowControl`] is the polymorphic handle that decouples the handshake
//! engines and transports from how a window is created, navigated, shown,
//! or destroyed. It carries the capability set
//! `{post, subscribe, navigate, set_visible, close}` plus the observable
//! write-once pinned-origin slot.
//!
//! The abstraction also intercepts inbound traffic: raw host records are
//! classified exactly once, foreign and malformed records never reach a
//! subscriber, and once an origin is pinned every record from any other
//! origin is dropped silently. Subscribers therefore only ever see
//! well-formed protocol records from an acceptable sender.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};
use url::Url;

// Layer 3: Internal module imports
use crate::protocol::{
    AllowedOrigins, Classified, Origin, PinnedOrigin, TargetOrigin, TransportError,
    TransportResult, WireMessage,
};
use crate::window::link::{MessageEvent, WindowLink};

/// One event delivered to a window-control subscriber.
#[derive(Debug)]
pub enum WindowEvent {
    /// A well-formed protocol record from an acceptable origin.
    Message {
        origin: Origin,
        message: WireMessage,
    },
    /// The peer window went away (closed or navigated elsewhere).
    Disconnected,
}

/// Single-consumer stream of accepted window events.
pub type WindowEvents = mpsc::UnboundedReceiver<WindowEvent>;

/// Polymorphic handle over a controllable window.
///
/// Variants differ in which capabilities are real: an embedded frame can be
/// navigated and hidden, a popup is visible by definition, and the inner
/// side of a container controls nothing about its own lifecycle.
#[async_trait]
pub trait WindowControl: Send + Sync {
    /// Post a protocol record toward the peer window.
    ///
    /// Wildcard targeting is refused once the peer origin is pinned.
    fn post(&self, message: &WireMessage, target: &TargetOrigin) -> TransportResult<()>;

    /// Subscribe to accepted inbound events.
    ///
    /// There is at most one live subscriber: a new subscription supersedes
    /// the previous one, and dropping the stream unsubscribes. Listener
    /// registrations are scoped to a handshake, so engines subscribe before
    /// they speak and drop the stream when their phase ends.
    fn subscribe(&self) -> WindowEvents;

    /// Navigate the window to `url`.
    async fn navigate(&self, url: &Url) -> TransportResult<()>;

    /// Show or hide the window, where the variant supports it.
    fn set_visible(&self, visible: bool) -> TransportResult<()>;

    /// Tear the window down. Idempotent.
    fn close(&self);

    /// The pinned peer origin, once recorded.
    fn pinned_origin(&self) -> Option<Origin>;

    /// Record the peer origin; write-once per container.
    fn pin_origin(&self, origin: &Origin) -> TransportResult<()>;

    /// The window's own location, for phase detection on the inner side.
    fn current_url(&self) -> Option<Url> {
        None
    }
}

/// Creates one fresh window control per phase.
///
/// A container instance is bound to exactly one phase, so the outer
/// transport asks its factory for a new control at the start of every
/// `run_setup`/`connect` and destroys it when the phase ends.
pub trait WindowControlFactory: Send + Sync {
    fn create(&self) -> TransportResult<Arc<dyn WindowControl>>;
}

/// Factory over one pre-built control, for single-phase embeddings.
///
/// Yields the wrapped control exactly once; a second phase on the same
/// factory is refused rather than reusing a spent container.
pub struct SingleUseFactory {
    slot: Mutex<Option<Arc<dyn WindowControl>>>,
}

impl SingleUseFactory {
    pub fn new(control: Arc<dyn WindowControl>) -> Self {
        Self {
            slot: Mutex::new(Some(control)),
        }
    }
}

impl WindowControlFactory for SingleUseFactory {
    fn create(&self) -> TransportResult<Arc<dyn WindowControl>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .ok_or_else(|| TransportError::frame("window control already consumed by a prior phase"))
    }
}

type Subscriber = Arc<Mutex<Option<mpsc::UnboundedSender<WindowEvent>>>>;

/// Shared mechanics behind every control variant: posting with the
/// wildcard guard, the classification/pinning pump, and subscriber
/// management.
pub(crate) struct ControlCore {
    link: Mutex<Option<WindowLink>>,
    pinned: Arc<PinnedOrigin>,
    subscriber: Subscriber,
    pump: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ControlCore {
    /// Build the core and start its dispatch pump.
    ///
    /// `inbound_allowlist` is the endpoint-level filter used by inner
    /// controls: records from origins outside it are dropped before any
    /// subscriber sees them. Outer controls pass `None` and let the
    /// handshake engine decide, so that rejection can surface as an error.
    ///
    /// Must be called within a Tokio runtime.
    pub(crate) fn new(link: WindowLink, inbound_allowlist: Option<AllowedOrigins>) -> Self {
        let pinned = Arc::new(PinnedOrigin::new());
        let subscriber: Subscriber = Arc::new(Mutex::new(None));
        let inbound = link.take_inbound();

        let pump = inbound.map(|inbound| {
            tokio::spawn(Self::pump(
                inbound,
                Arc::clone(&pinned),
                Arc::clone(&subscriber),
                inbound_allowlist,
            ))
        });

        Self {
            link: Mutex::new(Some(link)),
            pinned,
            subscriber,
            pump: Mutex::new(pump),
            closed: AtomicBool::new(false),
        }
    }

    async fn pump(
        mut inbound: mpsc::UnboundedReceiver<MessageEvent>,
        pinned: Arc<PinnedOrigin>,
        subscriber: Subscriber,
        allowlist: Option<AllowedOrigins>,
    ) {
        while let Some(event) = inbound.recv().await {
            let message = match Classified::from_value(event.data) {
                Classified::Message(message) => message,
                Classified::Foreign => {
                    trace!(origin = %event.origin, "ignoring non-protocol record");
                    continue;
                }
                Classified::Malformed { tag, detail } => {
                    warn!(%tag, %detail, origin = %event.origin, "dropping malformed protocol record");
                    continue;
                }
            };

            if let Some(pinned) = pinned.get() {
                if *pinned != event.origin {
                    trace!(
                        origin = %event.origin,
                        pinned = %pinned,
                        tag = message.tag(),
                        "dropping record from non-pinned origin"
                    );
                    continue;
                }
            } else if let Some(allowlist) = &allowlist {
                if !allowlist.permits(&event.origin) {
                    warn!(origin = %event.origin, "dropping record from origin outside allowlist");
                    continue;
                }
            }

            Self::deliver(
                &subscriber,
                WindowEvent::Message {
                    origin: event.origin,
                    message,
                },
            );
        }
        Self::deliver(&subscriber, WindowEvent::Disconnected);
    }

    fn deliver(subscriber: &Subscriber, event: WindowEvent) {
        let guard = subscriber
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_ref() {
            Some(sender) => {
                if sender.send(event).is_err() {
                    trace!("subscriber went away, dropping event");
                }
            }
            None => trace!("no subscriber registered, dropping event"),
        }
    }

    pub(crate) fn post(
        &self,
        message: &WireMessage,
        target: &TargetOrigin,
    ) -> TransportResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if self.pinned.is_pinned() && matches!(target, TargetOrigin::Wildcard) {
            return Err(TransportError::WildcardAfterPin);
        }
        let value = serde_json::to_value(message)?;
        let guard = self
            .link
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_ref() {
            Some(link) => link.post(value, target),
            None => Err(TransportError::Closed),
        }
    }

    pub(crate) fn subscribe(&self) -> WindowEvents {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut guard = self
            .subscriber
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(sender);
        receiver
    }

    pub(crate) fn pinned_origin(&self) -> Option<Origin> {
        self.pinned.get().cloned()
    }

    pub(crate) fn pin_origin(&self, origin: &Origin) -> TransportResult<()> {
        self.pinned.pin(origin)
    }

    /// Tear down messaging: drops the link (signalling disconnection to the
    /// peer), stops the pump, and forgets the subscriber. Idempotent.
    pub(crate) fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.link
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(pump) = self
            .pump
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            pump.abort();
        }
        self.subscriber
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

impl Drop for ControlCore {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{JsonRpcMessage, SessionId, TransportAccepted};
    use serde_json::json;

    fn pair() -> (ControlCore, WindowLink) {
        let outer = Origin::new("https://outer.example").unwrap();
        let inner = Origin::new("https://inner.example").unwrap();
        let (outer_end, inner_end) = WindowLink::pair(outer, inner);
        (ControlCore::new(outer_end, None), inner_end)
    }

    fn accepted(id: &str) -> serde_json::Value {
        json!({"type": "MCP_TRANSPORT_ACCEPTED", "sessionId": id})
    }

    #[tokio::test]
    async fn foreign_records_never_reach_subscribers() {
        let (core, peer) = pair();
        let mut events = core.subscribe();

        peer.post(json!({"type": "WEBPACK_OK"}), &TargetOrigin::Wildcard)
            .unwrap();
        peer.post(accepted("s-1"), &TargetOrigin::Wildcard).unwrap();

        // Only the protocol record arrives.
        let Some(WindowEvent::Message { message, .. }) = events.recv().await else {
            panic!("expected a message event");
        };
        assert_eq!(message.tag(), "MCP_TRANSPORT_ACCEPTED");
    }

    #[tokio::test]
    async fn pinned_origin_drops_drift_silently() {
        let (core, peer) = pair();
        let mut events = core.subscribe();

        let peer_origin = peer.local_origin().clone();
        core.pin_origin(&peer_origin).unwrap();

        let evil = Origin::new("https://evil.example").unwrap();
        peer.co_tenant(evil)
            .post(accepted("spoofed"), &TargetOrigin::Wildcard)
            .unwrap();
        peer.post(accepted("legit"), &TargetOrigin::Wildcard)
            .unwrap();

        let Some(WindowEvent::Message { origin, message }) = events.recv().await else {
            panic!("expected a message event");
        };
        assert_eq!(origin, peer_origin);
        assert_eq!(
            message,
            WireMessage::TransportAccepted(TransportAccepted {
                session_id: SessionId::new("legit"),
            })
        );
    }

    #[tokio::test]
    async fn wildcard_post_is_refused_after_pinning() {
        let (core, peer) = pair();
        let message = WireMessage::mcp(JsonRpcMessage::new_notification("ping", None));

        core.post(&message, &TargetOrigin::Wildcard).unwrap();

        let peer_origin = peer.local_origin().clone();
        core.pin_origin(&peer_origin).unwrap();
        let err = core.post(&message, &TargetOrigin::Wildcard).unwrap_err();
        assert!(matches!(err, TransportError::WildcardAfterPin));

        // Pinned targeting still works.
        core.post(&message, &TargetOrigin::Pinned(peer_origin))
            .unwrap();
    }

    #[tokio::test]
    async fn inbound_allowlist_filters_before_pinning() {
        let outer = Origin::new("https://outer.example").unwrap();
        let inner = Origin::new("https://inner.example").unwrap();
        let (outer_end, inner_end) = WindowLink::pair(outer.clone(), inner);
        let allow = AllowedOrigins::parse(["https://outer.example"]).unwrap();
        let core = ControlCore::new(inner_end, Some(allow));
        let mut events = core.subscribe();

        outer_end
            .co_tenant(Origin::new("https://evil.example").unwrap())
            .post(accepted("spoofed"), &TargetOrigin::Wildcard)
            .unwrap();
        outer_end.post(accepted("legit"), &TargetOrigin::Wildcard).unwrap();

        let Some(WindowEvent::Message { origin, .. }) = events.recv().await else {
            panic!("expected a message event");
        };
        assert_eq!(origin, outer);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_signals_peer() {
        let (core, peer) = pair();
        core.close();
        core.close();

        let message = WireMessage::mcp(JsonRpcMessage::new_notification("ping", None));
        assert!(matches!(
            core.post(&message, &TargetOrigin::Wildcard),
            Err(TransportError::Closed)
        ));
        // The peer's next post observes the closed channel.
        assert!(matches!(
            peer.post(accepted("s"), &TargetOrigin::Wildcard),
            Err(TransportError::PeerClosed)
        ));
    }

    #[tokio::test]
    async fn new_subscription_supersedes_previous() {
        let (core, peer) = pair();
        let mut first = core.subscribe();
        let mut second = core.subscribe();

        peer.post(accepted("s-1"), &TargetOrigin::Wildcard).unwrap();

        assert!(matches!(
            second.recv().await,
            Some(WindowEvent::Message { .. })
        ));
        // The superseded stream is closed rather than fed.
        assert!(first.try_recv().is_err());
    }
}
