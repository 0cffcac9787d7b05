//! Outer Frame Transport
//!
//! The endpoint that owns the container. It creates one fresh window
//! control per phase, drives the matching handshake engine, and while
//! connected pumps `MCP_MESSAGE` envelopes between the pinned peer and the
//! embedding runtime's [`MessageHandler`].
//!
//! Lifecycle rules enforced here:
//!
//! - a container serves exactly one phase and is closed on every exit path;
//! - every surfaced error closes the container and unsubscribes listeners;
//! - `close()` is idempotent and `handle_close` fires exactly once;
//! - after `Closed`, `send` is a no-op and inbound records are dropped.

// Layer 1: Standard library imports
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

// Layer 3: Internal module imports
use crate::handshake::connect::{run_outer_connect, OuterConnectParams};
use crate::handshake::setup::{run_outer_setup, OuterSetupParams};
use crate::protocol::{
    default_handshake_timeout, AllowedOrigins, JsonRpcMessage, McpPayload, Origin, SessionId,
    SetupResult, TargetOrigin, TransportError, TransportResult, TransportVisibility,
    VersionRange, VisibilityRequirement, WireMessage,
};
use crate::transport::handler::{MessageContext, MessageHandler};
use crate::window::control::{
    SingleUseFactory, WindowControl, WindowControlFactory, WindowEvent, WindowEvents,
};

/// Configuration for an outer transport.
#[derive(Clone)]
pub struct OuterConfig {
    /// Origins allowed to open a handshake. Mandatory.
    pub allowed_origins: AllowedOrigins,
    /// Acceptable peer protocol versions.
    pub protocol_versions: VersionRange,
    /// Per-phase handshake timeout.
    pub handshake_timeout: Duration,
    /// Visibility policy persisted from a prior setup, applied to
    /// transport-phase containers before navigation.
    pub transport_visibility: Option<TransportVisibility>,
}

impl OuterConfig {
    /// Configuration with protocol defaults.
    pub fn new(allowed_origins: AllowedOrigins) -> Self {
        Self {
            allowed_origins,
            protocol_versions: VersionRange::default(),
            handshake_timeout: default_handshake_timeout(),
            transport_visibility: None,
        }
    }
}

enum ChannelState {
    Idle,
    Connected {
        control: Arc<dyn WindowControl>,
        peer_origin: Origin,
        session_id: SessionId,
    },
    Closed,
}

struct OuterShared {
    config: OuterConfig,
    handler: Arc<dyn MessageHandler>,
    state: Mutex<ChannelState>,
    cancel: CancellationToken,
}

impl OuterShared {
    /// Transition to `Closed`, closing the container if one is live.
    /// Returns whether this call performed the transition.
    async fn close_channel(&self) -> bool {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, ChannelState::Closed) {
            ChannelState::Closed => false,
            ChannelState::Idle => true,
            ChannelState::Connected { control, .. } => {
                control.close();
                true
            }
        }
    }

    /// Close on error: container first, then the error, then the single
    /// close notification.
    async fn fail(&self, error: TransportError) {
        let closed_now = self.close_channel().await;
        self.handler.handle_error(error).await;
        if closed_now {
            self.handler.handle_close().await;
        }
    }
}

/// The endpoint owning an embeddable sub-window or popup.
pub struct OuterFrameTransport {
    factory: Arc<dyn WindowControlFactory>,
    shared: Arc<OuterShared>,
    pump: StdMutex<Option<JoinHandle<()>>>,
}

impl OuterFrameTransport {
    /// Create a transport over a window-control factory.
    ///
    /// The factory is asked for a fresh control at the start of every
    /// phase, honoring the one-container-per-phase rule.
    pub fn new(
        factory: Arc<dyn WindowControlFactory>,
        config: OuterConfig,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            factory,
            shared: Arc::new(OuterShared {
                config,
                handler,
                state: Mutex::new(ChannelState::Idle),
                cancel: CancellationToken::new(),
            }),
            pump: StdMutex::new(None),
        }
    }

    /// Create a single-phase transport over one pre-built control.
    pub fn with_control(
        control: Arc<dyn WindowControl>,
        config: OuterConfig,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self::new(Arc::new(SingleUseFactory::new(control)), config, handler)
    }

    /// Run the setup phase against `<url>#setup`.
    ///
    /// The container is created for this call and closed on every exit
    /// path. A completion with error status surfaces as
    /// [`TransportError::Setup`].
    pub async fn run_setup(&self, url: &Url) -> TransportResult<SetupResult> {
        self.ensure_idle().await?;
        let control = self.factory.create()?;
        let result = run_outer_setup(
            control.as_ref(),
            url,
            OuterSetupParams {
                allowed_origins: &self.shared.config.allowed_origins,
                versions: &self.shared.config.protocol_versions,
                timeout: self.shared.config.handshake_timeout,
            },
            &self.shared.cancel,
        )
        .await;
        control.close();
        result
    }

    /// Run the transport phase and surface the channel.
    ///
    /// Mints a fresh session id unless the embedding layer supplies a
    /// persisted one. On success the transport is `Connected` and inbound
    /// envelopes start flowing to the handler.
    pub async fn connect(
        &self,
        url: &Url,
        session_id: Option<SessionId>,
    ) -> TransportResult<SessionId> {
        self.ensure_idle().await?;
        let control = self.factory.create()?;
        let session_id = session_id.unwrap_or_else(SessionId::mint);

        if let Some(visibility) = &self.shared.config.transport_visibility {
            match visibility.requirement {
                VisibilityRequirement::Required => control.set_visible(true)?,
                VisibilityRequirement::Hidden => control.set_visible(false)?,
                VisibilityRequirement::Optional => {}
            }
        }

        let outcome = run_outer_connect(
            control.as_ref(),
            url,
            &session_id,
            OuterConnectParams {
                allowed_origins: &self.shared.config.allowed_origins,
                versions: &self.shared.config.protocol_versions,
                timeout: self.shared.config.handshake_timeout,
            },
            &self.shared.cancel,
        )
        .await;

        let (peer_origin, events) = match outcome {
            Ok(connected) => connected,
            Err(error) => {
                control.close();
                return Err(error);
            }
        };

        {
            let mut state = self.shared.state.lock().await;
            if matches!(*state, ChannelState::Closed) {
                control.close();
                return Err(TransportError::Closed);
            }
            *state = ChannelState::Connected {
                control: Arc::clone(&control),
                peer_origin: peer_origin.clone(),
                session_id: session_id.clone(),
            };
        }
        debug!(peer = %peer_origin, session = %session_id, "channel connected");

        let pump = tokio::spawn(Self::pump(
            Arc::clone(&self.shared),
            events,
            session_id.clone(),
        ));
        *self
            .pump
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(pump);

        Ok(session_id)
    }

    /// Send one JSON-RPC envelope to the connected peer.
    ///
    /// Valid only while `Connected`; a no-op once `Closed`.
    pub async fn send(&self, payload: JsonRpcMessage) -> TransportResult<()> {
        let state = self.shared.state.lock().await;
        match &*state {
            ChannelState::Connected {
                control,
                peer_origin,
                ..
            } => control.post(
                &WireMessage::mcp(payload),
                &TargetOrigin::Pinned(peer_origin.clone()),
            ),
            ChannelState::Closed => Ok(()),
            ChannelState::Idle => Err(TransportError::NotConnected),
        }
    }

    /// Close the transport. Idempotent; later `send` calls are no-ops.
    pub async fn close(&self) {
        self.shared.cancel.cancel();
        let closed_now = self.shared.close_channel().await;
        if let Some(pump) = self
            .pump
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            pump.abort();
        }
        if closed_now {
            self.shared.handler.handle_close().await;
        }
    }

    /// Whether the channel is currently connected.
    pub async fn is_connected(&self) -> bool {
        matches!(
            &*self.shared.state.lock().await,
            ChannelState::Connected { .. }
        )
    }

    /// Session id of the connected channel, if any.
    pub async fn session_id(&self) -> Option<SessionId> {
        match &*self.shared.state.lock().await {
            ChannelState::Connected { session_id, .. } => Some(session_id.clone()),
            _ => None,
        }
    }

    async fn ensure_idle(&self) -> TransportResult<()> {
        match &*self.shared.state.lock().await {
            ChannelState::Idle => Ok(()),
            ChannelState::Connected { .. } => Err(TransportError::invalid_config(
                "transport already has a connected channel",
            )),
            ChannelState::Closed => Err(TransportError::Closed),
        }
    }

    /// Connected-state pump: forwards envelopes to the handler one at a
    /// time, observes out-of-band records, and turns peer disappearance
    /// into `PeerClosed`.
    async fn pump(shared: Arc<OuterShared>, mut events: WindowEvents, session_id: SessionId) {
        loop {
            let event = tokio::select! {
                biased;
                _ = shared.cancel.cancelled() => break,
                event = events.recv() => event,
            };
            let Some(event) = event else {
                shared.fail(TransportError::PeerClosed).await;
                break;
            };
            match event {
                WindowEvent::Disconnected => {
                    shared.fail(TransportError::PeerClosed).await;
                    break;
                }
                WindowEvent::Message { origin, message } => match message {
                    WireMessage::Mcp(McpPayload { payload }) => {
                        let context = MessageContext::new(session_id.clone(), origin);
                        shared.handler.handle_message(payload, context).await;
                    }
                    WireMessage::SetupRequired(notice) => {
                        let context = MessageContext::new(session_id.clone(), origin);
                        let can_continue = notice.can_continue;
                        shared.handler.handle_setup_required(notice, context).await;
                        if !can_continue {
                            // Report first, then close the channel.
                            if shared.close_channel().await {
                                shared.handler.handle_close().await;
                            }
                            break;
                        }
                    }
                    WireMessage::TransportHandshake(_) | WireMessage::TransportAccepted(_) => {
                        trace!("dropping duplicate transport handshake record");
                    }
                    other => {
                        shared
                            .fail(TransportError::unexpected("Connected", other.tag()))
                            .await;
                        break;
                    }
                },
            }
        }
    }
}
