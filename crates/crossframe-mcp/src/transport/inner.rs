//! Inner Frame Transport
//!
//! The endpoint running inside the container. It reads its own URL to
//! decide which phase the outer side is running, speaks first in that
//! phase, and after the transport handshake pumps `MCP_MESSAGE` envelopes
//! to the embedding runtime.
//!
//! During setup the application drives the middle of the state machine:
//! `prepare_setup` blocks until the handshake reply is pinned, the
//! configuration UI runs for as long as it needs, and `complete_setup` or
//! `fail_setup` emits the completion. The inner side cannot close its own
//! container, so `close()` is silent local teardown; there is no bye record
//! in the protocol.

// Layer 1: Standard library imports
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

// Layer 3: Internal module imports
use crate::handshake::connect::{run_inner_connect, InnerConnectParams};
use crate::handshake::setup::{run_inner_setup, InnerHandshakeParams};
use crate::protocol::message::SetupComplete;
use crate::protocol::{
    default_handshake_timeout, JsonRpcMessage, McpPayload, Origin, Phase, ReSetupReason,
    SessionId, SetupError, SetupRequired, SetupResult, SetupStatus, TargetOrigin,
    TransportError, TransportResult, VersionRange, WireMessage,
};
use crate::transport::handler::{MessageContext, MessageHandler};
use crate::window::control::{WindowControl, WindowEvent, WindowEvents};

/// Configuration for an inner transport.
#[derive(Clone)]
pub struct InnerConfig {
    /// Acceptable peer protocol versions.
    pub protocol_versions: VersionRange,
    /// Whether this server's setup UI must be shown to the user.
    pub requires_visible_setup: bool,
    /// Per-phase handshake timeout.
    pub handshake_timeout: Duration,
}

impl Default for InnerConfig {
    fn default() -> Self {
        Self {
            protocol_versions: VersionRange::default(),
            requires_visible_setup: false,
            handshake_timeout: default_handshake_timeout(),
        }
    }
}

/// What the inner side learns from a completed setup handshake.
#[derive(Debug, Clone)]
pub struct SetupHandle {
    /// Pinned origin of the outer endpoint.
    pub peer_origin: Origin,
    /// Session id minted by the outer endpoint for this handshake.
    pub session_id: SessionId,
}

enum InnerState {
    Idle,
    /// Setup handshake done; the application is running its configuration UI.
    Configuring {
        peer_origin: Origin,
    },
    /// Setup completion posted; waiting for the outer side to tear down.
    SetupSent,
    Connected {
        peer_origin: Origin,
        session_id: SessionId,
    },
    Closed,
}

struct InnerShared {
    control: Arc<dyn WindowControl>,
    handler: Arc<dyn MessageHandler>,
    state: Mutex<InnerState>,
    cancel: CancellationToken,
}

impl InnerShared {
    async fn close_channel(&self) -> bool {
        let mut state = self.state.lock().await;
        if matches!(*state, InnerState::Closed) {
            return false;
        }
        *state = InnerState::Closed;
        self.control.close();
        true
    }

    async fn fail(&self, error: TransportError) {
        let closed_now = self.close_channel().await;
        self.handler.handle_error(error).await;
        if closed_now {
            self.handler.handle_close().await;
        }
    }
}

/// The endpoint running inside an embedded frame or popup.
pub struct InnerFrameTransport {
    config: InnerConfig,
    shared: Arc<InnerShared>,
    pump: StdMutex<Option<JoinHandle<()>>>,
}

impl InnerFrameTransport {
    /// Attach to the window control of the containing frame.
    pub fn new(
        control: Arc<dyn WindowControl>,
        config: InnerConfig,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            config,
            shared: Arc::new(InnerShared {
                control,
                handler,
                state: Mutex::new(InnerState::Idle),
                cancel: CancellationToken::new(),
            }),
            pump: StdMutex::new(None),
        }
    }

    /// Phase signalled by this window's own URL.
    pub fn phase(&self) -> TransportResult<Phase> {
        let url = self
            .shared
            .control
            .current_url()
            .ok_or_else(|| TransportError::frame("window control does not expose a location"))?;
        Ok(Phase::of_url(&url))
    }

    /// Run the inner side of the setup handshake.
    ///
    /// Blocks until the outer's reply is validated and pinned, then leaves
    /// the application in the configuring state until it calls
    /// [`complete_setup`](Self::complete_setup) or
    /// [`fail_setup`](Self::fail_setup).
    pub async fn prepare_setup(&self) -> TransportResult<SetupHandle> {
        self.ensure_idle().await?;
        self.ensure_phase(Phase::Setup, "prepare_setup")?;

        let outcome = run_inner_setup(
            self.shared.control.as_ref(),
            self.config.requires_visible_setup,
            InnerHandshakeParams {
                versions: &self.config.protocol_versions,
                timeout: self.config.handshake_timeout,
            },
            &self.shared.cancel,
        )
        .await;

        match outcome {
            Ok((peer_origin, session_id)) => {
                *self.shared.state.lock().await = InnerState::Configuring {
                    peer_origin: peer_origin.clone(),
                };
                debug!(peer = %peer_origin, session = %session_id, "setup configuring");
                Ok(SetupHandle {
                    peer_origin,
                    session_id,
                })
            }
            Err(error) => {
                self.shared.close_channel().await;
                Err(error)
            }
        }
    }

    /// Report successful configuration to the outer endpoint.
    pub async fn complete_setup(&self, result: SetupResult) -> TransportResult<()> {
        self.finish_setup(SetupComplete {
            status: SetupStatus::Success,
            server_title: Some(result.server_title),
            ephemeral_message: result.ephemeral_message,
            transport_visibility: Some(result.transport_visibility),
            error: None,
        })
        .await
    }

    /// Report failed configuration to the outer endpoint.
    pub async fn fail_setup(&self, error: SetupError) -> TransportResult<()> {
        self.finish_setup(SetupComplete {
            status: SetupStatus::Error,
            server_title: None,
            ephemeral_message: None,
            transport_visibility: None,
            error: Some(error),
        })
        .await
    }

    async fn finish_setup(&self, complete: SetupComplete) -> TransportResult<()> {
        let mut state = self.shared.state.lock().await;
        let InnerState::Configuring { peer_origin } = &*state else {
            return Err(TransportError::invalid_config(
                "no setup handshake awaiting completion",
            ));
        };
        self.shared.control.post(
            &WireMessage::SetupComplete(complete),
            &TargetOrigin::Pinned(peer_origin.clone()),
        )?;
        *state = InnerState::SetupSent;
        Ok(())
    }

    /// Run the inner side of the transport handshake.
    ///
    /// Blocks until the channel is connected, then starts delivering
    /// inbound envelopes to the handler.
    pub async fn prepare_to_connect(&self) -> TransportResult<SessionId> {
        self.ensure_idle().await?;
        self.ensure_phase(Phase::Transport, "prepare_to_connect")?;

        let outcome = run_inner_connect(
            self.shared.control.as_ref(),
            InnerConnectParams {
                versions: &self.config.protocol_versions,
                timeout: self.config.handshake_timeout,
            },
            &self.shared.cancel,
        )
        .await;

        let (peer_origin, session_id, events) = match outcome {
            Ok(connected) => connected,
            Err(error) => {
                self.shared.close_channel().await;
                return Err(error);
            }
        };

        *self.shared.state.lock().await = InnerState::Connected {
            peer_origin: peer_origin.clone(),
            session_id: session_id.clone(),
        };
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
    /// Valid only while connected; a no-op once closed.
    pub async fn send(&self, payload: JsonRpcMessage) -> TransportResult<()> {
        let state = self.shared.state.lock().await;
        match &*state {
            InnerState::Connected { peer_origin, .. } => self.shared.control.post(
                &WireMessage::mcp(payload),
                &TargetOrigin::Pinned(peer_origin.clone()),
            ),
            InnerState::Closed => Ok(()),
            _ => Err(TransportError::NotConnected),
        }
    }

    /// Ask the outer endpoint to re-run setup mid-session.
    ///
    /// Legal only on a connected channel; with `can_continue = false` the
    /// outer side will close the channel after reporting.
    pub async fn request_re_setup(
        &self,
        reason: ReSetupReason,
        message: impl Into<String>,
        can_continue: bool,
    ) -> TransportResult<()> {
        let state = self.shared.state.lock().await;
        let InnerState::Connected { peer_origin, .. } = &*state else {
            return Err(TransportError::NotConnected);
        };
        self.shared.control.post(
            &WireMessage::SetupRequired(SetupRequired {
                reason,
                message: message.into(),
                can_continue,
            }),
            &TargetOrigin::Pinned(peer_origin.clone()),
        )
    }

    /// Tear down the local side. Idempotent and silent: listeners are
    /// unsubscribed and no record is sent to the peer.
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
            InnerState::Connected { .. }
        )
    }

    /// Session id of the connected channel, if any.
    pub async fn session_id(&self) -> Option<SessionId> {
        match &*self.shared.state.lock().await {
            InnerState::Connected { session_id, .. } => Some(session_id.clone()),
            _ => None,
        }
    }

    async fn ensure_idle(&self) -> TransportResult<()> {
        match &*self.shared.state.lock().await {
            InnerState::Idle => Ok(()),
            InnerState::Closed => Err(TransportError::Closed),
            _ => Err(TransportError::invalid_config(
                "handshake already performed on this container",
            )),
        }
    }

    fn ensure_phase(&self, expected: Phase, operation: &'static str) -> TransportResult<()> {
        let detected = self.phase()?;
        if detected == expected {
            Ok(())
        } else {
            Err(TransportError::WrongPhase {
                operation,
                phase: detected,
            })
        }
    }

    async fn pump(shared: Arc<InnerShared>, mut events: WindowEvents, session_id: SessionId) {
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
                    WireMessage::TransportHandshakeReply(_) => {
                        // Duplicate reply after pinning: dropped.
                        trace!("dropping duplicate transport handshake reply");
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
