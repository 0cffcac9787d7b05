//! Setup-Phase Handshake Engines
//!
//! The outer engine runs `AwaitingHandshake → AwaitingComplete → Done |
//! Failed`; the inner engine runs `Booting → SentHandshake → AwaitingReply`
//! and leaves the `Configuring → SentComplete` tail to the inner transport,
//! which posts the completion when the application finishes its
//! configuration UI.
//!
//! Both engines validate before they trust: the outer checks allowlist then
//! version before pinning, the inner checks version before pinning, and a
//! rejected peer is never pinned.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

// Layer 3: Internal module imports
use crate::handshake::wait::{next_message, PhaseClock};
use crate::protocol::message::{SetupComplete, SetupHandshake, SetupHandshakeReply};
use crate::protocol::{
    AllowedOrigins, Origin, Phase, SessionId, SetupError, SetupErrorCode, SetupResult,
    SetupStatus, TargetOrigin, TransportError, TransportResult, VersionRange, WireMessage,
};
use crate::window::control::WindowControl;

/// Parameters shared by the outer setup engine.
pub(crate) struct OuterSetupParams<'a> {
    pub allowed_origins: &'a AllowedOrigins,
    pub versions: &'a VersionRange,
    pub timeout: Duration,
}

/// Drive the setup phase from the outer side.
///
/// Navigates the container to `<url>#setup`, answers the inner's handshake,
/// and resolves with the delivered [`SetupResult`]. The caller owns the
/// container and closes it on every exit path.
pub(crate) async fn run_outer_setup(
    control: &dyn WindowControl,
    url: &Url,
    params: OuterSetupParams<'_>,
    cancel: &CancellationToken,
) -> TransportResult<SetupResult> {
    let mut events = control.subscribe();
    let clock = PhaseClock::start(Phase::Setup, params.timeout);

    let setup_url = Phase::Setup.apply_to_url(url);
    control.navigate(&setup_url).await?;
    debug!(url = %setup_url, "setup container navigated, awaiting handshake");

    // AwaitingHandshake
    let (origin, handshake) = loop {
        let (origin, message) = next_message(&mut events, &clock, cancel).await?;
        match message {
            WireMessage::SetupHandshake(handshake) => break (origin, handshake),
            other => return Err(TransportError::unexpected("AwaitingHandshake", other.tag())),
        }
    };

    if !params.allowed_origins.permits(&origin) {
        return Err(TransportError::OriginRejected { origin });
    }
    if !params.versions.supports(&handshake.protocol_version) {
        // A rejected peer is never pinned.
        return Err(TransportError::VersionMismatch {
            advertised: handshake.protocol_version,
            supported: params.versions.clone(),
        });
    }
    control.pin_origin(&origin)?;
    debug!(%origin, version = %handshake.protocol_version, "setup peer pinned");

    if handshake.requires_visible_setup {
        control.set_visible(true)?;
    }

    let session_id = SessionId::mint();
    control.post(
        &WireMessage::SetupHandshakeReply(SetupHandshakeReply {
            protocol_version: params.versions.max().clone(),
            session_id: session_id.clone(),
        }),
        &TargetOrigin::Pinned(origin.clone()),
    )?;

    // AwaitingComplete
    let complete = loop {
        let (_, message) = next_message(&mut events, &clock, cancel).await?;
        match message {
            WireMessage::SetupComplete(complete) => break complete,
            WireMessage::SetupHandshake(_) => {
                // Duplicate handshake after pinning: dropped.
                trace!("dropping duplicate setup handshake");
            }
            other => return Err(TransportError::unexpected("AwaitingComplete", other.tag())),
        }
    };

    into_setup_result(complete)
}

fn into_setup_result(complete: SetupComplete) -> TransportResult<SetupResult> {
    match complete.status {
        SetupStatus::Success => Ok(SetupResult {
            server_title: complete.server_title.unwrap_or_default(),
            transport_visibility: complete.transport_visibility.unwrap_or_default(),
            ephemeral_message: complete.ephemeral_message,
        }),
        SetupStatus::Error => Err(TransportError::Setup(complete.error.unwrap_or_else(|| {
            SetupError::new(
                SetupErrorCode::ConfigError,
                "setup failed without error detail",
            )
        }))),
    }
}

/// Parameters shared by both inner engines.
pub(crate) struct InnerHandshakeParams<'a> {
    pub versions: &'a VersionRange,
    pub timeout: Duration,
}

/// Drive the setup handshake from the inner side.
///
/// Speaks first (the inner just finished bootstrapping, the outer cannot
/// know otherwise) with the phase's single wildcard-targeted post, then
/// validates and pins the replying origin. The `Configuring` state that
/// follows belongs to the application.
pub(crate) async fn run_inner_setup(
    control: &dyn WindowControl,
    requires_visible_setup: bool,
    params: InnerHandshakeParams<'_>,
    cancel: &CancellationToken,
) -> TransportResult<(Origin, SessionId)> {
    let mut events = control.subscribe();
    let clock = PhaseClock::start(Phase::Setup, params.timeout);

    control.post(
        &WireMessage::SetupHandshake(SetupHandshake {
            protocol_version: params.versions.max().clone(),
            requires_visible_setup,
        }),
        &TargetOrigin::Wildcard,
    )?;
    debug!("setup handshake sent, awaiting reply");

    // AwaitingReply
    loop {
        let (origin, message) = next_message(&mut events, &clock, cancel).await?;
        match message {
            WireMessage::SetupHandshakeReply(reply) => {
                if !params.versions.supports(&reply.protocol_version) {
                    return Err(TransportError::VersionMismatch {
                        advertised: reply.protocol_version,
                        supported: params.versions.clone(),
                    });
                }
                control.pin_origin(&origin)?;
                debug!(%origin, session = %reply.session_id, "setup reply pinned");
                return Ok((origin, reply.session_id));
            }
            other => return Err(TransportError::unexpected("AwaitingReply", other.tag())),
        }
    }
}
