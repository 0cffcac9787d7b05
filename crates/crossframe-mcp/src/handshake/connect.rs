//! Transport-Phase Handshake Engines
//!
//! The three-step exchange that opens an MCP session: handshake (inner),
//! reply with session id (outer), accepted echoing the session id (inner).
//! On success each engine hands back the still-open event stream so the
//! connected pump continues on the same single-consumer queue without a
//! re-subscribe gap.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

// Layer 3: Internal module imports
use crate::handshake::wait::{next_message, PhaseClock};
use crate::protocol::constants::tags;
use crate::protocol::message::{TransportAccepted, TransportHandshake, TransportHandshakeReply};
use crate::protocol::{
    AllowedOrigins, Origin, Phase, SessionId, TargetOrigin, TransportError, TransportResult,
    VersionRange, WireMessage,
};
use crate::window::control::{WindowControl, WindowEvents};

/// Parameters for the outer transport engine.
pub(crate) struct OuterConnectParams<'a> {
    pub allowed_origins: &'a AllowedOrigins,
    pub versions: &'a VersionRange,
    pub timeout: Duration,
}

/// Drive the transport handshake from the outer side.
///
/// Navigates the container to the fragment-free URL, validates and pins the
/// handshaking peer, and completes only when the peer echoes the session id
/// it was given. Returns the pinned origin and the live event stream for
/// the connected pump.
pub(crate) async fn run_outer_connect(
    control: &dyn WindowControl,
    url: &Url,
    session_id: &SessionId,
    params: OuterConnectParams<'_>,
    cancel: &CancellationToken,
) -> TransportResult<(Origin, WindowEvents)> {
    let mut events = control.subscribe();
    let clock = PhaseClock::start(Phase::Transport, params.timeout);

    let transport_url = Phase::Transport.apply_to_url(url);
    control.navigate(&transport_url).await?;
    debug!(url = %transport_url, "transport container navigated, awaiting handshake");

    // AwaitingHandshake
    let (origin, handshake) = loop {
        let (origin, message) = next_message(&mut events, &clock, cancel).await?;
        match message {
            WireMessage::TransportHandshake(handshake) => break (origin, handshake),
            other => return Err(TransportError::unexpected("AwaitingHandshake", other.tag())),
        }
    };

    if !params.allowed_origins.permits(&origin) {
        return Err(TransportError::OriginRejected { origin });
    }
    if !params.versions.supports(&handshake.protocol_version) {
        return Err(TransportError::VersionMismatch {
            advertised: handshake.protocol_version,
            supported: params.versions.clone(),
        });
    }
    control.pin_origin(&origin)?;
    debug!(%origin, session = %session_id, "transport peer pinned, sending reply");

    control.post(
        &WireMessage::TransportHandshakeReply(TransportHandshakeReply {
            protocol_version: params.versions.max().clone(),
            session_id: session_id.clone(),
        }),
        &TargetOrigin::Pinned(origin.clone()),
    )?;

    // AwaitingAccepted
    loop {
        let (_, message) = next_message(&mut events, &clock, cancel).await?;
        match message {
            WireMessage::TransportAccepted(TransportAccepted { session_id: echoed }) => {
                if echoed != *session_id {
                    warn!(
                        expected = %session_id,
                        received = %echoed,
                        "peer accepted a different session id"
                    );
                    return Err(TransportError::unexpected(
                        "AwaitingAccepted",
                        tags::TRANSPORT_ACCEPTED,
                    ));
                }
                debug!(session = %session_id, "transport handshake accepted");
                return Ok((origin, events));
            }
            WireMessage::TransportHandshake(_) => {
                // Duplicate handshake after pinning: dropped.
                trace!("dropping duplicate transport handshake");
            }
            other => return Err(TransportError::unexpected("AwaitingAccepted", other.tag())),
        }
    }
}

/// Parameters for the inner transport engine.
pub(crate) struct InnerConnectParams<'a> {
    pub versions: &'a VersionRange,
    pub timeout: Duration,
}

/// Drive the transport handshake from the inner side.
///
/// Speaks first with the phase's single wildcard-targeted post, validates
/// and pins the replying origin, echoes the session id, and hands back the
/// live event stream for MCP traffic.
pub(crate) async fn run_inner_connect(
    control: &dyn WindowControl,
    params: InnerConnectParams<'_>,
    cancel: &CancellationToken,
) -> TransportResult<(Origin, SessionId, WindowEvents)> {
    let mut events = control.subscribe();
    let clock = PhaseClock::start(Phase::Transport, params.timeout);

    control.post(
        &WireMessage::TransportHandshake(TransportHandshake {
            protocol_version: params.versions.max().clone(),
        }),
        &TargetOrigin::Wildcard,
    )?;
    debug!("transport handshake sent, awaiting reply");

    // AwaitingReply
    loop {
        let (origin, message) = next_message(&mut events, &clock, cancel).await?;
        match message {
            WireMessage::TransportHandshakeReply(reply) => {
                if !params.versions.supports(&reply.protocol_version) {
                    return Err(TransportError::VersionMismatch {
                        advertised: reply.protocol_version,
                        supported: params.versions.clone(),
                    });
                }
                control.pin_origin(&origin)?;

                // SentAccepted
                control.post(
                    &WireMessage::TransportAccepted(TransportAccepted {
                        session_id: reply.session_id.clone(),
                    }),
                    &TargetOrigin::Pinned(origin.clone()),
                )?;
                debug!(%origin, session = %reply.session_id, "transport handshake accepted");
                return Ok((origin, reply.session_id, events));
            }
            other => return Err(TransportError::unexpected("AwaitingReply", other.tag())),
        }
    }
}
