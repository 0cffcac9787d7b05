//! Deadline-Bounded Handshake Waits
//!
//! Every await for an inbound handshake record is bounded by the phase
//! deadline and by the caller's cancellation token. The phase timer starts
//! at the engine's first outbound action and is shared across all waits of
//! that phase, so a slow peer cannot stretch a handshake by answering one
//! step at a time.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

// Layer 3: Internal module imports
use crate::protocol::{Origin, Phase, TransportError, TransportResult, WireMessage};
use crate::window::control::{WindowEvent, WindowEvents};

/// One phase's handshake deadline.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PhaseClock {
    phase: Phase,
    deadline: Instant,
    timeout_ms: u64,
}

impl PhaseClock {
    /// Start the phase timer now.
    ///
    /// A zero timeout produces an already-expired deadline: the next wait
    /// fails immediately, as the configuration surface documents.
    pub(crate) fn start(phase: Phase, timeout: Duration) -> Self {
        Self {
            phase,
            deadline: Instant::now() + timeout,
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    fn timeout_error(&self) -> TransportError {
        TransportError::timeout(self.phase, self.timeout_ms)
    }
}

/// Wait for the next accepted protocol record.
///
/// Resolution order is deliberate: cancellation beats the deadline, and the
/// deadline beats a queued record, so `timeout_ms = 0` fails deterministically
/// even when the peer already spoke.
pub(crate) async fn next_message(
    events: &mut WindowEvents,
    clock: &PhaseClock,
    cancel: &CancellationToken,
) -> TransportResult<(Origin, WireMessage)> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
        _ = tokio::time::sleep_until(clock.deadline) => Err(clock.timeout_error()),
        event = events.recv() => match event {
            Some(WindowEvent::Message { origin, message }) => Ok((origin, message)),
            Some(WindowEvent::Disconnected) | None => Err(TransportError::PeerClosed),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn zero_timeout_fails_even_with_a_queued_record() {
        let (sender, mut events) = mpsc::unbounded_channel();
        sender
            .send(WindowEvent::Disconnected)
            .expect("receiver alive");

        let clock = PhaseClock::start(Phase::Setup, Duration::ZERO);
        let cancel = CancellationToken::new();

        let err = next_message(&mut events, &clock, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::HandshakeTimeout {
                phase: Phase::Setup,
                timeout_ms: 0,
            }
        ));
    }

    #[tokio::test]
    async fn cancellation_beats_the_deadline() {
        let (_sender, mut events) = mpsc::unbounded_channel();
        let clock = PhaseClock::start(Phase::Transport, Duration::ZERO);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = next_message(&mut events, &clock, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
    }

    #[tokio::test]
    async fn closed_stream_reads_as_peer_gone() {
        let (sender, mut events) = mpsc::unbounded_channel();
        drop(sender);

        let clock = PhaseClock::start(Phase::Transport, Duration::from_secs(5));
        let cancel = CancellationToken::new();

        let err = next_message(&mut events, &clock, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::PeerClosed));
    }
}
