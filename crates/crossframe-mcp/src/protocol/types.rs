//! Core Protocol Types and Domain-Specific Newtypes
//!
//! Domain types shared by the wire schema, the handshake engines, and the
//! embedding API: protocol versions and the negotiated range, session ids,
//! the phase enumeration with its URL-fragment encoding, and the setup
//! outcome structures persisted by the embedding layer.
//!
//! All validated types keep their internal representation private and are
//! constructed through checked constructors, so an invalid protocol record
//! cannot be assembled by accident.

// Layer 1: Standard library imports
use std::fmt;
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

// Layer 3: Internal module imports
use super::constants::{DEFAULT_HANDSHAKE_TIMEOUT_MS, PROTOCOL_VERSION, SETUP_FRAGMENT};
use super::errors::{TransportError, TransportResult};

/// Wire protocol version in `MAJOR.MINOR` form.
///
/// Both sides send their supported version in the opening message of each
/// phase; the accepting side checks it against its [`VersionRange`].
///
/// # Examples
///
/// ```rust
/// use crossframe_mcp::protocol::ProtocolVersion;
///
/// let version = ProtocolVersion::current();
/// assert_eq!(version.as_str(), "1.0");
/// assert!(ProtocolVersion::new("2.1").is_ok());
/// assert!(ProtocolVersion::new("two-point-one").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(String);

impl ProtocolVersion {
    /// The version this implementation speaks.
    pub const CURRENT: &'static str = PROTOCOL_VERSION;

    /// Create a version with `MAJOR.MINOR` validation.
    pub fn new(version: impl Into<String>) -> TransportResult<Self> {
        let version = version.into();
        if Self::components_of(&version).is_some() {
            Ok(Self(version))
        } else {
            Err(TransportError::invalid_config(format!(
                "invalid protocol version {version:?}"
            )))
        }
    }

    /// The current protocol version; never fails.
    pub fn current() -> Self {
        Self(Self::CURRENT.to_string())
    }

    /// The version string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn components_of(version: &str) -> Option<(u64, u64)> {
        let (major, minor) = version.split_once('.')?;
        if major.is_empty() || minor.is_empty() {
            return None;
        }
        Some((major.parse().ok()?, minor.parse().ok()?))
    }

    /// Numeric components; `(0, 0)` only for values that bypassed
    /// validation through deserialization of a malformed peer record.
    fn components(&self) -> (u64, u64) {
        Self::components_of(&self.0).unwrap_or((0, 0))
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive `[min, max]` window of acceptable peer versions.
///
/// Bounds compare numerically by `(major, minor)`, so `"10.0"` sorts after
/// `"9.0"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    min: ProtocolVersion,
    max: ProtocolVersion,
}

impl VersionRange {
    /// Create a range; `min` must not exceed `max`.
    pub fn new(min: ProtocolVersion, max: ProtocolVersion) -> TransportResult<Self> {
        if min.components() > max.components() {
            return Err(TransportError::invalid_config(format!(
                "version range minimum {min} exceeds maximum {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Range containing only one version.
    pub fn single(version: ProtocolVersion) -> Self {
        Self {
            min: version.clone(),
            max: version,
        }
    }

    /// Lowest acceptable version.
    pub fn min(&self) -> &ProtocolVersion {
        &self.min
    }

    /// Highest acceptable version; also the version this side advertises.
    pub fn max(&self) -> &ProtocolVersion {
        &self.max
    }

    /// Whether a peer-advertised version satisfies this window.
    pub fn supports(&self, version: &ProtocolVersion) -> bool {
        let candidate = version.components();
        candidate >= self.min.components() && candidate <= self.max.components()
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::single(ProtocolVersion::current())
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}..={}", self.min, self.max)
        }
    }
}

/// Opaque session identifier minted by the outer endpoint.
///
/// Echoed by the inner endpoint in its handshake reply and tied 1:1 to a
/// handshake; the embedding layer uses it to key persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh random session id.
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Adopt an id persisted by the embedding layer.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two container phases.
///
/// A container instance is bound to exactly one phase; once the phase
/// completes or errors the container is closed before any further use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// One-time configuration; produces a [`SetupResult`].
    Setup,
    /// Carries MCP traffic for one session.
    Transport,
}

impl Phase {
    /// Detect the phase signalled by a container URL.
    ///
    /// The fragment equals `setup` iff the outer endpoint is running the
    /// setup phase; any other fragment, or none, means transport.
    pub fn of_url(url: &Url) -> Self {
        if url.fragment() == Some(SETUP_FRAGMENT) {
            Phase::Setup
        } else {
            Phase::Transport
        }
    }

    /// Produce the container URL that signals this phase.
    pub fn apply_to_url(self, url: &Url) -> Url {
        let mut url = url.clone();
        match self {
            Phase::Setup => url.set_fragment(Some(SETUP_FRAGMENT)),
            Phase::Transport => url.set_fragment(None),
        }
        url
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => write!(f, "setup"),
            Phase::Transport => write!(f, "transport"),
        }
    }
}

/// Whether the transport-phase container must be shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityRequirement {
    /// The container must be visible while connected.
    Required,
    /// The embedder may show the container; see the optional message.
    Optional,
    /// The container must stay hidden.
    Hidden,
}

/// Persisted post-setup visibility policy for transport-phase runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportVisibility {
    pub requirement: VisibilityRequirement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional_message: Option<String>,
}

impl TransportVisibility {
    /// Policy with no accompanying message.
    pub fn of(requirement: VisibilityRequirement) -> Self {
        Self {
            requirement,
            optional_message: None,
        }
    }
}

impl Default for TransportVisibility {
    fn default() -> Self {
        // Servers that do not state a preference get a headless transport
        // frame; they can always request visibility during setup.
        Self::of(VisibilityRequirement::Hidden)
    }
}

/// Terminal status of a setup phase as reported by the inner endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupStatus {
    Success,
    Error,
}

/// Machine-readable reasons a setup phase can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetupErrorCode {
    UserCancelled,
    AuthFailed,
    Timeout,
    ConfigError,
}

impl fmt::Display for SetupErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupErrorCode::UserCancelled => write!(f, "USER_CANCELLED"),
            SetupErrorCode::AuthFailed => write!(f, "AUTH_FAILED"),
            SetupErrorCode::Timeout => write!(f, "TIMEOUT"),
            SetupErrorCode::ConfigError => write!(f, "CONFIG_ERROR"),
        }
    }
}

/// Failure detail carried by an error-status setup completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct SetupError {
    pub code: SetupErrorCode,
    pub message: String,
}

impl SetupError {
    pub fn new(code: SetupErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Successful outcome of a setup phase, delivered to the outer caller.
///
/// The embedding layer persists this (keyed by server) and feeds the
/// visibility policy back into later transport-phase connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupResult {
    /// Human-readable title the server chose for itself.
    pub server_title: String,
    /// Visibility policy for subsequent transport-phase containers.
    pub transport_visibility: TransportVisibility,
    /// One-shot message to surface to the user, not persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral_message: Option<String>,
}

/// Why a connected inner endpoint is asking for setup to be re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReSetupReason {
    AuthExpired,
    ConfigChanged,
    PermissionsChanged,
    Other,
}

/// Mid-session request from the inner endpoint to re-run setup.
///
/// Forwarded to the embedding layer rather than thrown; when
/// `can_continue` is `false` the channel is closed after reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequired {
    pub reason: ReSetupReason,
    pub message: String,
    pub can_continue: bool,
}

/// Default per-phase handshake timeout.
pub fn default_handshake_timeout() -> Duration {
    Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_validation() {
        assert!(ProtocolVersion::new("1.0").is_ok());
        assert!(ProtocolVersion::new("10.2").is_ok());
        assert!(ProtocolVersion::new("1").is_err());
        assert!(ProtocolVersion::new("1.").is_err());
        assert!(ProtocolVersion::new("a.b").is_err());
    }

    #[test]
    fn version_range_supports() {
        let range = VersionRange::default();
        assert!(range.supports(&ProtocolVersion::current()));
        assert!(!range.supports(&ProtocolVersion::new("2.0").unwrap()));

        let wide = VersionRange::new(
            ProtocolVersion::new("1.0").unwrap(),
            ProtocolVersion::new("2.0").unwrap(),
        )
        .unwrap();
        assert!(wide.supports(&ProtocolVersion::new("1.5").unwrap()));
        assert!(!wide.supports(&ProtocolVersion::new("2.1").unwrap()));

        // Bounds compare numerically, not lexicographically.
        let numeric = VersionRange::new(
            ProtocolVersion::new("2.0").unwrap(),
            ProtocolVersion::new("10.0").unwrap(),
        )
        .unwrap();
        assert!(numeric.supports(&ProtocolVersion::new("9.5").unwrap()));
        assert!(!numeric.supports(&ProtocolVersion::new("1.9").unwrap()));
    }

    #[test]
    fn version_range_rejects_inverted_bounds() {
        let result = VersionRange::new(
            ProtocolVersion::new("2.0").unwrap(),
            ProtocolVersion::new("1.0").unwrap(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn phase_detection_from_fragment() {
        let base = Url::parse("https://peer.example/app").unwrap();

        assert_eq!(Phase::of_url(&base), Phase::Transport);
        assert_eq!(
            Phase::of_url(&Url::parse("https://peer.example/app#setup").unwrap()),
            Phase::Setup
        );
        // Any other fragment means transport.
        assert_eq!(
            Phase::of_url(&Url::parse("https://peer.example/app#settings").unwrap()),
            Phase::Transport
        );
    }

    #[test]
    fn phase_applied_to_url() {
        let base = Url::parse("https://peer.example/app#whatever").unwrap();

        let setup = Phase::Setup.apply_to_url(&base);
        assert_eq!(setup.as_str(), "https://peer.example/app#setup");

        let transport = Phase::Transport.apply_to_url(&base);
        assert_eq!(transport.as_str(), "https://peer.example/app");
    }

    #[test]
    fn session_ids_are_unique_and_opaque() {
        let a = SessionId::mint();
        let b = SessionId::mint();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());

        let adopted = SessionId::new("persisted-session-7");
        assert_eq!(adopted.as_str(), "persisted-session-7");
    }

    #[test]
    fn visibility_serialization_shape() {
        let visibility = TransportVisibility {
            requirement: VisibilityRequirement::Optional,
            optional_message: Some("show me for OAuth".into()),
        };
        let value = serde_json::to_value(&visibility).unwrap();
        assert_eq!(value["requirement"], "optional");
        assert_eq!(value["optionalMessage"], "show me for OAuth");

        let hidden = serde_json::to_value(TransportVisibility::default()).unwrap();
        assert_eq!(hidden["requirement"], "hidden");
        assert!(hidden.get("optionalMessage").is_none());
    }

    #[test]
    fn setup_error_codes_wire_form() {
        let error = SetupError::new(SetupErrorCode::AuthFailed, "bad token");
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["code"], "AUTH_FAILED");
        assert_eq!(error.to_string(), "AUTH_FAILED: bad token");
    }

    #[test]
    fn re_setup_reason_wire_form() {
        let notice = SetupRequired {
            reason: ReSetupReason::AuthExpired,
            message: "token expired".into(),
            can_continue: false,
        };
        let value = serde_json::to_value(&notice).unwrap();
        assert_eq!(value["reason"], "AUTH_EXPIRED");
        assert_eq!(value["canContinue"], false);
    }
}
