//! Origins, Targeting, and the Write-Once Pin
//!
//! Origin handling follows the browser security model: an origin is the
//! exact `scheme://host[:port]` string reported by the host for a sender
//! window, and all comparisons are exact string matches. No port or case
//! normalization is applied beyond what the host itself performs, so
//! `https://a.example` and `https://a.example:443` are distinct origins.
//!
//! [`PinnedOrigin`] is the write-once slot at the heart of the trust model:
//! the first accepted inbound message of a phase records its origin, and for
//! the rest of that phase the pinned value is both the only acceptable
//! sender origin and the only acceptable target origin.

// Layer 1: Standard library imports
use std::fmt;
use std::sync::OnceLock;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use url::Url;

// Layer 3: Internal module imports
use super::errors::{TransportError, TransportResult};

/// Exact origin string (`scheme://host[:port]`) as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    /// Create an origin from its exact string form.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidOrigin`] if the string is empty, is
    /// the wildcard literal `*`, lacks a `scheme://` prefix, or carries a
    /// path component (trailing `/`).
    pub fn new(origin: impl Into<String>) -> TransportResult<Self> {
        let origin = origin.into();
        if Self::is_valid(&origin) {
            Ok(Self(origin))
        } else {
            Err(TransportError::InvalidOrigin { value: origin })
        }
    }

    /// Derive the origin of a URL, in the host's ASCII serialization.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidOrigin`] for URLs with an opaque
    /// origin (`data:`, `blob:` without authority, ...), which can never
    /// participate in the handshake.
    pub fn from_url(url: &Url) -> TransportResult<Self> {
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(TransportError::InvalidOrigin {
                value: url.as_str().to_string(),
            });
        }
        Ok(Self(origin.ascii_serialization()))
    }

    /// The exact origin string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(origin: &str) -> bool {
        if origin.is_empty() || origin == "*" {
            return false;
        }
        let Some((scheme, rest)) = origin.split_once("://") else {
            return false;
        };
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            && !rest.is_empty()
            && !rest.contains('/')
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target origin for an outbound post.
///
/// The wildcard form is the literal `*` handed to the host when the sender
/// does not yet know the peer's origin. It is legal at most once per phase
/// per side, and only before pinning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOrigin {
    /// Deliver regardless of the receiving window's origin.
    Wildcard,
    /// Deliver only if the receiving window currently has this origin.
    Pinned(Origin),
}

impl TargetOrigin {
    /// The string handed to the host (`*` or the exact origin).
    pub fn as_str(&self) -> &str {
        match self {
            TargetOrigin::Wildcard => "*",
            TargetOrigin::Pinned(origin) => origin.as_str(),
        }
    }

    /// Whether this target permits delivery to a window with `origin`.
    pub fn permits(&self, origin: &Origin) -> bool {
        match self {
            TargetOrigin::Wildcard => true,
            TargetOrigin::Pinned(pinned) => pinned == origin,
        }
    }
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configured origin allowlist for an endpoint.
///
/// A `*` entry accepts any origin; otherwise entries are exact-match. An
/// empty list rejects everything.
///
/// # Examples
///
/// ```rust
/// use crossframe_mcp::protocol::{AllowedOrigins, Origin};
///
/// let allow = AllowedOrigins::exact(["https://a.example"])?;
/// assert!(allow.permits(&Origin::new("https://a.example")?));
/// // Exact string match: the explicit default port is a different origin.
/// assert!(!allow.permits(&Origin::new("https://a.example:443")?));
/// # Ok::<(), crossframe_mcp::protocol::TransportError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Accept any origin (`*`).
    Any,
    /// Accept exactly these origins.
    Exact(Vec<Origin>),
}

impl AllowedOrigins {
    /// Build an allowlist from configured entries.
    ///
    /// A `*` entry anywhere in the list makes the whole list wildcard, the
    /// way the configuration surface documents it.
    pub fn parse<I, S>(entries: I) -> TransportResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut origins = Vec::new();
        for entry in entries {
            let entry = entry.as_ref();
            if entry == "*" {
                return Ok(Self::Any);
            }
            origins.push(Origin::new(entry)?);
        }
        Ok(Self::Exact(origins))
    }

    /// Build an exact-match allowlist (no wildcard interpretation).
    pub fn exact<I, S>(entries: I) -> TransportResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let origins = entries
            .into_iter()
            .map(|entry| Origin::new(entry.as_ref()))
            .collect::<TransportResult<Vec<_>>>()?;
        Ok(Self::Exact(origins))
    }

    /// Whether `origin` may open a handshake with this endpoint.
    pub fn permits(&self, origin: &Origin) -> bool {
        match self {
            AllowedOrigins::Any => true,
            AllowedOrigins::Exact(origins) => origins.contains(origin),
        }
    }
}

/// Write-once slot recording the peer origin for the current container.
///
/// Pinning the same origin again is idempotent; pinning a different origin
/// is a hard error rather than an overwrite. The slot lives and dies with
/// its container: a fresh phase gets a fresh slot.
#[derive(Debug, Default)]
pub struct PinnedOrigin {
    slot: OnceLock<Origin>,
}

impl PinnedOrigin {
    /// Create an unpinned slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The pinned origin, if any.
    pub fn get(&self) -> Option<&Origin> {
        self.slot.get()
    }

    /// Whether the slot holds a value.
    pub fn is_pinned(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Record the peer origin.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::OriginConflict`] if a different origin is
    /// already pinned.
    pub fn pin(&self, origin: &Origin) -> TransportResult<()> {
        let pinned = self.slot.get_or_init(|| origin.clone());
        if pinned == origin {
            Ok(())
        } else {
            Err(TransportError::OriginConflict {
                pinned: pinned.clone(),
                attempted: origin.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_validation() {
        assert!(Origin::new("https://peer.example").is_ok());
        assert!(Origin::new("http://localhost:5173").is_ok());
        assert!(Origin::new("https://a.example:443").is_ok());

        assert!(Origin::new("").is_err());
        assert!(Origin::new("*").is_err());
        assert!(Origin::new("no-scheme.example").is_err());
        assert!(Origin::new("https://peer.example/").is_err());
    }

    #[test]
    fn origin_from_url_drops_path_and_fragment() {
        let url = Url::parse("https://peer.example/app/index.html#setup").unwrap();
        let origin = Origin::from_url(&url).unwrap();
        assert_eq!(origin.as_str(), "https://peer.example");

        let url = Url::parse("http://localhost:5173/tool").unwrap();
        assert_eq!(
            Origin::from_url(&url).unwrap().as_str(),
            "http://localhost:5173"
        );
    }

    #[test]
    fn origin_from_opaque_url_is_rejected() {
        let url = Url::parse("data:text/plain,hello").unwrap();
        assert!(Origin::from_url(&url).is_err());
    }

    #[test]
    fn allowlist_exact_match_no_port_normalization() {
        let allow = AllowedOrigins::parse(["https://a.example"]).unwrap();
        let with_port = Origin::new("https://a.example:443").unwrap();
        assert!(!allow.permits(&with_port));
        assert!(allow.permits(&Origin::new("https://a.example").unwrap()));
    }

    #[test]
    fn allowlist_wildcard_and_empty() {
        let any = AllowedOrigins::parse(["*"]).unwrap();
        assert!(any.permits(&Origin::new("https://anything.example").unwrap()));

        let none = AllowedOrigins::parse(Vec::<&str>::new()).unwrap();
        assert!(!none.permits(&Origin::new("https://anything.example").unwrap()));
    }

    #[test]
    fn pin_is_write_once() {
        let slot = PinnedOrigin::new();
        let a = Origin::new("https://a.example").unwrap();
        let b = Origin::new("https://b.example").unwrap();

        assert!(!slot.is_pinned());
        slot.pin(&a).unwrap();
        assert_eq!(slot.get(), Some(&a));

        // Re-pinning the same origin is idempotent.
        slot.pin(&a).unwrap();

        // A different origin is refused, not overwritten.
        let err = slot.pin(&b).unwrap_err();
        assert!(matches!(err, TransportError::OriginConflict { .. }));
        assert_eq!(slot.get(), Some(&a));
    }

    #[test]
    fn target_origin_permits() {
        let peer = Origin::new("https://peer.example").unwrap();
        let other = Origin::new("https://other.example").unwrap();

        assert!(TargetOrigin::Wildcard.permits(&peer));
        assert!(TargetOrigin::Pinned(peer.clone()).permits(&peer));
        assert!(!TargetOrigin::Pinned(peer).permits(&other));
    }
}
