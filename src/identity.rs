//! `/`-rooted hierarchical identity paths.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::{Result, RuntimeError};

/// Root identity, `/`.
pub const ROOT: &str = "/";

/// Reserved path segment under which an actor's actlets are namespaced.
pub const ACTLET_SEGMENT: &str = "actlet";

/// Reserved path segment, nested under `actlet`, namespacing timers.
pub const TIMER_SEGMENT: &str = "timer";

static SEGMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("valid regex"));

/// A `/`-separated hierarchical actor identity, rooted at `/`.
///
/// Windows-style `\` separators are deliberately not supported; this is a
/// constraint, not an oversight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Identity(String);

impl Identity {
    /// The root identity, `/`.
    pub fn root() -> Self {
        Identity(ROOT.to_string())
    }

    /// Construct an identity from an already-composed path string, without
    /// per-segment name validation. Used internally once a path has been
    /// synthesised via [`Identity::join`].
    fn from_path(path: String) -> Self {
        debug_assert!(path.starts_with('/'));
        Identity(path)
    }

    /// Validate a single path segment (an actor name, an actlet name, ...).
    ///
    /// Segments must be non-empty and contain only ASCII letters, digits,
    /// `_`, `-`, or `.`; in particular they must not contain `/` or `\`.
    pub fn validate_segment(name: &str) -> Result<()> {
        if !SEGMENT_RE.is_match(name) {
            return Err(RuntimeError::BadRegistration(format!(
                "invalid identity segment: {name:?}"
            )));
        }
        Ok(())
    }

    /// Join a base identity with a relative (or absolute) path component,
    /// mirroring `pathlib.Path(base) / rel` semantics: an absolute `rel`
    /// (one that starts with `/`) entirely replaces `base`.
    pub fn join(base: &Identity, rel: &str) -> Result<Identity> {
        if rel.contains('\\') {
            return Err(RuntimeError::BadRegistration(format!(
                "identity segments must be unix-style, got {rel:?}"
            )));
        }
        if let Some(stripped) = rel.strip_prefix('/') {
            let cleaned = Self::normalise(stripped)?;
            return Ok(Identity::from_path(format!("/{cleaned}")));
        }

        let base_str = base.as_str();
        let cleaned = Self::normalise(rel)?;
        let joined = if base_str == ROOT {
            format!("/{cleaned}")
        } else {
            format!("{base_str}/{cleaned}")
        };
        Ok(Identity::from_path(joined))
    }

    fn normalise(rel: &str) -> Result<String> {
        let segments: Vec<&str> = rel.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(RuntimeError::BadRegistration("empty identity segment".into()));
        }
        for seg in &segments {
            Self::validate_segment(seg)?;
        }
        Ok(segments.join("/"))
    }

    /// The full qualified name of an actlet owned by this identity.
    pub fn actlet(&self, name: &str) -> Result<Identity> {
        Self::validate_segment(name)?;
        Identity::join(self, &format!("{ACTLET_SEGMENT}/{name}"))
    }

    /// The full qualified name of a timer owned by this identity.
    pub fn timer(&self, name: &str) -> Result<Identity> {
        Self::validate_segment(name)?;
        Identity::join(self, &format!("{ACTLET_SEGMENT}/{TIMER_SEGMENT}/{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_relative_under_root() {
        let base = Identity::root();
        let joined = Identity::join(&base, "a").unwrap();
        assert_eq!(joined.as_str(), "/a");
    }

    #[test]
    fn join_relative_under_nonroot() {
        let base = Identity::from_path("/a".to_string());
        let joined = Identity::join(&base, "b").unwrap();
        assert_eq!(joined.as_str(), "/a/b");
    }

    #[test]
    fn join_absolute_replaces_base() {
        let base = Identity::from_path("/a".to_string());
        let joined = Identity::join(&base, "/b").unwrap();
        assert_eq!(joined.as_str(), "/b");
    }

    #[test]
    fn join_rejects_backslash() {
        let base = Identity::root();
        assert!(Identity::join(&base, "a\\b").is_err());
    }

    #[test]
    fn actlet_and_timer_names() {
        let base = Identity::from_path("/worker".to_string());
        assert_eq!(base.actlet("fetch").unwrap().as_str(), "/worker/actlet/fetch");
        assert_eq!(
            base.timer("heartbeat").unwrap().as_str(),
            "/worker/actlet/timer/heartbeat"
        );
    }

    #[test]
    fn invalid_segment_rejected() {
        assert!(Identity::validate_segment("").is_err());
        assert!(Identity::validate_segment("has/slash").is_err());
        assert!(Identity::validate_segment("ok-name_1.2").is_ok());
    }
}
