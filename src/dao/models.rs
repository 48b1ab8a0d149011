use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix marking session ids created under the current storage scheme.
pub const V2_PREFIX: &str = "v2:";

/// Identifier of one persisted game session.
///
/// The id is opaque apart from its scheme prefix, which pins the session to a
/// backend family for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

/// Storage scheme a session id was minted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionScheme {
    /// Ids carrying the [`V2_PREFIX`] marker.
    V2,
    /// Ids minted before the prefix existed.
    Legacy,
}

impl SessionId {
    /// Mint a fresh id under the current scheme.
    pub fn generate() -> Self {
        Self(format!("{V2_PREFIX}{}", Uuid::new_v4()))
    }

    /// Scheme the id was minted under.
    pub fn scheme(&self) -> SessionScheme {
        if self.0.starts_with(V2_PREFIX) {
            SessionScheme::V2
        } else {
            SessionScheme::Legacy
        }
    }

    /// The raw id, prefix included.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_use_current_scheme() {
        let id = SessionId::generate();
        assert!(id.as_str().starts_with(V2_PREFIX));
        assert_eq!(id.scheme(), SessionScheme::V2);
    }

    #[test]
    fn unprefixed_ids_are_legacy() {
        assert_eq!(SessionId::from("abc").scheme(), SessionScheme::Legacy);
        // The marker has to lead the id.
        assert_eq!(SessionId::from("xv2:abc").scheme(), SessionScheme::Legacy);
        assert_eq!(SessionId::from("V2:abc").scheme(), SessionScheme::Legacy);
    }
}
