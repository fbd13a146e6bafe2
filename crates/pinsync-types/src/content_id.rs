use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Multibase prefix for lowercase base16.
const BASE16_PREFIX: char = 'f';

/// Number of characters kept by [`ContentId::short`].
const SHORT_LEN: usize = 12;

/// Content-derived identifier for a pinned DAG.
///
/// A `ContentId` holds the canonical textual form of a CID as reported by a
/// pinning backend (`Qm...` for CIDv0, `bafy...` for CIDv1). The textual form
/// encodes the content hash, so two identifiers are equal exactly when their
/// encoded hashes are equal. The engine never interprets the value beyond
/// validating that it is a plausible multibase string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    /// Parse and validate a textual identifier.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TypeError::EmptyContentId);
        }
        if s.len() < 2 {
            return Err(TypeError::InvalidContentId {
                value: s.into(),
                reason: "too short".into(),
            });
        }
        if !s.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(TypeError::InvalidContentId {
                value: s.into(),
                reason: "missing multibase prefix".into(),
            });
        }
        if let Some(bad) = s.chars().find(|c| !is_multibase_char(*c)) {
            return Err(TypeError::InvalidContentId {
                value: s.into(),
                reason: format!("unexpected character {bad:?}"),
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Derive an identifier from raw content (BLAKE3, multibase base16).
    pub fn for_content(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Self(format!("{BASE16_PREFIX}{}", hex::encode(hash.as_bytes())))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for compact log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(SHORT_LEN);
        &self.0[..end]
    }
}

/// Characters of the multibase alphabets, base64 and base64url included.
fn is_multibase_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '/' | '=')
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.short())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
