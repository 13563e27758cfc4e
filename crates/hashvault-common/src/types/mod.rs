//! Common types used across Hashvault

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::HashvaultError;

/// Length of an MD5 digest rendered as hex.
pub const MD5_HEX_LEN: usize = 32;

static MD5_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-fA-F0-9]{32}$").expect("static MD5 pattern is valid")
});

/// A validated, lower-cased MD5 hex digest.
///
/// Input may be mixed case; the stored form is always lower case so that the
/// store's uniqueness constraint sees one spelling per digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Md5Hash(String);

impl Md5Hash {
    /// Parse a token of exactly 32 hex characters.
    ///
    /// Surrounding whitespace is not stripped; callers trim first.
    pub fn parse(token: &str) -> Option<Self> {
        if token.len() != MD5_HEX_LEN || !MD5_PATTERN.is_match(token) {
            return None;
        }
        Some(Self(token.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Md5Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Md5Hash {
    type Err = HashvaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| HashvaultError::InvalidHash(s.to_string()))
    }
}

impl TryFrom<String> for Md5Hash {
    type Error = HashvaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Md5Hash> for String {
    fn from(hash: Md5Hash) -> Self {
        hash.0
    }
}

impl AsRef<str> for Md5Hash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
