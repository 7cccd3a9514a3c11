use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const MAX_KEY_LEN: usize = 128;

/// Extension appended to every collection file.
pub const FILE_EXTENSION: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key is empty")]
    Empty,
    #[error("key is {0} characters long, at most {max} allowed", max = MAX_KEY_LEN)]
    TooLong(usize),
    #[error("key contains disallowed character {0:?}")]
    InvalidChar(char),
}

/// A collection key that is safe to use as a file stem.
///
/// Only `[A-Za-z0-9_-]` is accepted, so a key can never contain a path
/// separator, a `..` segment or start a hidden file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidKey(String);

impl ValidKey {
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        if raw.is_empty() {
            return Err(KeyError::Empty);
        }
        let len = raw.chars().count();
        if len > MAX_KEY_LEN {
            return Err(KeyError::TooLong(len));
        }
        if let Some(c) = raw.chars().find(|c| !is_allowed(*c)) {
            return Err(KeyError::InvalidChar(c));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{key}.json`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, FILE_EXTENSION)
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

impl FromStr for ValidKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ValidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ValidKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
