// ABOUTME: Phantom-typed engine identifiers for images and containers.
// ABOUTME: Normalises the `sha256:` prefix so IDs from every transport compare equal.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use thiserror::Error;

/// Marker types for phantom type parameters.
pub enum ImageMarker {}
pub enum ContainerMarker {}

/// Length of the abbreviated form shown to operators.
pub const SHORT_LEN: usize = 12;

const DIGEST_PREFIX: &str = "sha256:";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("identifier cannot be empty")]
    Empty,

    #[error("invalid character in identifier: '{0}'")]
    InvalidChar(char),
}

/// An engine-assigned identifier.
///
/// The phantom parameter keeps an image ID from being passed where a
/// container ID is expected. Values are stored without the `sha256:`
/// algorithm prefix the API reports, so `sha256:ab12..` and `ab12..` are the
/// same identity.
#[must_use = "IDs reference engine resources and should not be ignored"]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    /// Wrap an engine-reported identifier.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let value = match value.strip_prefix(DIGEST_PREFIX) {
            Some(rest) => rest.to_string(),
            None => value,
        };
        Self {
            value,
            _marker: PhantomData,
        }
    }

    /// Validate an identifier typed by an operator.
    ///
    /// Accepts full or abbreviated IDs as well as `repository:tag`
    /// references, which every engine resolves in place of an ID.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(IdError::Empty);
        }
        if let Some(c) = input
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, ':' | '/' | '.' | '-' | '_' | '@'))
        {
            return Err(IdError::InvalidChar(c));
        }
        Ok(Self::new(input))
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The first twelve characters, as engines print them.
    pub fn short(&self) -> &str {
        match self.value.char_indices().nth(SHORT_LEN) {
            Some((idx, _)) => &self.value[..idx],
            None => &self.value,
        }
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

// T is only a marker, so these impls must not require T: Trait.

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Id").field(&self.value).finish()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short())
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

pub type ImageId = Id<ImageMarker>;
pub type ContainerId = Id<ContainerMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_prefix_is_stripped() {
        let a = ImageId::new("sha256:0123456789abcdef0123");
        let b = ImageId::new("0123456789abcdef0123");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0123456789abcdef0123");
    }

    #[test]
    fn display_uses_short_form() {
        let id = ContainerId::new("0123456789abcdef0123");
        assert_eq!(id.to_string(), "0123456789ab");
        assert_eq!(ContainerId::new("abc").short(), "abc");
    }

    #[test]
    fn parse_rejects_shell_metacharacters() {
        assert_eq!(ImageId::parse("").unwrap_err(), IdError::Empty);
        assert_eq!(
            ImageId::parse("abc;rm").unwrap_err(),
            IdError::InvalidChar(';')
        );
        assert!(ImageId::parse("nginx:1.25").is_ok());
    }
}
