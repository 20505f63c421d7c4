//! Checkpoint token type.
//!
//! `Checkpoint` is a newtype wrapper around `SmolStr` for the opaque,
//! totally ordered position tokens a commit store assigns to its commits.
//! The ordering belongs to the store; this crate only ever compares
//! checkpoints for equality and uses them as map keys.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// An opaque position token assigned by a commit store.
///
/// Used as:
/// - the cursor a caller pages from,
/// - the cache key mapping a predecessor checkpoint to its successor
///   transaction,
/// - the tail marker recorded when a poll reaches the end of the log.
///
/// The empty token is the [`origin`](Checkpoint::origin) sentinel meaning
/// "from the beginning of the log" and is a valid cursor and cache key.
///
/// # Example
/// ```
/// use tailcast_core::Checkpoint;
///
/// let cp = Checkpoint::new("42");
/// assert_eq!(cp.as_str(), "42");
/// assert!(Checkpoint::origin().is_origin());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint(SmolStr);

impl Checkpoint {
    /// Creates a checkpoint from a store-assigned token.
    #[inline]
    pub fn new(token: impl Into<SmolStr>) -> Self {
        Self(token.into())
    }

    /// The sentinel cursor addressing the beginning of the log.
    #[inline]
    pub const fn origin() -> Self {
        Self(SmolStr::new_static(""))
    }

    /// Returns `true` for the [`origin`](Checkpoint::origin) sentinel.
    #[inline]
    pub fn is_origin(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the token as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Checkpoint {
    #[inline]
    fn from(s: &str) -> Self {
        Self(SmolStr::new(s))
    }
}

impl From<String> for Checkpoint {
    #[inline]
    fn from(s: String) -> Self {
        Self(SmolStr::from(s))
    }
}

impl From<SmolStr> for Checkpoint {
    #[inline]
    fn from(s: SmolStr) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Checkpoint {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}
