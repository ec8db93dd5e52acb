//! Canonical identifiers for two-party chats.
//!
//! A chat between `alice` and `bob` may arrive as `"alice:bob"` or
//! `"bob:alice"`. Storage and cache keys always use the canonical form, where
//! the two participants are sorted lexicographically.

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Separator between the two participant identifiers.
pub const SEPARATOR: char = ':';

/// Checks that `raw` names exactly two non-empty participants.
pub fn validate(raw: &str) -> Result<(), ValidationError> {
    split_pair(raw).map(|_| ())
}

/// Sorts the participants of `raw` and joins them back together.
///
/// Works on any input (it never fails), and `normalize(normalize(x))` is
/// always `normalize(x)`. Callers are expected to [`validate`] first.
pub fn normalize(raw: &str) -> String {
    let mut parts: Vec<&str> = raw.split(SEPARATOR).collect();
    parts.sort_unstable();
    parts.join(&SEPARATOR.to_string())
}

fn split_pair(raw: &str) -> Result<(&str, &str), ValidationError> {
    let mut parts = raw.split(SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) if !a.is_empty() && !b.is_empty() => Ok((a, b)),
        _ => Err(ValidationError::InvalidChatId),
    }
}

/// A validated, canonical chat id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId {
    canonical: String,
    /// Byte offset of the separator inside `canonical`.
    split: usize,
}

impl ChatId {
    /// Validates `raw` and converts it to canonical form.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let (a, b) = split_pair(raw)?;
        Ok(Self::from_participants(a, b))
    }

    /// Builds the chat between two (already non-empty) participants.
    pub fn from_participants(a: &str, b: &str) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            canonical: format!("{low}{SEPARATOR}{high}"),
            split: low.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// The two participants, in canonical order.
    pub fn participants(&self) -> (&str, &str) {
        (
            &self.canonical[..self.split],
            &self.canonical[self.split + SEPARATOR.len_utf8()..],
        )
    }

    /// The participant on the other side of `sender`, i.e. the receiver of a
    /// message `sender` writes into this chat.
    ///
    /// Returns `None` when `sender` is not a member. For a chat whose halves
    /// are identical the "other side" is the sender itself.
    pub fn counterpart(&self, sender: &str) -> Option<&str> {
        let (a, b) = self.participants();
        if sender == a {
            Some(b)
        } else if sender == b {
            Some(a)
        } else {
            None
        }
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl FromStr for ChatId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ChatId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
