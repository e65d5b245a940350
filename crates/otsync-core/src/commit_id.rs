//! Commit identifiers and their compact byte encoding.
//!
//! A [`CommitId`] names a point in an append-only history graph. The graph
//! itself lives outside this crate; the codec here is what storage and
//! transport layers use to move ids around.
//!
//! # Wire format
//!
//! | Tag | Payload | Meaning |
//! |-----|---------|---------|
//! | `0x00` | none | root sentinel |
//! | `0x01` | unsigned LEB128 varint, minimal, at most 10 bytes | ordinal |
//!
//! Any other tag is reserved for future identity kinds (content hashes) and
//! is rejected. Decoding refuses non-minimal varints and trailing bytes, so
//! every id has exactly one accepted encoding and byte equality coincides
//! with id equality.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const TAG_ROOT: u8 = 0x00;
const TAG_ORDINAL: u8 = 0x01;

/// Longest varint needed for a `u64`.
const MAX_VARINT_LEN: usize = 10;

/// Longest encoding of any [`CommitId`].
pub const MAX_ENCODED_LEN: usize = 1 + MAX_VARINT_LEN;

const ROOT_TEXT: &str = "root";

/// Identity of a commit in the history graph.
///
/// `Root` sorts before every ordinal, ordinals sort numerically. Diff types
/// that break ties by commit may rely on this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum CommitId {
    /// The reserved "no prior history" sentinel
    #[default]
    Root,
    /// A commit derived from history, identified by its ordinal
    Ordinal(u64),
}

impl CommitId {
    /// The root sentinel.
    #[must_use]
    pub const fn root() -> Self {
        Self::Root
    }

    /// An id for the given ordinal.
    #[must_use]
    pub const fn from_ordinal(ordinal: u64) -> Self {
        Self::Ordinal(ordinal)
    }

    /// Whether this is the root sentinel.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }

    /// The ordinal, or `None` for the root.
    #[must_use]
    pub const fn ordinal(&self) -> Option<u64> {
        match self {
            Self::Root => None,
            Self::Ordinal(ordinal) => Some(*ordinal),
        }
    }

    /// Number of bytes [`CommitId::to_bytes`] produces.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Root => 1,
            Self::Ordinal(ordinal) => 1 + varint_len(*ordinal),
        }
    }

    /// Serialize to bytes for storage or wire transfer.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut bytes);
        bytes
    }

    /// Append the encoding to an existing buffer.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Root => buf.push(TAG_ROOT),
            Self::Ordinal(ordinal) => {
                buf.push(TAG_ORDINAL);
                write_varint(*ordinal, buf);
            }
        }
    }

    /// Deserialize from bytes. The whole input must be one encoded id.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Truncated`] if the input ends early, and another
    /// variant if it is malformed or followed by extra bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let (id, consumed) = Self::read_prefix(bytes)?;
        if consumed < bytes.len() {
            return Err(ParseError::TrailingBytes(bytes.len() - consumed));
        }
        Ok(id)
    }

    /// Decode an id from the start of a larger buffer.
    ///
    /// Returns the id and the number of bytes it occupied.
    ///
    /// # Errors
    ///
    /// Same as [`CommitId::parse`], except that trailing bytes are allowed.
    pub fn read_prefix(bytes: &[u8]) -> Result<(Self, usize), ParseError> {
        let Some(&tag) = bytes.first() else {
            return Err(ParseError::Truncated {
                expected: 1,
                actual: 0,
            });
        };

        match tag {
            TAG_ROOT => Ok((Self::Root, 1)),
            TAG_ORDINAL => {
                let (ordinal, end) = read_varint(bytes, 1)?;
                Ok((Self::Ordinal(ordinal), end))
            }
            other => Err(ParseError::UnknownTag(other)),
        }
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str(ROOT_TEXT),
            Self::Ordinal(ordinal) => write!(f, "{ordinal}"),
        }
    }
}

impl FromStr for CommitId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ROOT_TEXT {
            return Ok(Self::Root);
        }
        s.parse::<u64>()
            .map(Self::Ordinal)
            .map_err(|_| ParseError::InvalidText(s.to_string()))
    }
}

impl From<u64> for CommitId {
    fn from(ordinal: u64) -> Self {
        Self::Ordinal(ordinal)
    }
}

impl Serialize for CommitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_bytes(&self.to_bytes())
        }
    }
}

impl<'de> Deserialize<'de> for CommitId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_str(CommitIdVisitor)
        } else {
            deserializer.deserialize_bytes(CommitIdVisitor)
        }
    }
}

struct CommitIdVisitor;

impl<'de> Visitor<'de> for CommitIdVisitor {
    type Value = CommitId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a commit id as text or encoded bytes")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        CommitId::parse(v).map_err(E::custom)
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut bytes = Vec::with_capacity(MAX_ENCODED_LEN);
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        CommitId::parse(&bytes).map_err(de::Error::custom)
    }
}

/// Errors that can occur when decoding a [`CommitId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Input ended before the encoding was complete
    #[error("truncated commit id: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum byte count needed to make progress
        expected: usize,
        /// Actual byte count
        actual: usize,
    },
    /// Tag byte is not a known identity kind
    #[error("unknown commit id tag {0:#04x}")]
    UnknownTag(u8),
    /// Ordinal does not fit in 64 bits
    #[error("commit ordinal overflows 64 bits")]
    Overflow,
    /// Ordinal varint has redundant trailing zero groups
    #[error("commit ordinal is not minimally encoded")]
    NonCanonical,
    /// Bytes left over after a complete id
    #[error("{0} trailing bytes after commit id")]
    TrailingBytes(usize),
    /// Text form is neither `root` nor a decimal ordinal
    #[error("invalid commit id text: {0:?}")]
    InvalidText(String),
}

fn varint_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

#[allow(clippy::cast_possible_truncation)]
fn write_varint(mut value: u64, buf: &mut Vec<u8>) {
    while value >= 0x80 {
        buf.push((value & 0x7f) as u8 | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Read a varint starting at `start`, returning the value and the end offset.
fn read_varint(bytes: &[u8], start: usize) -> Result<(u64, usize), ParseError> {
    let mut value = 0u64;
    let mut shift = 0u32;

    for (index, &byte) in bytes[start..].iter().enumerate() {
        // The tenth group carries only the top bit of a u64.
        if index == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(ParseError::Overflow);
        }

        value |= u64::from(byte & 0x7f) << shift;

        if byte & 0x80 == 0 {
            if byte == 0 && index > 0 {
                return Err(ParseError::NonCanonical);
            }
            return Ok((value, start + index + 1));
        }
        shift += 7;
    }

    Err(ParseError::Truncated {
        expected: bytes.len() + 1,
        actual: bytes.len(),
    })
}
