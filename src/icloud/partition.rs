//! Share token parsing.
//!
//! Public shared-album tokens encode the server partition in their leading
//! characters as a base-62 number. Tokens starting with `A` carry a single
//! partition digit; all others carry two.

use std::fmt;

use super::error::StreamError;

const BASE_62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Value of a single base-62 digit, or `None` for characters outside the alphabet.
fn base62_digit(c: u8) -> Option<u64> {
    BASE_62_ALPHABET
        .iter()
        .position(|&d| d == c)
        .map(|p| p as u64)
}

/// Positional base-62 decode: `value = value * 62 + digit`.
pub fn base62_to_int(part: &str) -> Option<u64> {
    part.bytes()
        .try_fold(0u64, |acc, c| Some(acc * 62 + base62_digit(c)?))
}

/// An opaque token granting read access to a public shared album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareToken {
    token: String,
    partition: u64,
}

impl ShareToken {
    /// Validate a token and decode its partition number up front, so a
    /// malformed token fails at configuration time instead of mid-cycle.
    pub fn parse(token: &str) -> Result<Self, StreamError> {
        let invalid = |reason| StreamError::InvalidToken {
            token: token.to_string(),
            reason,
        };
        if !token.is_ascii() {
            return Err(invalid("token must be ASCII"));
        }
        let digits = if token.starts_with('A') {
            token.get(1..2)
        } else {
            token.get(1..3)
        };
        let digits = digits.ok_or_else(|| invalid("token too short to carry a partition"))?;
        let partition =
            base62_to_int(digits).ok_or_else(|| invalid("partition is not base-62"))?;
        Ok(Self {
            token: token.to_string(),
            partition,
        })
    }

    pub fn partition(&self) -> u64 {
        self.partition
    }

    /// Regional host serving this album's stream.
    pub fn host(&self) -> String {
        format!("p{}-sharedstreams.icloud.com", self.partition)
    }
}

impl fmt::Display for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}
