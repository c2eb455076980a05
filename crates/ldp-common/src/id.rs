//! Opaque object identifiers
//!
//! Every public identifier in LDP (file records, job records) is an opaque
//! 24-lowercase-hex-character string: a 4-byte unix-seconds prefix followed
//! by 8 random bytes. The timestamp prefix keeps freshly generated ids
//! roughly sortable by creation time, which plays well with index locality;
//! the random tail makes collisions implausible across processes.
//!
//! Identifiers are format-validated at the API boundary before any database
//! lookup happens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Length of the hex-encoded identifier.
pub const OBJECT_ID_LEN: usize = 24;

/// Error returned when parsing a malformed identifier
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid object id '{value}': expected {OBJECT_ID_LEN} lowercase hex characters")]
pub struct ParseObjectIdError {
    pub value: String,
}

/// An opaque 24-hex-character identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        let secs = chrono::Utc::now().timestamp() as u32;
        let random = Uuid::new_v4();

        let mut out = String::with_capacity(OBJECT_ID_LEN);
        for byte in secs.to_be_bytes() {
            push_hex(&mut out, byte);
        }
        for byte in &random.as_bytes()[..8] {
            push_hex(&mut out, *byte);
        }

        Self(out)
    }

    /// Check whether a string has the identifier format without allocating.
    pub fn is_valid(value: &str) -> bool {
        value.len() == OBJECT_ID_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    /// Parse an identifier, rejecting anything that is not 24 lowercase hex
    /// characters.
    pub fn parse(value: &str) -> Result<Self, ParseObjectIdError> {
        if Self::is_valid(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(ParseObjectIdError {
                value: value.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn push_hex(out: &mut String, byte: u8) {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    out.push(HEX[(byte >> 4) as usize] as char);
    out.push(HEX[(byte & 0x0f) as usize] as char);
}
