use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters a session code is drawn from (base 36, uppercase).
pub const SESSION_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Short, human-typeable session code such as `AB12CD`.
///
/// Codes are case-normalised on the way in, so `ab12cd` and ` AB12CD `
/// name the same session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Draw a fresh random code of `len` characters.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Self {
        let code = (0..len)
            .map(|_| {
                let idx = rng.gen_range(0..SESSION_CODE_ALPHABET.len());
                SESSION_CODE_ALPHABET[idx] as char
            })
            .collect();
        Self(code)
    }

    /// Normalise user input into a session code.
    pub fn parse(input: &str) -> Self {
        Self(input.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned to a transport connection at accept time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(new_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
