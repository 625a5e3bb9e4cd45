//! Instrument identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange-assigned numeric instrument identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Token(pub u32);

impl Token {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Token {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// A tradable instrument. Immutable after catalog load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub token: Token,
    /// Trading symbol (e.g., "RELIANCE").
    pub symbol: String,
    /// Company name; falls back to the symbol when the catalog omits it.
    pub name: String,
}

impl Instrument {
    pub fn new(token: Token, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            token,
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}
