//! Token descriptors for a pool.
//!
//! The core does integer-equivalent arithmetic on raw amounts; the decimal
//! scale carried here is informational, cached so callers can render
//! human-readable quantities without a registry lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorCode, Result};

/// A fungible token: a display name and its decimal scale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Ticker or display name.
    pub name: String,
    /// Number of decimal places in the token's smallest unit.
    pub decimals: u8,
}

impl Token {
    pub fn new(name: impl Into<String>, decimals: u8) -> Self {
        Token {
            name: name.into(),
            decimals,
        }
    }
}

/// The ordered pair of tokens a pool trades, with Y as numeraire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// The base token X.
    pub x: Token,
    /// The quote token Y; all prices are expressed in Y per X.
    pub y: Token,
}

impl TokenPair {
    /// Builds a pair, rejecting identically named tokens.
    pub fn new(x: Token, y: Token) -> Result<Self> {
        if x.name == y.name {
            return Err(ErrorCode::InvalidInput("pair tokens must differ"));
        }
        Ok(TokenPair { x, y })
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.x.name, self.y.name)
    }
}
