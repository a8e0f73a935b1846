//! Error taxonomy for pool operations.
//!
//! Every failure is classified by kind rather than by message text, and every
//! error is fatal to the enclosing operation: the pool either completes an
//! operation in full or is left untouched.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ErrorCode>;

/// The kinds of failure a pool operation can report.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A caller-supplied argument is out of domain: a non-positive swap
    /// amount, a negative deposit amount, an inverted price range, or a
    /// withdrawal against an unknown position.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The pool cannot honor the request with the liquidity or reserves it
    /// holds.
    #[error("insufficient liquidity: {0}")]
    InsufficientLiquidity(&'static str),

    /// A crossing was requested at a tick index that is not initialized.
    #[error("no active tick at index {0}")]
    NoActiveTick(i32),

    /// Internal bookkeeping produced a value that breaks a pool invariant
    /// (wrong-signed delta, negative adjustment, negative liquidity, or a
    /// price resting below the current tick).
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),

    /// A branch that the surrounding case analysis proves impossible.
    #[error("unreachable: {0}")]
    Unreachable(&'static str),
}
