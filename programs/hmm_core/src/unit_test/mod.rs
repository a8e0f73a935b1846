//! Unit tests, one file per module.

pub mod position_test;

use rust_decimal::Decimal;

use crate::pool_state::{Pool, PoolConfig};
use crate::token_pair::{Token, TokenPair};

/// Builds a pool over a test pair.
pub(crate) fn test_pool(
    bootstrap_rp: Decimal,
    tick_spacing: i32,
    hmm_c: Decimal,
    fee_rate: Decimal,
) -> Pool {
    let pair = TokenPair::new(Token::new("HYS", 6), Token::new("USD", 6)).unwrap();
    Pool::new(pair, bootstrap_rp, PoolConfig::new(tick_spacing, hmm_c, fee_rate)).unwrap()
}

/// Asserts two decimals agree within an absolute tolerance.
pub(crate) fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    let difference = (actual - expected).abs();
    assert!(
        difference <= tolerance,
        "expected {expected}, got {actual} (difference {difference} > tolerance {tolerance})"
    );
}
