//! Position-indexed state.
//!
//! A position is uniquely identified by its owner and the tick range it
//! spans. It stores the liquidity it owns and, per growth channel, the last
//! observed growth inside its range; the difference against the current
//! inside growth prices the accruals it has not yet collected.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tick::GrowthPair;

/// Unique key of a position: `(owner, lower_tick, upper_tick)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    /// Owner identifier, assigned by the caller.
    pub owner: String,
    /// Lower tick boundary of the range.
    pub lower_tick: i32,
    /// Upper tick boundary of the range.
    pub upper_tick: i32,
}

impl PositionKey {
    pub fn new(owner: impl Into<String>, lower_tick: i32, upper_tick: i32) -> Self {
        PositionKey {
            owner: owner.into(),
            lower_tick,
            upper_tick,
        }
    }
}

/// State of one position. Stored positions always hold positive liquidity;
/// a position whose liquidity returns to zero is removed from the pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionState {
    /// Liquidity owned in the range.
    pub liq: Decimal,
    /// Fee growth inside the range when the position was last touched.
    pub fee_inside_last: GrowthPair,
    /// HMM-adjustment growth inside the range when the position was last
    /// touched.
    pub adj_inside_last: GrowthPair,
}

impl PositionState {
    pub fn new(liq: Decimal, fee_inside_last: GrowthPair, adj_inside_last: GrowthPair) -> Self {
        PositionState {
            liq,
            fee_inside_last,
            adj_inside_last,
        }
    }
}
