//! Tick-indexed state and the growth-channel algebra.
//!
//! A tick that is referenced by at least one position boundary is "active"
//! and carries the net liquidity change applied when the price crosses it,
//! the gross liquidity referencing it, and one "outside" growth snapshot per
//! channel. Swap-fee growth and HMM-adjustment growth obey the same
//! outside-snapshot algebra, so both are expressed over [`GrowthPair`]
//! selected by a [`GrowthChannel`].

use std::ops::{Add, Mul, Sub};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Selects which cumulative growth counters an accounting operation reads:
/// swap fees or HMM adjustments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowthChannel {
    /// Swap-fee growth per unit of liquidity.
    Fees,
    /// HMM-adjustment growth per unit of liquidity, denominated in the token
    /// the pool retained.
    Adjustments,
}

/// A per-token pair of cumulative growth values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthPair {
    /// Growth denominated in token X.
    pub x: Decimal,
    /// Growth denominated in token Y.
    pub y: Decimal,
}

impl GrowthPair {
    pub const ZERO: GrowthPair = GrowthPair {
        x: Decimal::ZERO,
        y: Decimal::ZERO,
    };

    /// True when both components are non-negative.
    pub fn is_non_negative(&self) -> bool {
        self.x >= Decimal::ZERO && self.y >= Decimal::ZERO
    }
}

impl Add for GrowthPair {
    type Output = GrowthPair;

    fn add(self, rhs: GrowthPair) -> GrowthPair {
        GrowthPair {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for GrowthPair {
    type Output = GrowthPair;

    fn sub(self, rhs: GrowthPair) -> GrowthPair {
        GrowthPair {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<Decimal> for GrowthPair {
    type Output = GrowthPair;

    fn mul(self, rhs: Decimal) -> GrowthPair {
        GrowthPair {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// State of one active tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickState {
    /// Net liquidity applied to the pool's active liquidity when the price
    /// crosses this tick left to right; negated on a right-to-left crossing.
    pub liq_net: Decimal,

    /// Gross liquidity referencing this tick across all positions. The tick
    /// is deinitialized when this returns to zero.
    pub liq_gross: Decimal,

    /// Fee growth recorded on the far side of this tick relative to the
    /// current price; flipped on every crossing.
    pub fee_outside: GrowthPair,

    /// HMM-adjustment growth on the far side of this tick; same convention
    /// as `fee_outside`.
    pub adj_outside: GrowthPair,
}

impl TickState {
    /// Creates a tick with seeded outside snapshots.
    pub fn new(fee_outside: GrowthPair, adj_outside: GrowthPair) -> Self {
        TickState {
            liq_net: Decimal::ZERO,
            liq_gross: Decimal::ZERO,
            fee_outside,
            adj_outside,
        }
    }

    /// The outside snapshot for one growth channel.
    pub fn outside(&self, channel: GrowthChannel) -> GrowthPair {
        match channel {
            GrowthChannel::Fees => self.fee_outside,
            GrowthChannel::Adjustments => self.adj_outside,
        }
    }

    /// Applies a position's liquidity delta to this tick boundary.
    ///
    /// The net contribution is positive at a lower boundary and negative at
    /// an upper boundary; gross accumulates the signed delta regardless.
    pub fn apply_liquidity_delta(&mut self, liq_delta: Decimal, upper: bool) {
        self.liq_net += if upper { -liq_delta } else { liq_delta };
        self.liq_gross += liq_delta;
    }

    /// Flips both outside snapshots against the current global counters.
    ///
    /// After a crossing, growth recorded "outside" a tick refers to the other
    /// side of the price, which is exactly `global - outside`.
    pub fn flip_outside(&mut self, fee_global: GrowthPair, adj_global: GrowthPair) {
        self.fee_outside = fee_global - self.fee_outside;
        self.adj_outside = adj_global - self.adj_outside;
    }
}
