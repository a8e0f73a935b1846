//! Pool state management.
//!
//! Owns the global price/liquidity state, the sparse tick store, and the
//! position store, and implements the tick-grid bookkeeping that the swap
//! engine and the liquidity manager build on: spacing quantization, swap
//! limit selection, tick initialization and crossing, gap recovery, and the
//! outside-snapshot growth accounting shared by the fee and adjustment
//! channels.
//!
//! Ticks live in an ordered map so the next active tick in either direction
//! is a neighbor lookup rather than a scan.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{
    FEE_RATE_HIGH, FEE_RATE_LOW, FEE_RATE_MEDIUM, TICK_SPACING_HIGH, TICK_SPACING_LOW,
    TICK_SPACING_MEDIUM,
};
use crate::errors::{ErrorCode, Result};
use crate::math;
use crate::position::{PositionKey, PositionState};
use crate::tick::{GrowthChannel, GrowthPair, TickState};
use crate::token_pair::TokenPair;

/// Static pool parameters fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Grid coarseness: only multiples of this spacing are legal ticks.
    pub tick_spacing: i32,
    /// HMM coefficient `C >= 0`; zero disables the oracle adjustment.
    pub hmm_c: Decimal,
    /// Swap fee rate, in `[0, 1)`.
    pub fee_rate: Decimal,
}

impl PoolConfig {
    pub fn new(tick_spacing: i32, hmm_c: Decimal, fee_rate: Decimal) -> Self {
        PoolConfig {
            tick_spacing,
            hmm_c,
            fee_rate,
        }
    }

    /// Preset for stable pairs: single-tick granularity, 0.01% fee.
    pub fn low(hmm_c: Decimal) -> Self {
        PoolConfig::new(TICK_SPACING_LOW, hmm_c, FEE_RATE_LOW)
    }

    /// Preset for mainstream pairs: 0.1% granularity, 0.05% fee.
    pub fn medium(hmm_c: Decimal) -> Self {
        PoolConfig::new(TICK_SPACING_MEDIUM, hmm_c, FEE_RATE_MEDIUM)
    }

    /// Preset for volatile pairs: 0.6% granularity, 0.3% fee.
    pub fn high(hmm_c: Decimal) -> Self {
        PoolConfig::new(TICK_SPACING_HIGH, hmm_c, FEE_RATE_HIGH)
    }

    fn validate(&self) -> Result<()> {
        if self.tick_spacing < 1 {
            return Err(ErrorCode::InvalidInput("tick spacing must be at least 1"));
        }
        if self.hmm_c < Decimal::ZERO {
            return Err(ErrorCode::InvalidInput("hmm coefficient must be non-negative"));
        }
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err(ErrorCode::InvalidInput("fee rate must be in [0, 1)"));
        }
        Ok(())
    }
}

/// Global pool state: the quantities a swap reads and writes on every
/// segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    /// Liquidity active at the current price.
    pub liquidity: Decimal,
    /// Current root price, with Y as numeraire.
    pub root_price: Decimal,
    /// Current tick, always a multiple of the pool's tick spacing.
    pub tick: i32,
    /// Cumulative swap-fee growth per unit of liquidity.
    pub fee_growth: GrowthPair,
    /// Cumulative HMM-adjustment growth per unit of liquidity.
    pub adj_growth: GrowthPair,
}

impl GlobalState {
    /// The global counters for one growth channel.
    pub fn growth(&self, channel: GrowthChannel) -> GrowthPair {
        match channel {
            GrowthChannel::Fees => self.fee_growth,
            GrowthChannel::Adjustments => self.adj_growth,
        }
    }
}

/// A concentrated-liquidity pool for one token pair.
///
/// The pool is a single-threaded state machine: every public operation
/// either completes with all invariants intact or leaves the state exactly
/// as it found it.
#[derive(Clone, Debug, PartialEq)]
pub struct Pool {
    pub(crate) token_pair: TokenPair,
    pub(crate) tick_spacing: i32,
    pub(crate) hmm_c: Decimal,
    pub(crate) fee_rate: Decimal,
    pub(crate) global_state: GlobalState,
    pub(crate) active_ticks: BTreeMap<i32, TickState>,
    pub(crate) positions: BTreeMap<PositionKey, PositionState>,
    /// Real reserves.
    pub(crate) reserve_x: Decimal,
    pub(crate) reserve_y: Decimal,
    /// Swap-fee pots; transiently negative when accruals are settled against
    /// deposits or withdrawals before the matching fees were collected.
    pub(crate) fee_pot_x: Decimal,
    pub(crate) fee_pot_y: Decimal,
    /// HMM-adjustment pots, same convention as the fee pots.
    pub(crate) adj_pot_x: Decimal,
    pub(crate) adj_pot_y: Decimal,
}

impl Pool {
    /// Creates a pool for `token_pair` around a bootstrap price.
    ///
    /// The bootstrap root price is quantized down onto the tick grid and the
    /// pool opens exactly on that tick, with no liquidity and empty
    /// counters.
    pub fn new(token_pair: TokenPair, bootstrap_rp: Decimal, config: PoolConfig) -> Result<Self> {
        config.validate()?;
        if bootstrap_rp <= Decimal::ZERO {
            return Err(ErrorCode::InvalidInput("bootstrap price must be positive"));
        }
        let tick = quantize_tick(
            math::rp_to_tick(bootstrap_rp, false)?,
            config.tick_spacing,
            false,
        );
        let global_state = GlobalState {
            liquidity: Decimal::ZERO,
            root_price: math::tick_to_rp(tick)?,
            tick,
            fee_growth: GrowthPair::ZERO,
            adj_growth: GrowthPair::ZERO,
        };
        Ok(Pool {
            token_pair,
            tick_spacing: config.tick_spacing,
            hmm_c: config.hmm_c,
            fee_rate: config.fee_rate,
            global_state,
            active_ticks: BTreeMap::new(),
            positions: BTreeMap::new(),
            reserve_x: Decimal::ZERO,
            reserve_y: Decimal::ZERO,
            fee_pot_x: Decimal::ZERO,
            fee_pot_y: Decimal::ZERO,
            adj_pot_x: Decimal::ZERO,
            adj_pot_y: Decimal::ZERO,
        })
    }

    // ---- read-only views ----

    pub fn token_pair(&self) -> &TokenPair {
        &self.token_pair
    }

    pub fn config(&self) -> PoolConfig {
        PoolConfig::new(self.tick_spacing, self.hmm_c, self.fee_rate)
    }

    pub fn global_state(&self) -> &GlobalState {
        &self.global_state
    }

    pub fn active_ticks(&self) -> &BTreeMap<i32, TickState> {
        &self.active_ticks
    }

    pub fn positions(&self) -> &BTreeMap<PositionKey, PositionState> {
        &self.positions
    }

    /// Real reserves `(X, Y)`.
    pub fn reserves(&self) -> (Decimal, Decimal) {
        (self.reserve_x, self.reserve_y)
    }

    /// Collected swap-fee pots `(X_fee, Y_fee)`.
    pub fn fee_pots(&self) -> (Decimal, Decimal) {
        (self.fee_pot_x, self.fee_pot_y)
    }

    /// Retained HMM-adjustment pots `(X_adj, Y_adj)`.
    pub fn adjustment_pots(&self) -> (Decimal, Decimal) {
        (self.adj_pot_x, self.adj_pot_y)
    }

    // ---- tick grid ----

    /// Quantizes a tick onto the grid, rounding up when walking left to
    /// right and down otherwise.
    pub fn tick_to_possible_tick(&self, tick: i32, left_to_right: bool) -> i32 {
        quantize_tick(tick, self.tick_spacing, left_to_right)
    }

    /// Converts a root price to its nearest legal tick in the direction of
    /// travel.
    pub fn rp_to_possible_tick(&self, rp: Decimal, left_to_right: bool) -> Result<i32> {
        Ok(self.tick_to_possible_tick(math::rp_to_tick(rp, left_to_right)?, left_to_right))
    }

    /// Greatest active tick at or below `min(start_tick, current_tick)`,
    /// quantized down. `None` when no active tick remains on the left.
    pub(crate) fn left_limit(&self, start_tick: i32) -> Option<i32> {
        let tick = start_tick.min(self.global_state.tick);
        let tick = self.tick_to_possible_tick(tick, false);
        self.active_ticks.range(..=tick).next_back().map(|(k, _)| *k)
    }

    /// Next active tick on the right of `start_tick`.
    ///
    /// Starting on the current tick, its own liquidity is already in range,
    /// so the limit is strictly above it. Starting above the current tick
    /// (the price travelled without crossing), the start tick itself is a
    /// legal limit; reaching it yields a zero-quantity fill followed by a
    /// crossing. Starting below the current tick breaks the price
    /// convention and is an error.
    pub(crate) fn right_limit(&self, start_tick: i32, current_tick: i32) -> Result<Option<i32>> {
        let start = self.tick_to_possible_tick(start_tick, false);
        if start == current_tick {
            Ok(self
                .active_ticks
                .range((Bound::Excluded(start), Bound::Unbounded))
                .next()
                .map(|(k, _)| *k))
        } else if start > current_tick {
            Ok(self.active_ticks.range(start..).next().map(|(k, _)| *k))
        } else {
            Err(ErrorCode::InvariantViolation(
                "root price must not rest strictly below the current tick",
            ))
        }
    }

    // ---- tick store ----

    /// Looks up a tick, creating it with seeded outside snapshots when
    /// absent.
    ///
    /// A freshly referenced tick at or below the current price records the
    /// full global growth as "outside"; above the current price it records
    /// zero. The convention makes below/above decompositions exact without
    /// any history.
    pub(crate) fn initialize_tick(&mut self, tick: i32) -> &mut TickState {
        let seed_from_global = self.global_state.tick >= tick;
        let fee_outside = if seed_from_global {
            self.global_state.fee_growth
        } else {
            GrowthPair::ZERO
        };
        let adj_outside = if seed_from_global {
            self.global_state.adj_growth
        } else {
            GrowthPair::ZERO
        };
        self.active_ticks
            .entry(tick)
            .or_insert_with(|| TickState::new(fee_outside, adj_outside))
    }

    /// Applies a position's liquidity delta to one tick boundary,
    /// deinitializing the tick when no liquidity references it anymore.
    pub(crate) fn update_tick(&mut self, tick: i32, liq_delta: Decimal, upper: bool) -> Result<()> {
        let state = self.initialize_tick(tick);
        state.apply_liquidity_delta(liq_delta, upper);
        let gross = state.liq_gross;
        if gross < Decimal::ZERO {
            return Err(ErrorCode::InvariantViolation(
                "gross tick liquidity cannot turn negative",
            ));
        }
        if gross == Decimal::ZERO {
            self.active_ticks.remove(&tick);
        }
        Ok(())
    }

    /// Crosses an active tick while the price moves through it.
    ///
    /// Applies the tick's net liquidity to the active liquidity (negated
    /// right to left), flips the outside snapshots, and advances the current
    /// tick: onto the crossed tick left to right, onto the greatest legal
    /// tick strictly below it right to left. A right-to-left crossing is
    /// only legal at the current tick.
    pub(crate) fn cross_tick(&mut self, tick: i32, left_to_right: bool) -> Result<()> {
        if !left_to_right && self.global_state.tick != tick {
            return Err(ErrorCode::InvariantViolation(
                "can only cross the current tick right to left",
            ));
        }
        let fee_global = self.global_state.fee_growth;
        let adj_global = self.global_state.adj_growth;
        let state = self
            .active_ticks
            .get_mut(&tick)
            .ok_or(ErrorCode::NoActiveTick(tick))?;

        let liq_to_apply = if left_to_right {
            state.liq_net
        } else {
            -state.liq_net
        };
        let next_liquidity = self.global_state.liquidity + liq_to_apply;
        if next_liquidity < Decimal::ZERO {
            return Err(ErrorCode::InvariantViolation("liquidity cannot turn negative"));
        }
        self.global_state.liquidity = next_liquidity;

        state.flip_outside(fee_global, adj_global);

        self.global_state.tick = if left_to_right {
            tick
        } else {
            quantize_tick(tick - 1, self.tick_spacing, false)
        };
        Ok(())
    }

    /// Recovers from a liquidity gap during a swap.
    ///
    /// With no liquidity in range, walks the active ticks in the swap
    /// direction (starting at, and ignoring, the current position), crossing
    /// each one until some liquidity kicks in. Returns the next swap goal
    /// together with the tick and root price the pool landed on, or `None`
    /// as the goal when the grid is exhausted in that direction.
    pub(crate) fn try_get_in_range(
        &mut self,
        left_to_right: bool,
    ) -> Result<(Option<i32>, i32, Decimal)> {
        if self.global_state.liquidity > Decimal::ZERO {
            return Err(ErrorCode::InvariantViolation("liquidity already active in range"));
        }

        if !left_to_right {
            // Going right to left: the first candidate may be the current
            // tick itself.
            while let Some(tick) = self
                .active_ticks
                .range(..=self.global_state.tick)
                .next_back()
                .map(|(k, _)| *k)
            {
                self.global_state.tick = tick;
                self.global_state.root_price = math::tick_to_rp(tick)?;
                self.cross_tick(tick, false)?;
                if self.global_state.liquidity > Decimal::ZERO {
                    let goal = self.left_limit(self.global_state.tick);
                    return Ok((goal, tick, self.global_state.root_price));
                }
            }
        } else {
            while let Some(tick) = self
                .active_ticks
                .range((Bound::Excluded(self.global_state.tick), Bound::Unbounded))
                .next()
                .map(|(k, _)| *k)
            {
                self.global_state.tick = tick;
                self.global_state.root_price = math::tick_to_rp(tick)?;
                self.cross_tick(tick, true)?;
                if self.global_state.liquidity > Decimal::ZERO {
                    let goal = self.right_limit(tick, tick)?;
                    return Ok((goal, tick, self.global_state.root_price));
                }
            }
        }

        Ok((None, self.global_state.tick, self.global_state.root_price))
    }

    // ---- growth accounting ----

    /// Growth earned below and above a tick, for one channel.
    ///
    /// An inactive tick reports `(global, 0)` by convention; an active one
    /// reads its outside snapshot on the side the current price is on.
    pub(crate) fn growth_below_above(
        &self,
        tick: i32,
        channel: GrowthChannel,
    ) -> (GrowthPair, GrowthPair) {
        let global = self.global_state.growth(channel);
        match self.active_ticks.get(&tick) {
            None => (global, GrowthPair::ZERO),
            Some(state) => {
                let outside = state.outside(channel);
                if self.global_state.tick >= tick {
                    (outside, global - outside)
                } else {
                    (global - outside, outside)
                }
            }
        }
    }

    /// Growth earned strictly inside `[lower_tick, upper_tick]`, for one
    /// channel: `global - below(lower) - above(upper)`.
    ///
    /// The below/above decomposition of each boundary must reconstruct the
    /// global counters exactly; a mismatch means the outside snapshots have
    /// drifted and no range accounting can be trusted.
    pub(crate) fn growth_in_range(
        &self,
        lower_tick: i32,
        upper_tick: i32,
        channel: GrowthChannel,
    ) -> Result<GrowthPair> {
        let (below_lower, above_lower) = self.growth_below_above(lower_tick, channel);
        let (below_upper, above_upper) = self.growth_below_above(upper_tick, channel);
        let global = self.global_state.growth(channel);

        if below_lower + above_lower != global || below_upper + above_upper != global {
            return Err(ErrorCode::InvariantViolation(
                "growth below and above a tick must sum to the global counter",
            ));
        }

        Ok(global - below_lower - above_upper)
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pool - tick spacing {}",
            self.token_pair, self.tick_spacing
        )
    }
}

/// Quantizes a tick onto a spacing grid: up (ceiling) when walking left to
/// right, down (floor) otherwise. Unchanged for spacing 1.
fn quantize_tick(tick: i32, spacing: i32, left_to_right: bool) -> i32 {
    if left_to_right {
        -((-tick).div_euclid(spacing)) * spacing
    } else {
        tick.div_euclid(spacing) * spacing
    }
}
