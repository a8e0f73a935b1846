//! Liquidity management: position updates, deposits, and withdrawals.
//!
//! `set_position` is the single write path for position state. It refreshes
//! the range-growth snapshots, settles uncollected accruals, updates both
//! boundary ticks, and adjusts the active liquidity when the range brackets
//! the current price. Deposits and withdrawals wrap it with amount
//! computation and reserve/pot bookkeeping, and both are transactional: any
//! error restores the pool to its pre-operation state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::ADJ_WITHDRAWAL;
use crate::errors::{ErrorCode, Result};
use crate::math;
use crate::pool_state::Pool;
use crate::position::{PositionKey, PositionState};
use crate::tick::{GrowthChannel, GrowthPair};

/// Token-amount accruals settled by a position update, per channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Accruals {
    /// Uncollected swap fees, in token amounts.
    pub fees: GrowthPair,
    /// Uncollected HMM adjustments, in token amounts.
    pub adjustments: GrowthPair,
}

/// Outcome of a deposit: what the pool took and what it handed back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// Net X debited from the depositor, accruals already offset.
    pub x_debited: Decimal,
    /// Net Y debited from the depositor, accruals already offset.
    pub y_debited: Decimal,
    /// Unused X returned to the depositor.
    pub x_returned: Decimal,
    /// Unused Y returned to the depositor.
    pub y_returned: Decimal,
}

/// Outcome of a withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    /// X sent to the owner, accrued fees and adjustments included.
    pub x_sent: Decimal,
    /// Y sent to the owner, accrued fees and adjustments included.
    pub y_sent: Decimal,
}

impl Pool {
    /// Applies a liquidity delta to the position `(owner, lower, upper)`.
    ///
    /// Refreshes the inside-growth snapshots, settles the accruals earned
    /// since the position was last touched, updates both boundary ticks, and
    /// adjusts active liquidity when the range brackets the current tick.
    /// Returns the settled accruals as token amounts.
    pub(crate) fn set_position(
        &mut self,
        owner: &str,
        lower_tick: i32,
        upper_tick: i32,
        liq_delta: Decimal,
    ) -> Result<Accruals> {
        if lower_tick >= upper_tick {
            return Err(ErrorCode::InvalidInput("inverted or empty tick range"));
        }

        let new_fee_inside = self.growth_in_range(lower_tick, upper_tick, GrowthChannel::Fees)?;
        let new_adj_inside =
            self.growth_in_range(lower_tick, upper_tick, GrowthChannel::Adjustments)?;

        let key = PositionKey::new(owner, lower_tick, upper_tick);
        let (base, old_fee_inside, old_adj_inside) = match self.positions.get(&key).copied() {
            None => {
                if liq_delta < Decimal::ZERO {
                    return Err(ErrorCode::InvalidInput("withdrawal from unknown position"));
                }
                if liq_delta > Decimal::ZERO {
                    self.positions.insert(
                        key,
                        PositionState::new(liq_delta, new_fee_inside, new_adj_inside),
                    );
                }
                (Decimal::ZERO, GrowthPair::ZERO, GrowthPair::ZERO)
            }
            Some(position) => {
                let next_liq = position.liq + liq_delta;
                if next_liq < Decimal::ZERO {
                    return Err(ErrorCode::InsufficientLiquidity(
                        "withdrawal exceeds position liquidity",
                    ));
                }
                if next_liq == Decimal::ZERO {
                    self.positions.remove(&key);
                } else {
                    self.positions.insert(
                        key,
                        PositionState::new(next_liq, new_fee_inside, new_adj_inside),
                    );
                }
                (position.liq, position.fee_inside_last, position.adj_inside_last)
            }
        };

        let fee_per_unit = new_fee_inside - old_fee_inside;
        let adj_per_unit = new_adj_inside - old_adj_inside;
        if !fee_per_unit.is_non_negative() || !adj_per_unit.is_non_negative() {
            return Err(ErrorCode::InvariantViolation(
                "uncollected accrual cannot be negative",
            ));
        }

        self.update_tick(lower_tick, liq_delta, false)?;
        self.update_tick(upper_tick, liq_delta, true)?;

        if lower_tick <= self.global_state.tick && self.global_state.tick < upper_tick {
            let next_liquidity = self.global_state.liquidity + liq_delta;
            if next_liquidity < Decimal::ZERO {
                return Err(ErrorCode::InvariantViolation("liquidity cannot turn negative"));
            }
            self.global_state.liquidity = next_liquidity;
        }

        Ok(Accruals {
            fees: fee_per_unit * base,
            adjustments: adj_per_unit * base,
        })
    }

    /// Deposits liquidity over the price range `[rp_a, rp_b]`.
    ///
    /// The range is quantized down onto the tick grid and the liquidity the
    /// offered amounts support at the current price is floored. Uncollected
    /// accruals are offset against the debit, and any unused amounts are
    /// returned as change.
    pub fn deposit(
        &mut self,
        owner: &str,
        x: Decimal,
        y: Decimal,
        rp_a: Decimal,
        rp_b: Decimal,
    ) -> Result<DepositReceipt> {
        let checkpoint = self.clone();
        match self.deposit_inner(owner, x, y, rp_a, rp_b) {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                *self = checkpoint;
                Err(e)
            }
        }
    }

    fn deposit_inner(
        &mut self,
        owner: &str,
        x: Decimal,
        y: Decimal,
        rp_a: Decimal,
        rp_b: Decimal,
    ) -> Result<DepositReceipt> {
        if x < Decimal::ZERO || y < Decimal::ZERO {
            return Err(ErrorCode::InvalidInput("deposit amounts must be non-negative"));
        }
        if rp_a <= Decimal::ZERO || rp_b <= rp_a {
            return Err(ErrorCode::InvalidInput("inverted or empty price range"));
        }

        let lower_tick = self.rp_to_possible_tick(rp_a, false)?;
        let upper_tick = self.rp_to_possible_tick(rp_b, false)?;
        if lower_tick >= upper_tick {
            return Err(ErrorCode::InvalidInput(
                "price range collapses under the tick spacing",
            ));
        }

        let rp = self.global_state.root_price;
        let rp_lower = math::tick_to_rp(lower_tick)?;
        let rp_upper = math::tick_to_rp(upper_tick)?;

        // Floor the minted liquidity so rounding always favors the pool.
        let liq = math::liq_from_reserves(x, y, rp, rp_lower, rp_upper)?.floor();
        let x_in = math::x_from_liq(liq, rp, rp_lower, rp_upper)?;
        let y_in = math::y_from_liq(liq, rp, rp_lower, rp_upper)?;
        if x_in > x || y_in > y {
            return Err(ErrorCode::InvariantViolation(
                "computed deposit exceeds the offered amount",
            ));
        }

        let accruals = self.set_position(owner, lower_tick, upper_tick, liq)?;

        self.reserve_x += x_in;
        self.reserve_y += y_in;
        self.fee_pot_x -= accruals.fees.x;
        self.fee_pot_y -= accruals.fees.y;
        self.adj_pot_x -= accruals.adjustments.x;
        self.adj_pot_y -= accruals.adjustments.y;

        let x_debited = x_in - accruals.fees.x - accruals.adjustments.x;
        let y_debited = y_in - accruals.fees.y - accruals.adjustments.y;

        debug!(
            pool = %self,
            owner,
            lower_tick,
            upper_tick,
            %liq,
            %x_debited,
            %y_debited,
            "deposit settled"
        );

        Ok(DepositReceipt {
            x_debited,
            y_debited,
            x_returned: x - x_debited,
            y_returned: y - y_debited,
        })
    }

    /// Withdraws `liq` liquidity from the position over `[rp_a, rp_b]`.
    ///
    /// The amounts backing the liquidity at the current price are scaled by
    /// the conservative withdrawal margin; uncollected accruals are paid out
    /// on top.
    pub fn withdraw(
        &mut self,
        owner: &str,
        liq: Decimal,
        rp_a: Decimal,
        rp_b: Decimal,
    ) -> Result<WithdrawReceipt> {
        let checkpoint = self.clone();
        match self.withdraw_inner(owner, liq, rp_a, rp_b) {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                *self = checkpoint;
                Err(e)
            }
        }
    }

    fn withdraw_inner(
        &mut self,
        owner: &str,
        liq: Decimal,
        rp_a: Decimal,
        rp_b: Decimal,
    ) -> Result<WithdrawReceipt> {
        if liq < Decimal::ZERO {
            return Err(ErrorCode::InvalidInput("withdrawal liquidity must be non-negative"));
        }
        if rp_a <= Decimal::ZERO || rp_b <= rp_a {
            return Err(ErrorCode::InvalidInput("inverted or empty price range"));
        }

        let lower_tick = self.rp_to_possible_tick(rp_a, false)?;
        let upper_tick = self.rp_to_possible_tick(rp_b, false)?;

        let accruals = self.set_position(owner, lower_tick, upper_tick, -liq)?;

        let rp = self.global_state.root_price;
        let rp_lower = math::tick_to_rp(lower_tick)?;
        let rp_upper = math::tick_to_rp(upper_tick)?;

        let scale = Decimal::ONE - ADJ_WITHDRAWAL;
        let x_out = math::x_from_liq(liq, rp, rp_lower, rp_upper)? * scale;
        let y_out = math::y_from_liq(liq, rp, rp_lower, rp_upper)? * scale;

        if self.reserve_x - x_out < Decimal::ZERO || self.reserve_y - y_out < Decimal::ZERO {
            return Err(ErrorCode::InsufficientLiquidity(
                "withdrawal would drain the reserves",
            ));
        }

        self.reserve_x -= x_out;
        self.reserve_y -= y_out;
        self.fee_pot_x -= accruals.fees.x;
        self.fee_pot_y -= accruals.fees.y;
        self.adj_pot_x -= accruals.adjustments.x;
        self.adj_pot_y -= accruals.adjustments.y;

        let x_sent = x_out + accruals.fees.x + accruals.adjustments.x;
        let y_sent = y_out + accruals.fees.y + accruals.adjustments.y;

        info!(
            pool = %self,
            owner,
            lower_tick,
            upper_tick,
            %liq,
            %x_sent,
            %y_sent,
            "withdrawal settled"
        );

        Ok(WithdrawReceipt { x_sent, y_sent })
    }
}
