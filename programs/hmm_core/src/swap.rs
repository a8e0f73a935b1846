//! Swap execution: the within-tick step and the multi-tick outer loop.
//!
//! A swap consumes a positive input amount against whatever liquidity is
//! active, one tick segment at a time. Each segment is priced by the pure
//! AMM curve for the input side; the output side is adjusted against the
//! oracle root price when the trade converges toward it (the HMM policy),
//! and the difference is retained by the pool. Crossing a segment boundary
//! updates active liquidity and flips the tick's outside snapshots; a
//! liquidity gap is recovered by walking to the next active tick in the
//! direction of travel.
//!
//! The two directions are mirror images and share one step and one loop,
//! parameterized by [`SwapDirection`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::ADJ_WHOLE_FILL;
use crate::errors::{ErrorCode, Result};
use crate::math;
use crate::pool_state::Pool;

/// Orientation of a swap: which token the trader supplies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapDirection {
    /// X in, Y out; the price moves down (right to left on the grid).
    XIn,
    /// Y in, X out; the price moves up (left to right on the grid).
    YIn,
}

impl SwapDirection {
    /// True when the price moves up across the tick grid.
    pub fn left_to_right(self) -> bool {
        matches!(self, SwapDirection::YIn)
    }
}

/// Result of one within-tick step. Pure data: the step writes nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SwapStep {
    /// Input actually consumed by the curve, fee excluded.
    pub done_in: Decimal,
    /// Output-side delta quoted to the trader (non-positive).
    pub done_out: Decimal,
    /// Tick the pool lands on after the step.
    pub end_tick: i32,
    /// Root price after the step.
    pub end_rp: Decimal,
    /// True when the step ran into the goal tick and a crossing is due.
    pub crossing: bool,
    /// Output retained by the pool on top of the AMM quote (non-negative).
    pub adjustment: Decimal,
    /// Fee taken on the input side.
    pub fee: Decimal,
}

/// Aggregate result of a swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapSummary {
    /// Gross input consumed, fees included.
    pub amount_in_gross: Decimal,
    /// Net output-side delta (non-positive: reserves left the pool).
    pub amount_out_net: Decimal,
    /// Cumulative HMM adjustment retained by the pool, in the output token.
    pub hmm_adjustment: Decimal,
    /// Cumulative fee, in the input token.
    pub fee: Decimal,
    /// Average fill price in Y per X; `None` when nothing was filled.
    pub average_price: Option<Decimal>,
    /// Pool price after the swap, in Y per X.
    pub end_price: Decimal,
}

impl Pool {
    /// Swaps `dx > 0` of token X into the pool.
    pub fn swap_x_in(&mut self, dx: Decimal, oracle_rp: Option<Decimal>) -> Result<SwapSummary> {
        let checkpoint = self.clone();
        match self.execute_swap(SwapDirection::XIn, dx, oracle_rp) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                *self = checkpoint;
                Err(e)
            }
        }
    }

    /// Swaps `dy > 0` of token Y into the pool.
    pub fn swap_y_in(&mut self, dy: Decimal, oracle_rp: Option<Decimal>) -> Result<SwapSummary> {
        let checkpoint = self.clone();
        match self.execute_swap(SwapDirection::YIn, dy, oracle_rp) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                *self = checkpoint;
                Err(e)
            }
        }
    }

    /// One segment of a swap, bounded by the goal tick.
    ///
    /// Takes the fee off the remaining input, fills as much as the segment
    /// supports (a partial fill lands exactly on the goal tick and schedules
    /// a crossing), prices the output by the HMM policy, and applies the
    /// conservative fill margin. A goal equal to the start price yields a
    /// zero-quantity step that only schedules the crossing.
    pub(crate) fn swap_step(
        &self,
        direction: SwapDirection,
        start_rp: Decimal,
        goal_tick: i32,
        liquidity: Decimal,
        amount_remaining: Decimal,
        oracle_rp: Option<Decimal>,
    ) -> Result<SwapStep> {
        if amount_remaining <= Decimal::ZERO {
            return Err(ErrorCode::InvalidInput("swap amount must be positive"));
        }

        let rp_goal = math::tick_to_rp(goal_tick)?;
        match direction {
            SwapDirection::XIn if rp_goal > start_rp => {
                return Err(ErrorCode::InvariantViolation(
                    "price must not rise when x is supplied",
                ));
            }
            SwapDirection::YIn if rp_goal < start_rp => {
                return Err(ErrorCode::InvariantViolation(
                    "price must not fall when y is supplied",
                ));
            }
            _ => {}
        }

        // Take the maximum potential fee off before touching prices.
        let max_in = amount_remaining * (Decimal::ONE - self.fee_rate);

        // Input the curve can absorb before the price reaches the goal tick.
        let doable_in = match direction {
            SwapDirection::XIn => math::dx_from_price_move(liquidity, start_rp, rp_goal)?,
            SwapDirection::YIn => math::dy_from_price_move(liquidity, start_rp, rp_goal),
        };
        if doable_in < Decimal::ZERO {
            return Err(ErrorCode::InvariantViolation(
                "feasible fill must be non-negative",
            ));
        }

        let done_in;
        let fee;
        let end_rp;
        let end_tick;
        let crossing;
        if doable_in < max_in {
            // Partial fill: land exactly on the goal tick and reverse the
            // fee out of the filled amount. Reusing the goal's root price
            // keeps tick-boundary prices exact.
            done_in = doable_in;
            fee = done_in / (Decimal::ONE - self.fee_rate) * self.fee_rate;
            end_rp = rp_goal;
            end_tick = goal_tick;
            crossing = true;
        } else {
            // Whole fill inside the segment.
            done_in = max_in;
            fee = amount_remaining - max_in;
            end_rp = match direction {
                SwapDirection::XIn => math::rp_from_dx(liquidity, start_rp, done_in)?,
                SwapDirection::YIn => math::rp_from_dy(liquidity, start_rp, done_in)?,
            };
            match direction {
                SwapDirection::XIn => {
                    if end_rp > start_rp {
                        return Err(ErrorCode::InvariantViolation(
                            "price must not rise when x is supplied",
                        ));
                    }
                    if end_rp < rp_goal {
                        return Err(ErrorCode::InvariantViolation(
                            "whole fill must not overshoot the goal tick",
                        ));
                    }
                }
                SwapDirection::YIn => {
                    if end_rp < start_rp {
                        return Err(ErrorCode::InvariantViolation(
                            "price must not fall when y is supplied",
                        ));
                    }
                    if end_rp > rp_goal {
                        return Err(ErrorCode::InvariantViolation(
                            "whole fill must not overshoot the goal tick",
                        ));
                    }
                }
            }
            end_tick = self.rp_to_possible_tick(end_rp, false)?;
            crossing = false;
        }

        let amm_out = match direction {
            SwapDirection::XIn => math::dy_from_price_move(liquidity, start_rp, end_rp),
            SwapDirection::YIn => math::dx_from_price_move(liquidity, start_rp, end_rp)?,
        };

        // HMM policy: adjust only while the trade converges toward the
        // oracle; fall back to the pure AMM quote when no oracle is given,
        // the coefficient is zero, or the trade diverges.
        let oracle_rp = oracle_rp.filter(|_| self.hmm_c > Decimal::ZERO);
        let mut done_out = match (direction, oracle_rp) {
            (_, None) => amm_out,
            (SwapDirection::XIn, Some(rp_o)) => {
                if rp_o >= start_rp {
                    amm_out
                } else if rp_o >= end_rp {
                    // Oracle inside the segment: adjusted down to the oracle
                    // price, pure AMM the rest of the way.
                    math::dy_from_price_move_hmm(liquidity, start_rp, rp_o, self.hmm_c, rp_o)?
                        + math::dy_from_price_move(liquidity, rp_o, end_rp)
                } else if rp_o < end_rp {
                    math::dy_from_price_move_hmm(liquidity, start_rp, end_rp, self.hmm_c, rp_o)?
                } else {
                    return Err(ErrorCode::Unreachable("oracle placement cases are exhausted"));
                }
            }
            (SwapDirection::YIn, Some(rp_o)) => {
                if rp_o <= start_rp {
                    amm_out
                } else if rp_o <= end_rp {
                    math::dx_from_price_move_hmm(liquidity, start_rp, rp_o, self.hmm_c, rp_o)?
                        + math::dx_from_price_move(liquidity, rp_o, end_rp)?
                } else if rp_o > end_rp {
                    math::dx_from_price_move_hmm(liquidity, start_rp, end_rp, self.hmm_c, rp_o)?
                } else {
                    return Err(ErrorCode::Unreachable("oracle placement cases are exhausted"));
                }
            }
        };

        // Conservative margin on both quotes so rounding never overpays.
        let fill_scale = Decimal::ONE - ADJ_WHOLE_FILL;
        done_out *= fill_scale;
        let amm_out = amm_out * fill_scale;

        let adjustment = done_out - amm_out;
        if amm_out > Decimal::ZERO {
            return Err(ErrorCode::InvariantViolation(
                "output delta must not be positive",
            ));
        }
        if adjustment < Decimal::ZERO {
            return Err(ErrorCode::InvariantViolation(
                "hmm adjustment must be non-negative",
            ));
        }

        let reserve_out = match direction {
            SwapDirection::XIn => self.reserve_y,
            SwapDirection::YIn => self.reserve_x,
        };
        if reserve_out + amm_out < Decimal::ZERO {
            return Err(ErrorCode::InsufficientLiquidity(
                "cannot swap out more than the pool reserves",
            ));
        }

        Ok(SwapStep {
            done_in,
            done_out,
            end_tick,
            end_rp,
            crossing,
            adjustment,
            fee,
        })
    }

    /// The outer swap loop: consumes the order segment by segment until it
    /// is filled or the liquidity in the direction of travel is exhausted.
    fn execute_swap(
        &mut self,
        direction: SwapDirection,
        amount_in: Decimal,
        oracle_rp: Option<Decimal>,
    ) -> Result<SwapSummary> {
        if amount_in <= Decimal::ZERO {
            return Err(ErrorCode::InvalidInput("swap amount must be positive"));
        }

        let mut current_tick = self.global_state.tick;
        let mut current_rp = self.global_state.root_price;

        let mut consumed = Decimal::ZERO;
        let mut out_total = Decimal::ZERO;
        let mut adjustment_total = Decimal::ZERO;
        let mut fee_total = Decimal::ZERO;

        while consumed < amount_in {
            let goal_tick = if self.global_state.liquidity > Decimal::ZERO {
                match direction {
                    SwapDirection::XIn => self.left_limit(current_tick),
                    SwapDirection::YIn => self.right_limit(current_tick, self.global_state.tick)?,
                }
            } else {
                debug!(pool = %self, "liquidity gap, walking to the next active tick");
                let (goal, tick, rp) = self.try_get_in_range(direction.left_to_right())?;
                current_tick = tick;
                current_rp = rp;
                goal
            };

            let Some(goal_tick) = goal_tick else {
                debug!(pool = %self, "no active tick left in this direction");
                break;
            };

            let step = self.swap_step(
                direction,
                current_rp,
                goal_tick,
                self.global_state.liquidity,
                amount_in - consumed,
                oracle_rp,
            )?;

            if amount_in - consumed < step.done_in + step.fee {
                return Err(ErrorCode::InvariantViolation("fill exceeds the remaining order"));
            }

            consumed += step.done_in + step.fee;
            out_total += step.done_out;
            adjustment_total += step.adjustment;
            fee_total += step.fee;
            current_tick = step.end_tick;
            current_rp = step.end_rp;

            // Commit the segment: price, reserves, pots, growth counters.
            self.global_state.tick = current_tick;
            self.global_state.root_price = current_rp;
            match direction {
                SwapDirection::XIn => {
                    self.reserve_x += step.done_in;
                    // The adjustment stays in the pool but moves out of the
                    // reserves into its pot.
                    self.reserve_y += step.done_out - step.adjustment;
                    self.fee_pot_x += step.fee;
                    self.adj_pot_y += step.adjustment;
                    if self.global_state.liquidity > Decimal::ZERO {
                        self.global_state.fee_growth.x +=
                            step.fee / self.global_state.liquidity;
                        self.global_state.adj_growth.y +=
                            step.adjustment / self.global_state.liquidity;
                    }
                }
                SwapDirection::YIn => {
                    self.reserve_y += step.done_in;
                    self.reserve_x += step.done_out - step.adjustment;
                    self.fee_pot_y += step.fee;
                    self.adj_pot_x += step.adjustment;
                    if self.global_state.liquidity > Decimal::ZERO {
                        self.global_state.fee_growth.y +=
                            step.fee / self.global_state.liquidity;
                        self.global_state.adj_growth.x +=
                            step.adjustment / self.global_state.liquidity;
                    }
                }
            }

            if step.crossing {
                if step.end_tick != goal_tick {
                    return Err(ErrorCode::InvariantViolation(
                        "crossing step must end on its goal tick",
                    ));
                }
                if self.active_ticks.contains_key(&goal_tick) {
                    self.cross_tick(goal_tick, direction.left_to_right())?;
                }
            }
        }

        let average_price = match direction {
            SwapDirection::XIn if consumed != Decimal::ZERO => Some(-out_total / consumed),
            SwapDirection::YIn if out_total != Decimal::ZERO => Some(-consumed / out_total),
            _ => None,
        };
        let end_price = self.global_state.root_price * self.global_state.root_price;

        let summary = SwapSummary {
            amount_in_gross: consumed,
            amount_out_net: out_total,
            hmm_adjustment: adjustment_total,
            fee: fee_total,
            average_price,
            end_price,
        };

        info!(
            pool = %self,
            direction = ?direction,
            %consumed,
            %out_total,
            %adjustment_total,
            %fee_total,
            %end_price,
            "swap executed"
        );

        Ok(summary)
    }
}
