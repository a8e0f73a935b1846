//! Numeric kernel for the pool.
//!
//! Closed-form formulas relating liquidity, reserves, and prices. All prices
//! are handled as root prices `rP = sqrt(P)` with token Y as numeraire, and
//! every quantity is a `Decimal` with the rounding boundaries owned by the
//! callers (liquidity is floored at mint, fills and withdrawals carry their
//! own conservative scaling).
//!
//! The HMM variants price the output token against an oracle root price
//! `rP_o` with a coefficient `C >= 0`, using the closed-form integral of the
//! oracle-weighted marginal rate. `C = 1` takes the logarithm branch, every
//! other coefficient the power branch.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use crate::constants::{MAX_TICK, MIN_TICK, TICK_BASE};
use crate::errors::{ErrorCode, Result};

/// Converts a tick index to its root price: `TICK_BASE^(tick / 2)`.
///
/// # Errors
/// Returns `InvalidInput` when the tick is outside `[MIN_TICK, MAX_TICK]`.
pub fn tick_to_rp(tick: i32) -> Result<Decimal> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(ErrorCode::InvalidInput("tick index out of bounds"));
    }
    Ok(TICK_BASE.powd(Decimal::from(tick) / dec!(2)))
}

/// Converts a root price to a tick index.
///
/// The theoretical tick is `log(rP)` in base `sqrt(TICK_BASE)`; it is rounded
/// up when walking left to right (price increasing) and down otherwise, so
/// the returned tick is always on the far side of `rP` in the direction of
/// travel.
pub fn rp_to_tick(rp: Decimal, left_to_right: bool) -> Result<i32> {
    if rp <= Decimal::ZERO {
        return Err(ErrorCode::InvalidInput("root price must be positive"));
    }
    let half_ln_base = TICK_BASE.ln() / dec!(2);
    let theoretical = rp.ln() / half_ln_base;
    let rounded = if left_to_right {
        theoretical.ceil()
    } else {
        theoretical.floor()
    };
    let tick = rounded
        .to_i64()
        .ok_or(ErrorCode::InvalidInput("root price out of tick range"))?;
    if !((MIN_TICK as i64)..=(MAX_TICK as i64)).contains(&tick) {
        return Err(ErrorCode::InvalidInput("root price out of tick range"));
    }
    Ok(tick as i32)
}

/// Liquidity of a range holding only token X, i.e. when the price sits at or
/// below the lower bound: `L = x * rPa * rPb / (rPb - rPa)`.
pub fn liq_x_only(x: Decimal, rp_a: Decimal, rp_b: Decimal) -> Result<Decimal> {
    check_range(rp_a, rp_b)?;
    Ok(x * rp_a * rp_b / (rp_b - rp_a))
}

/// Liquidity of a range holding only token Y, i.e. when the price sits at or
/// above the upper bound: `L = y / (rPb - rPa)`.
pub fn liq_y_only(y: Decimal, rp_a: Decimal, rp_b: Decimal) -> Result<Decimal> {
    check_range(rp_a, rp_b)?;
    Ok(y / (rp_b - rp_a))
}

/// Liquidity supported by real reserves `(x, y)` for the range
/// `[rp_a, rp_b]` at the current root price `rp`.
///
/// Below the range only X backs the liquidity, above it only Y; inside the
/// range X covers `[rp, rp_b]` and Y covers `[rp_a, rp]`, and the minimum of
/// the two sides is taken as the binding constraint.
pub fn liq_from_reserves(
    x: Decimal,
    y: Decimal,
    rp: Decimal,
    rp_a: Decimal,
    rp_b: Decimal,
) -> Result<Decimal> {
    check_range(rp_a, rp_b)?;
    if rp <= rp_a {
        liq_x_only(x, rp_a, rp_b)
    } else if rp < rp_b {
        let l_x = liq_x_only(x, rp, rp_b)?;
        let l_y = liq_y_only(y, rp_a, rp)?;
        Ok(l_x.min(l_y))
    } else {
        liq_y_only(y, rp_a, rp_b)
    }
}

/// Tick-indexed variant of [`liq_from_reserves`].
pub fn liq_from_reserves_at_ticks(
    x: Decimal,
    y: Decimal,
    tick: i32,
    tick_a: i32,
    tick_b: i32,
) -> Result<Decimal> {
    liq_from_reserves(
        x,
        y,
        tick_to_rp(tick)?,
        tick_to_rp(tick_a)?,
        tick_to_rp(tick_b)?,
    )
}

/// Amount of token X backing liquidity `l` over `[rp_a, rp_b]` at root price
/// `rp`: `x = L * (rPb - rP) / (rP * rPb)`, with `rp` clipped into the range.
pub fn x_from_liq(l: Decimal, rp: Decimal, rp_a: Decimal, rp_b: Decimal) -> Result<Decimal> {
    check_range(rp_a, rp_b)?;
    let rp = rp.min(rp_b).max(rp_a);
    Ok(l * (rp_b - rp) / (rp * rp_b))
}

/// Amount of token Y backing liquidity `l` over `[rp_a, rp_b]` at root price
/// `rp`: `y = L * (rP - rPa)`, with `rp` clipped into the range.
pub fn y_from_liq(l: Decimal, rp: Decimal, rp_a: Decimal, rp_b: Decimal) -> Result<Decimal> {
    check_range(rp_a, rp_b)?;
    let rp = rp.min(rp_b).max(rp_a);
    Ok(l * (rp - rp_a))
}

/// Tick-indexed variant of [`x_from_liq`].
pub fn x_from_liq_at_ticks(l: Decimal, tick: i32, tick_a: i32, tick_b: i32) -> Result<Decimal> {
    x_from_liq(l, tick_to_rp(tick)?, tick_to_rp(tick_a)?, tick_to_rp(tick_b)?)
}

/// Tick-indexed variant of [`y_from_liq`].
pub fn y_from_liq_at_ticks(l: Decimal, tick: i32, tick_a: i32, tick_b: i32) -> Result<Decimal> {
    y_from_liq(l, tick_to_rp(tick)?, tick_to_rp(tick_a)?, tick_to_rp(tick_b)?)
}

/// Lower range bound implied by liquidity, price and a Y amount:
/// `rPa = rP - y / L`.
pub fn lower_bound_from_liq(l: Decimal, rp: Decimal, y: Decimal) -> Result<Decimal> {
    if l <= Decimal::ZERO {
        return Err(ErrorCode::InvalidInput("liquidity must be positive"));
    }
    Ok(rp - y / l)
}

/// Upper range bound implied by liquidity, price and an X amount:
/// `rPb = L * rP / (L - rP * x)`.
pub fn upper_bound_from_liq(l: Decimal, rp: Decimal, x: Decimal) -> Result<Decimal> {
    let denominator = l - rp * x;
    if denominator <= Decimal::ZERO {
        return Err(ErrorCode::InvalidInput(
            "x amount exceeds what the liquidity can hold",
        ));
    }
    Ok(l * rp / denominator)
}

/// Lower range bound implied by both reserves, the price and the upper
/// bound: `rPa = y / (rPb * x) + rP - y / (rP * x)`.
pub fn lower_bound_from_reserves(
    x: Decimal,
    y: Decimal,
    rp: Decimal,
    rp_b: Decimal,
) -> Result<Decimal> {
    if x <= Decimal::ZERO || rp <= Decimal::ZERO || rp_b <= Decimal::ZERO {
        return Err(ErrorCode::InvalidInput("amounts and prices must be positive"));
    }
    Ok(y / (rp_b * x) + rp - y / (rp * x))
}

/// Upper range bound implied by both reserves, the price and the lower
/// bound: `rPb = rP * y / ((rPa - rP) * rP * x + y)`.
pub fn upper_bound_from_reserves(
    x: Decimal,
    y: Decimal,
    rp: Decimal,
    rp_a: Decimal,
) -> Result<Decimal> {
    let denominator = (rp_a - rp) * rp * x + y;
    if denominator <= Decimal::ZERO {
        return Err(ErrorCode::InvalidInput(
            "reserves do not support an upper bound",
        ));
    }
    Ok(rp * y / denominator)
}

/// Change of the X reserve when the price moves from `rp_old` to `rp_new`:
/// `dX = L * (1/rP_new - 1/rP_old)`. Positive when the price falls.
pub fn dx_from_price_move(l: Decimal, rp_old: Decimal, rp_new: Decimal) -> Result<Decimal> {
    if rp_old <= Decimal::ZERO || rp_new <= Decimal::ZERO {
        return Err(ErrorCode::InvalidInput("root prices must be positive"));
    }
    Ok(l * (Decimal::ONE / rp_new - Decimal::ONE / rp_old))
}

/// Change of the Y reserve when the price moves from `rp_old` to `rp_new`:
/// `dY = L * (rP_new - rP_old)`. Positive when the price rises.
pub fn dy_from_price_move(l: Decimal, rp_old: Decimal, rp_new: Decimal) -> Decimal {
    l * (rp_new - rp_old)
}

/// Oracle-adjusted change of the X reserve over a price move.
///
/// With coefficient `c` and oracle root price `rp_oracle`:
/// `dX = (L / rP_o) * ln(rP_old / rP_new)` when `c = 1`, else
/// `dX = (L / rP_o^c) * (rP_new^(c-1) - rP_old^(c-1)) / (1 - c)`.
pub fn dx_from_price_move_hmm(
    l: Decimal,
    rp_old: Decimal,
    rp_new: Decimal,
    c: Decimal,
    rp_oracle: Decimal,
) -> Result<Decimal> {
    check_hmm_inputs(rp_old, rp_new, c, rp_oracle)?;
    if c == Decimal::ONE {
        Ok(l / rp_oracle * (rp_old / rp_new).ln())
    } else {
        let one_minus_c = Decimal::ONE - c;
        let c_minus_one = -one_minus_c;
        Ok(l / rp_oracle.powd(c) * (rp_new.powd(c_minus_one) - rp_old.powd(c_minus_one))
            / one_minus_c)
    }
}

/// Oracle-adjusted change of the Y reserve over a price move.
///
/// With coefficient `c` and oracle root price `rp_oracle`:
/// `dY = L * rP_o * ln(rP_old / rP_new)` when `c = 1`, else
/// `dY = L * rP_o^c * (rP_new^(1-c) - rP_old^(1-c)) / (1 - c)`.
pub fn dy_from_price_move_hmm(
    l: Decimal,
    rp_old: Decimal,
    rp_new: Decimal,
    c: Decimal,
    rp_oracle: Decimal,
) -> Result<Decimal> {
    check_hmm_inputs(rp_old, rp_new, c, rp_oracle)?;
    if c == Decimal::ONE {
        Ok(l * rp_oracle * (rp_old / rp_new).ln())
    } else {
        let one_minus_c = Decimal::ONE - c;
        Ok(l * rp_oracle.powd(c) * (rp_new.powd(one_minus_c) - rp_old.powd(one_minus_c))
            / one_minus_c)
    }
}

/// New root price after an X amount enters or leaves the pool:
/// `rP_new = 1 / (dX / L + 1 / rP_old)`.
pub fn rp_from_dx(l: Decimal, rp_old: Decimal, dx: Decimal) -> Result<Decimal> {
    if l <= Decimal::ZERO {
        return Err(ErrorCode::InsufficientLiquidity("no liquidity to price against"));
    }
    if rp_old <= Decimal::ZERO {
        return Err(ErrorCode::InvalidInput("root prices must be positive"));
    }
    let inverse = dx / l + Decimal::ONE / rp_old;
    if inverse <= Decimal::ZERO {
        return Err(ErrorCode::InvalidInput("x delta drains the range"));
    }
    Ok(Decimal::ONE / inverse)
}

/// New root price after a Y amount enters or leaves the pool:
/// `rP_new = rP_old + dY / L`.
pub fn rp_from_dy(l: Decimal, rp_old: Decimal, dy: Decimal) -> Result<Decimal> {
    if l <= Decimal::ZERO {
        return Err(ErrorCode::InsufficientLiquidity("no liquidity to price against"));
    }
    Ok(rp_old + dy / l)
}

fn check_range(rp_a: Decimal, rp_b: Decimal) -> Result<()> {
    if rp_a <= Decimal::ZERO || rp_b <= rp_a {
        return Err(ErrorCode::InvalidInput("inverted or empty price range"));
    }
    Ok(())
}

fn check_hmm_inputs(rp_old: Decimal, rp_new: Decimal, c: Decimal, rp_oracle: Decimal) -> Result<()> {
    if rp_old <= Decimal::ZERO || rp_new <= Decimal::ZERO || rp_oracle <= Decimal::ZERO {
        return Err(ErrorCode::InvalidInput("root prices must be positive"));
    }
    if c < Decimal::ZERO {
        return Err(ErrorCode::InvalidInput("hmm coefficient must be non-negative"));
    }
    Ok(())
}
