//! Protocol constants.
//!
//! These parameters bound the tick grid, define the price base of the
//! exponential tick ladder, and fix the conservative rounding margins
//! applied to fills and withdrawals.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Base of the exponential tick ladder. A tick step of 1 moves the price by
/// one basis point: `price(i) = TICK_BASE^i`, `root_price(i) = TICK_BASE^(i/2)`.
pub const TICK_BASE: Decimal = dec!(1.0001);

/// The minimum tick index supported by the pool.
///
/// Bounds are chosen so that both the root price and the quoted price
/// `P = rP²` stay representable in 96-bit decimal arithmetic.
/// At this tick the price is roughly 8.8e-27.
pub const MIN_TICK: i32 = -600_000;

/// The maximum tick index supported by the pool.
///
/// At this tick the price is roughly 1.1e26.
pub const MAX_TICK: i32 = 600_000;

/// Conservative haircut applied to every swap fill.
///
/// Both the quoted output and its pure-AMM baseline are scaled by
/// `1 - ADJ_WHOLE_FILL` so rounding can never pay out more than the curve
/// supports.
pub const ADJ_WHOLE_FILL: Decimal = dec!(0.000000000001);

/// Conservative haircut applied to withdrawal amounts.
///
/// Currently zero: decimal arithmetic reproduces the deposit-side amounts
/// exactly, so no margin is needed. Kept as a named knob.
pub const ADJ_WITHDRAWAL: Decimal = Decimal::ZERO;

/// Tick spacing for stable pairs, single-tick granularity.
pub const TICK_SPACING_LOW: i32 = 1;

/// Tick spacing for mainstream pairs, 0.1% granularity.
pub const TICK_SPACING_MEDIUM: i32 = 10;

/// Tick spacing for volatile pairs, 0.6% granularity.
pub const TICK_SPACING_HIGH: i32 = 60;

/// Swap fee rate for the low tier (0.01%).
pub const FEE_RATE_LOW: Decimal = dec!(0.0001);

/// Swap fee rate for the medium tier (0.05%).
pub const FEE_RATE_MEDIUM: Decimal = dec!(0.0005);

/// Swap fee rate for the high tier (0.3%).
pub const FEE_RATE_HIGH: Decimal = dec!(0.003);
