//! Universal pool invariants, checked across randomly generated operation
//! sequences: monotone growth counters, liquidity conservation, non-negative
//! reserves, store positivity, the below/above growth identity, round-trip
//! bounds, oracle neutrality, fee extraction, and operation atomicity.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::errors::ErrorCode;
use crate::math;
use crate::pool_state::Pool;
use crate::tick::GrowthChannel;
use crate::unit_test::test_pool;

/// One randomly generated public operation.
#[derive(Clone, Debug)]
enum PoolOp {
    Deposit {
        owner: String,
        x: Decimal,
        y: Decimal,
        lower_tick: i32,
        upper_tick: i32,
    },
    Withdraw {
        owner: String,
        liq: Decimal,
        lower_tick: i32,
        upper_tick: i32,
    },
    SwapXIn {
        amount: Decimal,
        oracle: Option<Decimal>,
    },
    SwapYIn {
        amount: Decimal,
        oracle: Option<Decimal>,
    },
}

mod strategies {
    use super::*;

    pub fn owner() -> impl Strategy<Value = String> {
        (0u8..3).prop_map(|i| format!("lp-{i}"))
    }

    pub fn amount() -> impl Strategy<Value = Decimal> {
        (1u64..=1_000).prop_map(Decimal::from)
    }

    pub fn swap_amount() -> impl Strategy<Value = Decimal> {
        (1u64..=200).prop_map(Decimal::from)
    }

    /// Tick ranges around the bootstrap price; a few fixed ranges are mixed
    /// in so withdrawals sometimes hit an existing position.
    pub fn tick_range() -> impl Strategy<Value = (i32, i32)> {
        prop_oneof![
            Just((-1000, 500)),
            Just((-200, 300)),
            Just((-2000, -100)),
            Just((100, 1500)),
            (-3000i32..3000, 20i32..2000).prop_map(|(lower, width)| (lower, lower + width)),
        ]
    }

    /// Oracle root prices around the bootstrap price, or none.
    pub fn oracle() -> impl Strategy<Value = Option<Decimal>> {
        prop_oneof![
            Just(None),
            (850u64..1150).prop_map(|millis| Some(Decimal::from(millis) / dec!(1000))),
        ]
    }

    pub fn pool_op() -> impl Strategy<Value = PoolOp> {
        prop_oneof![
            (owner(), amount(), amount(), tick_range()).prop_map(
                |(owner, x, y, (lower_tick, upper_tick))| PoolOp::Deposit {
                    owner,
                    x,
                    y,
                    lower_tick,
                    upper_tick,
                }
            ),
            (owner(), (1u64..=500).prop_map(Decimal::from), tick_range()).prop_map(
                |(owner, liq, (lower_tick, upper_tick))| PoolOp::Withdraw {
                    owner,
                    liq,
                    lower_tick,
                    upper_tick,
                }
            ),
            (swap_amount(), oracle())
                .prop_map(|(amount, oracle)| PoolOp::SwapXIn { amount, oracle }),
            (swap_amount(), oracle())
                .prop_map(|(amount, oracle)| PoolOp::SwapYIn { amount, oracle }),
        ]
    }
}

/// Applies one operation, discarding its outputs.
fn apply(pool: &mut Pool, op: &PoolOp) -> Result<(), ErrorCode> {
    match op {
        PoolOp::Deposit {
            owner,
            x,
            y,
            lower_tick,
            upper_tick,
        } => pool
            .deposit(
                owner,
                *x,
                *y,
                math::tick_to_rp(*lower_tick)?,
                math::tick_to_rp(*upper_tick)?,
            )
            .map(|_| ()),
        PoolOp::Withdraw {
            owner,
            liq,
            lower_tick,
            upper_tick,
        } => pool
            .withdraw(
                owner,
                *liq,
                math::tick_to_rp(*lower_tick)?,
                math::tick_to_rp(*upper_tick)?,
            )
            .map(|_| ()),
        PoolOp::SwapXIn { amount, oracle } => pool.swap_x_in(*amount, *oracle).map(|_| ()),
        PoolOp::SwapYIn { amount, oracle } => pool.swap_y_in(*amount, *oracle).map(|_| ()),
    }
}

fn close(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Invariants that must hold after every public operation, successful or
    /// not, across arbitrary operation sequences.
    #[test]
    fn pool_invariants_hold_across_operation_sequences(
        ops in proptest::collection::vec(strategies::pool_op(), 1..12)
    ) {
        let tick_spacing = 10;
        let mut pool = test_pool(dec!(1.0), tick_spacing, dec!(1), dec!(0.003));
        let mut previous = *pool.global_state();

        for op in &ops {
            let before = pool.clone();
            let outcome = apply(&mut pool, op);

            // Failed operations leave no trace.
            if outcome.is_err() {
                prop_assert_eq!(&pool, &before);
            }

            let state = *pool.global_state();

            // Growth counters never decrease.
            prop_assert!(state.fee_growth.x >= previous.fee_growth.x);
            prop_assert!(state.fee_growth.y >= previous.fee_growth.y);
            prop_assert!(state.adj_growth.x >= previous.adj_growth.x);
            prop_assert!(state.adj_growth.y >= previous.adj_growth.y);

            // The current tick stays on the grid and liquidity stays
            // non-negative.
            prop_assert_eq!(state.tick.rem_euclid(tick_spacing), 0);
            prop_assert!(state.liquidity >= Decimal::ZERO);

            // Reserves never go negative.
            let (x, y) = pool.reserves();
            prop_assert!(x >= Decimal::ZERO);
            prop_assert!(y >= Decimal::ZERO);

            // Stores only hold live entries, and the below/above
            // decomposition reconstructs the global counters at every
            // active tick.
            for (tick, tick_state) in pool.active_ticks() {
                prop_assert!(tick_state.liq_gross > Decimal::ZERO);
                for channel in [GrowthChannel::Fees, GrowthChannel::Adjustments] {
                    let (below, above) = pool.growth_below_above(*tick, channel);
                    prop_assert_eq!(below + above, state.growth(channel));
                }
            }
            for position in pool.positions().values() {
                prop_assert!(position.liq > Decimal::ZERO);
            }

            // Active liquidity equals the net sum over ticks at or below
            // the current tick.
            let net_sum = pool
                .active_ticks()
                .iter()
                .filter(|(tick, _)| **tick <= state.tick)
                .fold(Decimal::ZERO, |acc, (_, tick_state)| acc + tick_state.liq_net);
            prop_assert_eq!(net_sum, state.liquidity);

            previous = state;
        }
    }

    /// Depositing and immediately withdrawing the minted liquidity never
    /// hands back more than was put in.
    #[test]
    fn deposit_withdraw_round_trip_never_profits(
        x in strategies::amount(),
        y in strategies::amount(),
        (lower_tick, upper_tick) in strategies::tick_range(),
    ) {
        let mut pool = test_pool(dec!(1.0), 10, Decimal::ZERO, Decimal::ZERO);
        let rp_a = math::tick_to_rp(lower_tick).unwrap();
        let rp_b = math::tick_to_rp(upper_tick).unwrap();

        if pool.deposit("lp", x, y, rp_a, rp_b).is_err() {
            // Range collapsed under the spacing; nothing to check.
            return Ok(());
        }
        let Some(position) = pool.positions().values().next().copied() else {
            return Ok(());
        };

        let receipt = pool.withdraw("lp", position.liq, rp_a, rp_b).unwrap();
        prop_assert!(receipt.x_sent <= x);
        prop_assert!(receipt.y_sent <= y);
        prop_assert!(pool.positions().is_empty());
        prop_assert!(pool.active_ticks().is_empty());
    }

    /// With the coefficient at zero an oracle quote must not change
    /// anything.
    #[test]
    fn oracle_is_inert_when_hmm_is_disabled(
        dx in strategies::swap_amount(),
        oracle_millis in 850u64..1150,
    ) {
        let mut plain = test_pool(dec!(1.0), 1, Decimal::ZERO, dec!(0.003));
        plain.deposit("lp", dec!(1000), dec!(1000), dec!(0.5), dec!(2.0)).unwrap();
        let mut quoted = plain.clone();

        let without = plain.swap_x_in(dx, None).unwrap();
        let oracle = Decimal::from(oracle_millis) / dec!(1000);
        let with = quoted.swap_x_in(dx, Some(oracle)).unwrap();

        prop_assert_eq!(without, with);
        prop_assert_eq!(plain, quoted);
    }

    /// The adjustment retained on a convergent swap is never negative, in
    /// both branches of the integral.
    #[test]
    fn convergent_swaps_retain_a_non_negative_adjustment(
        dx in strategies::swap_amount(),
        oracle_millis in 900u64..1000,
        c in prop_oneof![Just(dec!(0.5)), Just(dec!(1)), Just(dec!(1.5))],
    ) {
        let mut pool = test_pool(dec!(1.0), 1, c, Decimal::ZERO);
        pool.deposit("lp", dec!(1000), dec!(1000), dec!(0.5), dec!(2.0)).unwrap();

        // Price moves down toward an oracle below the start: convergent.
        let oracle = Decimal::from(oracle_millis) / dec!(1000);
        let summary = pool.swap_x_in(dx, Some(oracle)).unwrap();
        prop_assert!(summary.hmm_adjustment >= Decimal::ZERO);

        let (x, y) = pool.reserves();
        prop_assert!(x >= Decimal::ZERO);
        prop_assert!(y >= Decimal::ZERO);
    }

    /// The fee split matches the configured rate: the gross input divides
    /// into curve input plus fee pot, and the fee is the rate times gross.
    #[test]
    fn fees_are_extracted_at_the_configured_rate(dx in strategies::swap_amount()) {
        let fee_rate = dec!(0.003);
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, fee_rate);
        pool.deposit("lp", dec!(1000), dec!(1000), dec!(0.5), dec!(2.0)).unwrap();
        let (x_before, _) = pool.reserves();

        let summary = pool.swap_x_in(dx, None).unwrap();

        let (x_after, _) = pool.reserves();
        prop_assert_eq!(x_after - x_before + pool.fee_pots().0, summary.amount_in_gross);
        prop_assert!(close(
            summary.fee,
            summary.amount_in_gross * fee_rate,
            dec!(0.000000001)
        ));
    }
}
