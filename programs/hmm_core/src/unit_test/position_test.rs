use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::test_pool;
use crate::errors::ErrorCode;
use crate::position::PositionKey;
use crate::tick::GrowthPair;

mod deposit_tests {
    use super::*;

    #[test]
    fn single_sided_above_the_range_takes_only_y() {
        // Price above the range: the position is entirely in Y, the X offer
        // comes back as change.
        let mut pool = test_pool(dec!(2.0), 1, Decimal::ZERO, Decimal::ZERO);
        let receipt = pool
            .deposit("lp", dec!(50), dec!(100), dec!(1.0), dec!(1.5))
            .unwrap();

        assert_eq!(receipt.x_debited, Decimal::ZERO);
        assert_eq!(receipt.x_returned, dec!(50));
        assert!(receipt.y_debited > dec!(99.9) && receipt.y_debited <= dec!(100));
        assert_eq!(receipt.y_returned, dec!(100) - receipt.y_debited);

        assert_eq!(pool.reserves().0, Decimal::ZERO);
        assert_eq!(pool.reserves().1, receipt.y_debited);
        // Out-of-range liquidity does not activate.
        assert_eq!(pool.global_state().liquidity, Decimal::ZERO);
    }

    #[test]
    fn in_range_deposit_activates_liquidity_and_creates_state() {
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, Decimal::ZERO);
        let receipt = pool
            .deposit("lp", dec!(100), dec!(100), dec!(0.9), dec!(1.1))
            .unwrap();

        let liquidity = pool.global_state().liquidity;
        assert!(liquidity > Decimal::ZERO);
        // Floored liquidity is a whole number.
        assert_eq!(liquidity, liquidity.floor());

        assert_eq!(pool.positions().len(), 1);
        assert_eq!(pool.active_ticks().len(), 2);
        assert!(receipt.x_debited <= dec!(100));
        assert!(receipt.y_debited <= dec!(100));
        assert_eq!(pool.reserves(), (receipt.x_debited, receipt.y_debited));
    }

    #[test]
    fn second_deposit_stacks_on_the_same_position() {
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, Decimal::ZERO);
        pool.deposit("lp", dec!(100), dec!(100), dec!(0.9), dec!(1.1))
            .unwrap();
        let first = pool.positions().values().next().unwrap().liq;

        pool.deposit("lp", dec!(100), dec!(100), dec!(0.9), dec!(1.1))
            .unwrap();
        assert_eq!(pool.positions().len(), 1);
        let stacked = pool.positions().values().next().unwrap().liq;
        assert_eq!(stacked, first * dec!(2));
    }

    #[test]
    fn dust_deposit_creates_no_position() {
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, Decimal::ZERO);
        // Amounts too small to mint one whole liquidity unit.
        let receipt = pool
            .deposit("lp", dec!(0.0001), dec!(0.0001), dec!(0.9), dec!(1.1))
            .unwrap();
        assert_eq!(receipt.x_debited, Decimal::ZERO);
        assert!(pool.positions().is_empty());
        assert!(pool.active_ticks().is_empty());
    }

    #[test]
    fn invalid_deposits_are_rejected() {
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, Decimal::ZERO);
        assert!(matches!(
            pool.deposit("lp", dec!(-1), dec!(1), dec!(0.9), dec!(1.1)),
            Err(ErrorCode::InvalidInput(_))
        ));
        assert!(matches!(
            pool.deposit("lp", dec!(1), dec!(1), dec!(1.1), dec!(0.9)),
            Err(ErrorCode::InvalidInput(_))
        ));
    }

    #[test]
    fn range_collapsing_under_spacing_is_rejected() {
        let mut pool = test_pool(dec!(1.0), 200, Decimal::ZERO, Decimal::ZERO);
        // Both bounds quantize down to the same grid tick.
        assert!(matches!(
            pool.deposit("lp", dec!(1), dec!(1), dec!(1.0), dec!(1.005)),
            Err(ErrorCode::InvalidInput(_))
        ));
    }
}

mod withdraw_tests {
    use super::*;

    #[test]
    fn full_round_trip_returns_the_deposited_amounts() {
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, Decimal::ZERO);
        let deposit = pool
            .deposit("lp", dec!(100), dec!(100), dec!(0.9), dec!(1.1))
            .unwrap();
        let liquidity = pool.positions().values().next().unwrap().liq;

        let withdrawal = pool.withdraw("lp", liquidity, dec!(0.9), dec!(1.1)).unwrap();

        // No swaps happened: the price is unchanged, no fees accrued, and
        // the withdrawal margin is zero, so amounts match exactly.
        assert_eq!(withdrawal.x_sent, deposit.x_debited);
        assert_eq!(withdrawal.y_sent, deposit.y_debited);
        assert!(withdrawal.x_sent <= dec!(100));
        assert!(withdrawal.y_sent <= dec!(100));

        assert!(pool.positions().is_empty());
        assert!(pool.active_ticks().is_empty());
        assert_eq!(pool.global_state().liquidity, Decimal::ZERO);
        assert_eq!(pool.reserves(), (Decimal::ZERO, Decimal::ZERO));
    }

    #[test]
    fn partial_withdrawal_keeps_the_position() {
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, Decimal::ZERO);
        pool.deposit("lp", dec!(100), dec!(100), dec!(0.9), dec!(1.1))
            .unwrap();
        let liquidity = pool.positions().values().next().unwrap().liq;

        pool.withdraw("lp", liquidity / dec!(2), dec!(0.9), dec!(1.1))
            .unwrap();
        let remaining = pool.positions().values().next().unwrap().liq;
        assert_eq!(remaining, liquidity / dec!(2));
        assert_eq!(pool.global_state().liquidity, remaining);
    }

    #[test]
    fn unknown_position_is_invalid_input() {
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, Decimal::ZERO);
        assert!(matches!(
            pool.withdraw("nobody", dec!(1), dec!(0.9), dec!(1.1)),
            Err(ErrorCode::InvalidInput(_))
        ));
    }

    #[test]
    fn over_withdrawal_is_insufficient_liquidity() {
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, Decimal::ZERO);
        pool.deposit("lp", dec!(100), dec!(100), dec!(0.9), dec!(1.1))
            .unwrap();
        let liquidity = pool.positions().values().next().unwrap().liq;

        let before = pool.clone();
        let result = pool.withdraw("lp", liquidity + dec!(1), dec!(0.9), dec!(1.1));
        assert!(matches!(result, Err(ErrorCode::InsufficientLiquidity(_))));
        // The failed operation left no trace.
        assert_eq!(pool, before);
    }
}

mod set_position_tests {
    use super::*;

    #[test]
    fn new_position_records_the_current_inside_snapshots() {
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, Decimal::ZERO);
        // Growth that predates the position must not be claimable by it.
        pool.global_state.fee_growth = GrowthPair { x: dec!(5), y: dec!(5) };

        let accruals = pool.set_position("lp", -10, 10, dec!(1000)).unwrap();
        assert_eq!(accruals.fees, GrowthPair::ZERO);

        let key = PositionKey::new("lp", -10, 10);
        let position = pool.positions()[&key];
        // The boundary snapshots fence off everything that happened before
        // the ticks existed: the recorded inside growth starts at zero.
        assert_eq!(position.fee_inside_last, GrowthPair::ZERO);

        // Growth after creation is claimable as usual.
        pool.global_state.fee_growth = GrowthPair { x: dec!(6), y: dec!(5) };
        let accruals = pool.set_position("lp", -10, 10, Decimal::ZERO).unwrap();
        assert_eq!(accruals.fees, GrowthPair { x: dec!(1000), y: dec!(0) });
    }

    #[test]
    fn accruals_scale_with_the_held_liquidity() {
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, Decimal::ZERO);
        pool.set_position("lp", -10, 10, dec!(1000)).unwrap();

        // Growth recorded while the position was live.
        pool.global_state.fee_growth = GrowthPair {
            x: dec!(0.001),
            y: dec!(0.002),
        };

        // A zero-delta touch settles the accruals.
        let accruals = pool.set_position("lp", -10, 10, Decimal::ZERO).unwrap();
        assert_eq!(accruals.fees, GrowthPair { x: dec!(1), y: dec!(2) });

        // And a second touch has nothing left to settle.
        let accruals = pool.set_position("lp", -10, 10, Decimal::ZERO).unwrap();
        assert_eq!(accruals.fees, GrowthPair::ZERO);
    }

    #[test]
    fn withdrawing_everything_deletes_position_and_ticks() {
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, Decimal::ZERO);
        pool.set_position("lp", -10, 10, dec!(1000)).unwrap();
        pool.set_position("lp", -10, 10, dec!(-1000)).unwrap();

        assert!(pool.positions().is_empty());
        assert!(pool.active_ticks().is_empty());
        assert_eq!(pool.global_state().liquidity, Decimal::ZERO);
    }

    #[test]
    fn inverted_tick_range_is_rejected() {
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, Decimal::ZERO);
        assert!(matches!(
            pool.set_position("lp", 10, -10, dec!(1)),
            Err(ErrorCode::InvalidInput(_))
        ));
    }

    #[test]
    fn out_of_range_position_does_not_touch_active_liquidity() {
        let mut pool = test_pool(dec!(1.0), 1, Decimal::ZERO, Decimal::ZERO);
        pool.set_position("lp", 100, 200, dec!(1000)).unwrap();
        assert_eq!(pool.global_state().liquidity, Decimal::ZERO);

        pool.set_position("lp", -200, -100, dec!(1000)).unwrap();
        assert_eq!(pool.global_state().liquidity, Decimal::ZERO);
    }
}
