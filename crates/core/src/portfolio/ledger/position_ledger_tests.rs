#[cfg(test)]
mod tests {
    use crate::errors::{Error, InvalidMovementError, InvalidMovementReason};
    use crate::movements::movements_fixtures::{call, march, put, MovementFeed};
    use crate::movements::{OptionAction, TradeSide};
    use crate::portfolio::ledger::{LegKind, PositionLedger};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn reason_of(err: Error) -> InvalidMovementReason {
        match err {
            Error::InvalidMovement(InvalidMovementError { reason, .. }) => reason,
            other => panic!("expected an invalid movement, got {:?}", other),
        }
    }

    #[test]
    fn test_buys_average_and_sell_realizes_against_average() {
        let mut feed = MovementFeed::new("acc");
        let mut ledger = PositionLedger::new("acc");

        let first = feed.trade(march(1), TradeSide::Buy, "AAPL", dec!(10), dec!(100), dec!(1), Decimal::ZERO);
        let second = feed.trade(march(2), TradeSide::Buy, "AAPL", dec!(10), dec!(120), dec!(1), Decimal::ZERO);
        let sell = feed.trade(march(3), TradeSide::Sell, "AAPL", dec!(5), dec!(130), dec!(1), Decimal::ZERO);

        let delta = ledger.apply(&first).unwrap();
        assert_eq!(delta.leg_kind, Some(LegKind::Equity));
        assert_eq!(delta.cost_basis_change, dec!(1001));
        assert!(delta.is_opening());

        ledger.apply(&second).unwrap();
        let position = ledger.position("AAPL", "USD").unwrap();
        assert_eq!(position.quantity, dec!(20));
        assert_eq!(position.total_cost_basis, dec!(2202));
        assert_eq!(position.average_cost, dec!(110.1));

        let delta = ledger.apply(&sell).unwrap();
        assert!(delta.is_closing());
        assert_eq!(delta.cost_basis_change, dec!(-550.5));
        assert_eq!(delta.realized, dec!(98.5));
        assert_eq!(ledger.invested("USD"), dec!(1651.5));
    }

    #[test]
    fn test_full_sell_removes_position() {
        let mut feed = MovementFeed::new("acc");
        let mut ledger = PositionLedger::new("acc");
        ledger.apply(&feed.buy(march(1), "MSFT", dec!(3), dec!(400))).unwrap();
        let delta = ledger.apply(&feed.sell(march(2), "MSFT", dec!(3), dec!(410))).unwrap();

        assert_eq!(delta.realized, dec!(30));
        assert_eq!(delta.quantity_after, Decimal::ZERO);
        assert!(ledger.position("MSFT", "USD").is_none());
        assert!(!ledger.has_open_legs("USD"));
        assert!(ledger.open_tickers().is_empty());
    }

    #[test]
    fn test_oversell_is_rejected_without_mutation() {
        let mut feed = MovementFeed::new("acc");
        let mut ledger = PositionLedger::new("acc");
        ledger.apply(&feed.buy(march(1), "TSLA", dec!(5), dec!(200))).unwrap();
        let before = ledger.clone();

        let err = ledger
            .apply(&feed.sell(march(2), "TSLA", dec!(6), dec!(210)))
            .unwrap_err();
        match reason_of(err) {
            InvalidMovementReason::Oversell {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, dec!(6));
                assert_eq!(available, dec!(5));
            }
            other => panic!("unexpected reason {:?}", other),
        }
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_sell_without_position_is_oversell() {
        let mut feed = MovementFeed::new("acc");
        let mut ledger = PositionLedger::new("acc");
        let err = ledger
            .apply(&feed.sell(march(1), "NVDA", dec!(1), dec!(900)))
            .unwrap_err();
        assert!(matches!(reason_of(err), InvalidMovementReason::Oversell { .. }));
    }

    #[test]
    fn test_short_option_buy_to_close_realizes_net_premium() {
        let mut feed = MovementFeed::new("acc");
        let mut ledger = PositionLedger::new("acc");
        let contract = call(dec!(180));

        let open = feed.option(march(1), "AAPL", &contract, OptionAction::SellToOpen, dec!(1), dec!(120), dec!(0.65), dec!(0.12));
        let delta = ledger.apply(&open).unwrap();
        assert_eq!(delta.leg_kind, Some(LegKind::Option));
        assert_eq!(delta.quantity_after, dec!(-1));
        assert_eq!(delta.opening_notional, dec!(120));
        assert_eq!(delta.realized, Decimal::ZERO);
        assert!(ledger.has_open_legs_for("AAPL", "USD"));

        let close = feed.option(march(5), "AAPL", &contract, OptionAction::BuyToClose, dec!(1), dec!(-40), dec!(0.65), Decimal::ZERO);
        let delta = ledger.apply(&close).unwrap();
        assert_eq!(delta.realized, dec!(78.58));
        assert_eq!(ledger.option_legs().count(), 0);
        assert!(!ledger.has_open_legs("USD"));
    }

    #[test]
    fn test_partial_close_detaches_proportional_premium() {
        let mut feed = MovementFeed::new("acc");
        let mut ledger = PositionLedger::new("acc");
        let contract = put(dec!(90));

        ledger
            .apply(&feed.option(march(1), "XYZ", &contract, OptionAction::SellToOpen, dec!(2), dec!(200), Decimal::ZERO, Decimal::ZERO))
            .unwrap();
        let delta = ledger
            .apply(&feed.option(march(2), "XYZ", &contract, OptionAction::BuyToClose, dec!(1), dec!(-50), Decimal::ZERO, Decimal::ZERO))
            .unwrap();

        assert_eq!(delta.realized, dec!(50));
        let leg = ledger.option_legs_for("XYZ", "USD").next().unwrap();
        assert_eq!(leg.quantity, dec!(-1));
        assert_eq!(leg.open_premium, dec!(100));
    }

    #[test]
    fn test_expired_long_option_realizes_paid_premium() {
        let mut feed = MovementFeed::new("acc");
        let mut ledger = PositionLedger::new("acc");
        let contract = call(dec!(500));

        ledger
            .apply(&feed.option(march(1), "SPY", &contract, OptionAction::BuyToOpen, dec!(1), dec!(-15.75), dec!(0.75), dec!(0.52)))
            .unwrap();
        let delta = ledger
            .apply(&feed.option(march(2), "SPY", &contract, OptionAction::Expired, dec!(1), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO))
            .unwrap();

        assert_eq!(delta.realized, dec!(-17.02));
        assert!(ledger.open_tickers().is_empty());
    }

    #[test]
    fn test_assigned_put_premium_folds_into_next_buy() {
        let mut feed = MovementFeed::new("acc");
        let mut ledger = PositionLedger::new("acc");
        let contract = put(dec!(50));

        ledger
            .apply(&feed.option(march(1), "F", &contract, OptionAction::SellToOpen, dec!(1), dec!(150), Decimal::ZERO, Decimal::ZERO))
            .unwrap();
        let delta = ledger
            .apply(&feed.option(march(8), "F", &contract, OptionAction::Assigned, dec!(1), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO))
            .unwrap();
        assert_eq!(delta.realized, Decimal::ZERO);
        assert_eq!(delta.pending_adjustment, dec!(150));
        assert_eq!(ledger.pending_basis_adjustment("F", "USD"), dec!(150));

        let delta = ledger.apply(&feed.buy(march(8), "F", dec!(100), dec!(50))).unwrap();
        assert_eq!(delta.pending_adjustment, Decimal::ZERO);
        let position = ledger.position("F", "USD").unwrap();
        assert_eq!(position.total_cost_basis, dec!(4850));
        assert_eq!(position.average_cost, dec!(48.5));
        assert_eq!(ledger.pending_basis_adjustment("F", "USD"), Decimal::ZERO);
    }

    #[test]
    fn test_open_against_opposite_side_is_malformed() {
        let mut feed = MovementFeed::new("acc");
        let mut ledger = PositionLedger::new("acc");
        let contract = call(dec!(100));

        ledger
            .apply(&feed.option(march(1), "AMD", &contract, OptionAction::BuyToOpen, dec!(1), dec!(-300), Decimal::ZERO, Decimal::ZERO))
            .unwrap();
        let before = ledger.clone();
        let err = ledger
            .apply(&feed.option(march(2), "AMD", &contract, OptionAction::SellToOpen, dec!(1), dec!(280), Decimal::ZERO, Decimal::ZERO))
            .unwrap_err();

        assert!(matches!(reason_of(err), InvalidMovementReason::Malformed(_)));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_buy_to_close_on_long_leg_is_oversell() {
        let mut feed = MovementFeed::new("acc");
        let mut ledger = PositionLedger::new("acc");
        let contract = call(dec!(100));

        ledger
            .apply(&feed.option(march(1), "AMD", &contract, OptionAction::BuyToOpen, dec!(1), dec!(-300), Decimal::ZERO, Decimal::ZERO))
            .unwrap();
        let err = ledger
            .apply(&feed.option(march(2), "AMD", &contract, OptionAction::BuyToClose, dec!(1), dec!(-310), Decimal::ZERO, Decimal::ZERO))
            .unwrap_err();
        assert!(matches!(reason_of(err), InvalidMovementReason::Oversell { .. }));
    }

    #[test]
    fn test_cash_movements_leave_ledger_untouched() {
        let mut feed = MovementFeed::new("acc");
        let mut ledger = PositionLedger::new("acc");
        let delta = ledger.apply(&feed.deposit(march(1), dec!(1000))).unwrap();
        assert_eq!(delta.leg_id, None);
        assert_eq!(ledger, PositionLedger::new("acc"));
    }

    #[test]
    fn test_ledger_survives_json_round_trip() {
        let mut feed = MovementFeed::new("acc");
        let mut ledger = PositionLedger::new("acc");
        ledger.apply(&feed.buy(march(1), "AAPL", dec!(3), dec!(171.25))).unwrap();
        ledger
            .apply(&feed.option(march(1), "AAPL", &call(dec!(180)), OptionAction::SellToOpen, dec!(1), dec!(95), dec!(0.65), Decimal::ZERO))
            .unwrap();

        let json = serde_json::to_string(&ledger).unwrap();
        let restored: PositionLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, ledger);
    }
}
