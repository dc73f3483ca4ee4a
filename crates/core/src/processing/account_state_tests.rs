#[cfg(test)]
mod tests {
    use crate::errors::{Error, InvalidMovementError, InvalidMovementReason};
    use crate::movements::movements_fixtures::{call, march, march_date, MovementFeed};
    use crate::movements::{Movement, OptionAction};
    use crate::processing::{AccountState, ProcessingCheckpoint};
    use crate::quotes::{NoPriceProvider, StaticPriceProvider};
    use crate::settings::EngineSettings;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn history() -> Vec<Movement> {
        let mut feed = MovementFeed::new("acc");
        let contract = call(dec!(190));
        vec![
            feed.deposit(march(1), dec!(10000)),
            feed.buy(march(1), "AAPL", dec!(20), dec!(170)),
            feed.option(march(4), "AAPL", &contract, OptionAction::SellToOpen, dec!(1), dec!(180), dec!(0.65), dec!(0.05)),
            feed.dividend(march(5), "AAPL", dec!(4.80), dec!(0.72)),
            feed.sell(march(6), "AAPL", dec!(5), dec!(182)),
            feed.option(march(8), "AAPL", &contract, OptionAction::BuyToClose, dec!(1), dec!(-60), dec!(0.65), Decimal::ZERO),
            feed.interest(march(8), dec!(2.15)),
            feed.sell(march(11), "AAPL", dec!(15), dec!(176)),
        ]
    }

    fn rejection(err: Error) -> InvalidMovementError {
        match err {
            Error::InvalidMovement(invalid) => invalid,
            other => panic!("expected an invalid movement, got {:?}", other),
        }
    }

    #[test]
    fn test_two_chunks_match_one_chunk() {
        let settings = EngineSettings::default();
        let prices = StaticPriceProvider::new().with_price("AAPL", "USD", dec!(175));
        let movements = history();

        let whole = AccountState::new("acc", &settings)
            .apply_chunk(&movements, &prices)
            .unwrap();

        let (prefix, suffix) = movements.split_at(3);
        let first = AccountState::new("acc", &settings)
            .apply_chunk(prefix, &prices)
            .unwrap();
        let second = first.state.clone().apply_chunk(suffix, &prices).unwrap();

        assert_eq!(second.state, whole.state);
        let mut chunked = first.broker_snapshots.clone();
        chunked.extend(second.broker_snapshots.clone());
        assert_eq!(chunked, whole.broker_snapshots);
        let mut chunked_tickers = first.ticker_snapshots.clone();
        chunked_tickers.extend(second.ticker_snapshots.clone());
        assert_eq!(chunked_tickers, whole.ticker_snapshots);
        assert_eq!(whole.applied, 8);
        assert_eq!(whole.state.applied_count(), 8);
        assert_eq!(whole.state.last_sequence(), Some(8));
    }

    #[test]
    fn test_checkpoint_round_trip_resumes_identically() {
        let settings = EngineSettings::default();
        let movements = history();
        let (prefix, suffix) = movements.split_at(5);

        let first = AccountState::new("acc", &settings)
            .apply_chunk(prefix, &NoPriceProvider)
            .unwrap();
        let json = ProcessingCheckpoint::new(&first.state, first.applied)
            .to_json()
            .unwrap();
        let restored = ProcessingCheckpoint::from_json(&json).unwrap();
        assert_eq!(restored.last_sequence, Some(5));
        assert_eq!(restored.state, first.state);

        let resumed = restored.state.apply_chunk(suffix, &NoPriceProvider).unwrap();
        let uninterrupted = AccountState::new("acc", &settings)
            .apply_chunk(&movements, &NoPriceProvider)
            .unwrap();
        assert_eq!(resumed.state, uninterrupted.state);
    }

    #[test]
    fn test_days_are_sealed_and_final_day_is_flushed() {
        let settings = EngineSettings::default();
        let outcome = AccountState::new("acc", &settings)
            .apply_chunk(&history(), &NoPriceProvider)
            .unwrap();

        let sealed: Vec<_> = outcome.broker_snapshots.iter().map(|s| s.date).collect();
        assert_eq!(
            sealed,
            vec![march_date(1), march_date(4), march_date(5), march_date(6), march_date(8)]
        );
        assert_eq!(outcome.state.open_day(), Some(march_date(11)));

        let flushed = outcome.state.flush(&NoPriceProvider);
        assert_eq!(flushed.broker_snapshots.len(), 1);
        let last = &flushed.broker_snapshots[0];
        assert_eq!(last.date, march_date(11));
        assert_eq!(last.movement_counter, 8);
        assert!(!last.open_trades);
        assert_eq!(last.invested, Decimal::ZERO);
        // 5 @ 182 and 15 @ 176 against 3400, plus 118.65 on the call
        assert_eq!(last.realized_gains, dec!(268.65));
        assert_eq!(last.net_cash_flow, last.expected_net_cash_flow());

        // flushing twice renders the same records
        assert_eq!(outcome.state.flush(&NoPriceProvider), flushed);
    }

    #[test]
    fn test_ticker_snapshots_follow_touched_days() {
        let settings = EngineSettings::default();
        let prices = StaticPriceProvider::new().with_price("AAPL", "USD", dec!(175));
        let outcome = AccountState::new("acc", &settings)
            .apply_chunk(&history(), &prices)
            .unwrap();

        // day 1 is sealed with the deposit and the buy; only AAPL has a ticker snapshot
        let day1: Vec<_> = outcome
            .ticker_snapshots
            .iter()
            .filter(|s| s.date == march_date(1))
            .collect();
        assert_eq!(day1.len(), 1);
        let aapl = day1[0];
        assert_eq!(aapl.id, "acc_AAPL_USD_2024-03-01");
        assert_eq!(aapl.quantity, dec!(20));
        assert_eq!(aapl.average_cost, dec!(170));
        assert_eq!(aapl.unrealized_gains, dec!(100));
        assert_eq!(aapl.unrealized_gains_percentage, dec!(2.94));
        assert_eq!(aapl.movement_counter, 1);

        // the call has no price, so day 4 keeps the day 1 value
        let day4 = outcome
            .ticker_snapshots
            .iter()
            .find(|s| s.date == march_date(4))
            .unwrap();
        assert_eq!(day4.open_option_contracts, dec!(1));
        assert_eq!(day4.unrealized_gains, dec!(100));
        assert_eq!(day4.options_income, dec!(180));
        assert!(day4.open_trades);

        assert!(outcome
            .ticker_snapshots
            .iter()
            .all(|s| s.date != march_date(11)));
    }

    #[test]
    fn test_unrealized_carries_forward_when_prices_disappear() {
        let settings = EngineSettings::default();
        let mut feed = MovementFeed::new("acc");
        let first_chunk = vec![
            feed.buy(march(1), "MSFT", dec!(10), dec!(100)),
            feed.deposit(march(2), dec!(50)),
        ];
        let second_chunk = vec![feed.deposit(march(3), dec!(50))];

        let priced = StaticPriceProvider::new().with_price("MSFT", "USD", dec!(110));
        let first = AccountState::new("acc", &settings)
            .apply_chunk(&first_chunk, &priced)
            .unwrap();
        assert_eq!(first.broker_snapshots[0].unrealized_gains, dec!(100));
        assert_eq!(first.broker_snapshots[0].unrealized_gains_percentage, dec!(10.00));

        let second = first
            .state
            .apply_chunk(&second_chunk, &NoPriceProvider)
            .unwrap();
        assert_eq!(second.broker_snapshots[0].date, march_date(2));
        assert_eq!(second.broker_snapshots[0].unrealized_gains, dec!(100));

        let flushed = second.state.flush(&NoPriceProvider);
        assert_eq!(flushed.broker_snapshots[0].unrealized_gains, dec!(100));
    }

    #[test]
    fn test_out_of_order_sequence_is_rejected() {
        let settings = EngineSettings::default();
        let mut feed = MovementFeed::new("acc");
        let first = feed.deposit(march(1), dec!(10));
        let second = feed.deposit(march(2), dec!(10));

        let err = AccountState::new("acc", &settings)
            .apply_chunk(&[second, first], &NoPriceProvider)
            .unwrap_err();
        let invalid = rejection(err);
        assert_eq!(invalid.sequence, 1);
        assert_eq!(invalid.kind, "DEPOSIT");
        assert_eq!(
            invalid.reason,
            InvalidMovementReason::OutOfOrder {
                previous: 2,
                sequence: 1
            }
        );
    }

    #[test]
    fn test_foreign_account_movement_is_rejected() {
        let settings = EngineSettings::default();
        let mut feed = MovementFeed::new("other");
        let err = AccountState::new("acc", &settings)
            .apply_chunk(&[feed.deposit(march(1), dec!(10))], &NoPriceProvider)
            .unwrap_err();
        assert!(matches!(
            rejection(err).reason,
            InvalidMovementReason::AccountMismatch { .. }
        ));
    }

    #[test]
    fn test_oversell_fails_chunk_with_context() {
        let settings = EngineSettings::default();
        let mut feed = MovementFeed::new("acc");
        let movements = vec![
            feed.buy(march(1), "TSLA", dec!(2), dec!(200)),
            feed.sell(march(2), "TSLA", dec!(3), dec!(210)),
        ];
        let err = AccountState::new("acc", &settings)
            .apply_chunk(&movements, &NoPriceProvider)
            .unwrap_err();
        let invalid = rejection(err);
        assert_eq!(invalid.account_id, "acc");
        assert_eq!(invalid.sequence, 2);
        assert_eq!(invalid.kind, "TRADE_SELL");
        assert!(matches!(invalid.reason, InvalidMovementReason::Oversell { .. }));
    }

    #[test]
    fn test_operations_are_emitted_per_chunk() {
        let settings = EngineSettings::default();
        let movements = history();
        let outcome = AccountState::new("acc", &settings)
            .apply_chunk(&movements, &NoPriceProvider)
            .unwrap();

        assert_eq!(outcome.operations.len(), 1);
        let operation = &outcome.operations[0];
        assert!(!operation.is_open);
        assert_eq!(operation.close_date, Some(march(11)));
        assert_eq!(operation.realized, dec!(268.65));
        assert_eq!(operation.dividends, dec!(4.80));
        assert_eq!(operation.movement_count, 6);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.state.operation("AAPL"), Some(operation));
    }

    #[test]
    fn test_untouched_open_operation_has_no_contribution_today() {
        let settings = EngineSettings::default();
        let mut feed = MovementFeed::new("acc");
        let movements = vec![
            feed.buy(march(4), "AAPL", dec!(10), dec!(100)),
            feed.sell(march(4), "AAPL", dec!(5), dec!(120)),
            feed.buy(march(5), "MSFT", dec!(2), dec!(400)),
        ];

        let first = AccountState::new("acc", &settings)
            .apply_chunk(&movements[..2], &NoPriceProvider)
            .unwrap();
        let aapl = first.state.operation("AAPL").unwrap();
        assert_eq!(aapl.realized_today, dec!(100));
        assert_eq!(aapl.capital_deployed_today, dec!(1000));

        let second = first
            .state
            .apply_chunk(&movements[2..], &NoPriceProvider)
            .unwrap();
        let aapl = second.state.operation("AAPL").unwrap();
        assert!(aapl.is_open);
        assert_eq!(aapl.realized, dec!(100));
        assert_eq!(aapl.realized_today, Decimal::ZERO);
        assert_eq!(aapl.capital_deployed_today, Decimal::ZERO);

        // the reset AAPL record is handed out again alongside the new MSFT one
        let tickers: Vec<_> = second.operations.iter().map(|op| op.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(second.operations[0], *aapl);
    }
}
