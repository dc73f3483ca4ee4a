//! Movement builders shared by the unit tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{Movement, MovementKind, OptionAction, OptionContract, OptionType, TradeSide};

/// 15:00 UTC on the given March 2024 day, i.e. mid-session in New York.
pub(crate) fn march(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 15, 0, 0).unwrap()
}

pub(crate) fn march_date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

pub(crate) fn call(strike: Decimal) -> OptionContract {
    OptionContract {
        option_type: OptionType::Call,
        strike,
        expiration: NaiveDate::from_ymd_opt(2024, 4, 19).unwrap(),
        multiplier: dec!(100),
    }
}

pub(crate) fn put(strike: Decimal) -> OptionContract {
    OptionContract {
        option_type: OptionType::Put,
        ..call(strike)
    }
}

/// Hands out movements for one account with increasing sequence numbers.
pub(crate) struct MovementFeed {
    account_id: String,
    currency: String,
    next_sequence: u64,
}

impl MovementFeed {
    pub(crate) fn new(account_id: &str) -> Self {
        MovementFeed {
            account_id: account_id.to_string(),
            currency: "USD".to_string(),
            next_sequence: 1,
        }
    }

    pub(crate) fn in_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }

    fn next(&mut self, kind: MovementKind, at: DateTime<Utc>) -> Movement {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Movement::new(
            format!("{}-{}", self.account_id, sequence),
            self.account_id.clone(),
            sequence,
            kind,
            self.currency.clone(),
            at,
        )
    }

    pub(crate) fn deposit(&mut self, at: DateTime<Utc>, amount: Decimal) -> Movement {
        self.next(MovementKind::Deposit, at).with_amount(amount)
    }

    pub(crate) fn withdrawal(&mut self, at: DateTime<Utc>, amount: Decimal) -> Movement {
        self.next(MovementKind::Withdrawal, at).with_amount(amount)
    }

    pub(crate) fn interest(&mut self, at: DateTime<Utc>, amount: Decimal) -> Movement {
        self.next(MovementKind::Interest, at).with_amount(amount)
    }

    pub(crate) fn fee_only(&mut self, at: DateTime<Utc>, amount: Decimal) -> Movement {
        self.next(MovementKind::FeeOnly, at).with_amount(amount)
    }

    pub(crate) fn conversion(
        &mut self,
        at: DateTime<Utc>,
        amount: Decimal,
        to_currency: &str,
        to_amount: Decimal,
    ) -> Movement {
        self.next(
            MovementKind::Conversion {
                to_currency: to_currency.to_string(),
                to_amount,
            },
            at,
        )
        .with_amount(amount)
    }

    pub(crate) fn dividend(
        &mut self,
        at: DateTime<Utc>,
        ticker: &str,
        gross: Decimal,
        tax_withheld: Decimal,
    ) -> Movement {
        self.next(MovementKind::Dividend { tax_withheld }, at)
            .with_ticker(ticker)
            .with_amount(gross)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn trade(
        &mut self,
        at: DateTime<Utc>,
        side: TradeSide,
        ticker: &str,
        quantity: Decimal,
        price: Decimal,
        commission: Decimal,
        fee: Decimal,
    ) -> Movement {
        self.next(MovementKind::Trade { side }, at)
            .with_ticker(ticker)
            .with_quantity(quantity)
            .with_price(price)
            .with_commission(commission)
            .with_fee(fee)
    }

    pub(crate) fn buy(
        &mut self,
        at: DateTime<Utc>,
        ticker: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> Movement {
        self.trade(at, TradeSide::Buy, ticker, quantity, price, Decimal::ZERO, Decimal::ZERO)
    }

    pub(crate) fn sell(
        &mut self,
        at: DateTime<Utc>,
        ticker: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> Movement {
        self.trade(at, TradeSide::Sell, ticker, quantity, price, Decimal::ZERO, Decimal::ZERO)
    }

    /// Option movement; `premium` is the signed cash premium (negative when paid)
    /// and the per-share price is derived from it.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn option(
        &mut self,
        at: DateTime<Utc>,
        ticker: &str,
        contract: &OptionContract,
        action: OptionAction,
        contracts: Decimal,
        premium: Decimal,
        commission: Decimal,
        fee: Decimal,
    ) -> Movement {
        let price = if contracts.is_zero() {
            Decimal::ZERO
        } else {
            premium.abs() / (contracts * contract.multiplier)
        };
        self.next(
            MovementKind::OptionTrade {
                contract: contract.clone(),
                action,
            },
            at,
        )
        .with_ticker(ticker)
        .with_quantity(contracts)
        .with_price(price)
        .with_amount(premium)
        .with_commission(commission)
        .with_fee(fee)
    }
}
