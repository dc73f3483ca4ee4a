//! Movement domain models.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_OPTION_MULTIPLIER;
use crate::errors::InvalidMovementReason;
use crate::utils::time_utils::valuation_date_from_utc;

/// Direction of an equity trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionType {
    Call,
    Put,
}

/// What an option movement does to its contract position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionAction {
    BuyToOpen,
    SellToOpen,
    BuyToClose,
    SellToClose,
    Expired,
    Assigned,
    Exercised,
}

impl OptionAction {
    pub fn is_opening(&self) -> bool {
        matches!(self, OptionAction::BuyToOpen | OptionAction::SellToOpen)
    }

    /// Expiry, assignment and exercise close whichever side is open.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OptionAction::Expired | OptionAction::Assigned | OptionAction::Exercised
        )
    }

    /// Sign of the contract quantity change, when the action fixes it.
    /// Terminal actions return `None` because they follow the open side.
    pub fn signed_direction(&self) -> Option<Decimal> {
        match self {
            OptionAction::BuyToOpen | OptionAction::BuyToClose => Some(Decimal::ONE),
            OptionAction::SellToOpen | OptionAction::SellToClose => Some(Decimal::NEGATIVE_ONE),
            OptionAction::Expired | OptionAction::Assigned | OptionAction::Exercised => None,
        }
    }
}

/// Identifies a single option series on an underlying ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionContract {
    pub option_type: OptionType,
    pub strike: Decimal,
    pub expiration: NaiveDate,
    #[serde(default = "default_multiplier")]
    pub multiplier: Decimal,
}

fn default_multiplier() -> Decimal {
    Decimal::from(DEFAULT_OPTION_MULTIPLIER)
}

impl OptionContract {
    /// Contract symbol used as the leg key and for price lookups,
    /// e.g. `SPY 20240119 450C`.
    pub fn symbol(&self, underlying: &str) -> String {
        let right = match self.option_type {
            OptionType::Call => 'C',
            OptionType::Put => 'P',
        };
        format!(
            "{} {} {}{}",
            underlying,
            self.expiration.format("%Y%m%d"),
            self.strike.normalize(),
            right
        )
    }
}

/// Closed set of movement kinds. Every accumulator matches on it exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Trade {
        side: TradeSide,
    },
    OptionTrade {
        contract: OptionContract,
        action: OptionAction,
    },
    /// `amount` is the gross dividend.
    Dividend {
        #[serde(default)]
        tax_withheld: Decimal,
    },
    Deposit,
    Withdrawal,
    /// `amount` leaves the movement currency, `to_amount` arrives in `to_currency`.
    Conversion {
        to_currency: String,
        to_amount: Decimal,
    },
    FeeOnly,
    Interest,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Trade { side: TradeSide::Buy } => "TRADE_BUY",
            MovementKind::Trade { side: TradeSide::Sell } => "TRADE_SELL",
            MovementKind::OptionTrade { .. } => "OPTION_TRADE",
            MovementKind::Dividend { .. } => "DIVIDEND",
            MovementKind::Deposit => "DEPOSIT",
            MovementKind::Withdrawal => "WITHDRAWAL",
            MovementKind::Conversion { .. } => "CONVERSION",
            MovementKind::FeeOnly => "FEE_ONLY",
            MovementKind::Interest => "INTEREST",
        }
    }

    /// Kinds that must reference a ticker.
    pub fn requires_ticker(&self) -> bool {
        match self {
            MovementKind::Trade { .. }
            | MovementKind::OptionTrade { .. }
            | MovementKind::Dividend { .. } => true,
            MovementKind::Deposit
            | MovementKind::Withdrawal
            | MovementKind::Conversion { .. }
            | MovementKind::FeeOnly
            | MovementKind::Interest => false,
        }
    }
}

/// A single financial event on a brokerage account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: String,
    pub account_id: String,
    /// Monotonically increasing per account.
    pub sequence: u64,
    pub kind: MovementKind,
    pub ticker: Option<String>,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub commission: Decimal,
    #[serde(default)]
    pub fee: Decimal,
    /// Premium for option trades, cash amount for cash movements.
    #[serde(default)]
    pub amount: Decimal,
}

impl Movement {
    pub fn new(
        id: impl Into<String>,
        account_id: impl Into<String>,
        sequence: u64,
        kind: MovementKind,
        currency: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Movement {
            id: id.into(),
            account_id: account_id.into(),
            sequence,
            kind,
            ticker: None,
            currency: currency.into(),
            timestamp,
            quantity: Decimal::ZERO,
            price: Decimal::ZERO,
            commission: Decimal::ZERO,
            fee: Decimal::ZERO,
            amount: Decimal::ZERO,
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = price;
        self
    }

    pub fn with_commission(mut self, commission: Decimal) -> Self {
        self.commission = commission;
        self
    }

    pub fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    /// Calendar day of the movement in the valuation timezone.
    pub fn date_in(&self, tz: Tz) -> NaiveDate {
        valuation_date_from_utc(self.timestamp, tz)
    }

    pub fn ticker_str(&self) -> &str {
        self.ticker.as_deref().unwrap_or("")
    }

    pub fn kind_label(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Charge of a fee-only movement: `amount` when set, otherwise `fee`.
    pub fn charge(&self) -> Decimal {
        if self.amount.is_zero() {
            self.fee.abs()
        } else {
            self.amount.abs()
        }
    }

    /// Checks field-level consistency that does not depend on account state.
    pub fn validate_shape(&self) -> std::result::Result<(), InvalidMovementReason> {
        if self.commission.is_sign_negative() || self.fee.is_sign_negative() {
            return Err(InvalidMovementReason::Malformed(format!(
                "commission ({}) and fee ({}) must be non-negative",
                self.commission, self.fee
            )));
        }
        if self.kind.requires_ticker() && self.ticker_str().trim().is_empty() {
            return Err(InvalidMovementReason::Malformed(
                "movement kind requires a ticker".to_string(),
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(InvalidMovementReason::Malformed(
                "movement currency is empty".to_string(),
            ));
        }

        match &self.kind {
            MovementKind::Trade { .. } => {
                if self.quantity <= Decimal::ZERO {
                    return Err(InvalidMovementReason::Malformed(format!(
                        "trade quantity must be positive, got {}",
                        self.quantity
                    )));
                }
                if self.price.is_sign_negative() {
                    return Err(InvalidMovementReason::Malformed(format!(
                        "trade price must be non-negative, got {}",
                        self.price
                    )));
                }
            }
            MovementKind::OptionTrade { contract, .. } => {
                if self.quantity <= Decimal::ZERO {
                    return Err(InvalidMovementReason::Malformed(format!(
                        "option quantity must be positive, got {}",
                        self.quantity
                    )));
                }
                if contract.multiplier <= Decimal::ZERO {
                    return Err(InvalidMovementReason::Malformed(format!(
                        "option multiplier must be positive, got {}",
                        contract.multiplier
                    )));
                }
            }
            MovementKind::Conversion {
                to_currency,
                to_amount,
            } => {
                if to_currency.trim().is_empty() || to_currency == &self.currency {
                    return Err(InvalidMovementReason::Malformed(format!(
                        "conversion target currency '{}' is invalid",
                        to_currency
                    )));
                }
                if self.amount.is_sign_negative() || to_amount.is_sign_negative() {
                    return Err(InvalidMovementReason::Malformed(
                        "conversion amounts must be non-negative".to_string(),
                    ));
                }
            }
            MovementKind::Dividend { tax_withheld } => {
                if tax_withheld.is_sign_negative() {
                    return Err(InvalidMovementReason::Malformed(format!(
                        "dividend tax must be non-negative, got {}",
                        tax_withheld
                    )));
                }
            }
            MovementKind::Deposit
            | MovementKind::Withdrawal
            | MovementKind::FeeOnly
            | MovementKind::Interest => {}
        }
        Ok(())
    }
}
