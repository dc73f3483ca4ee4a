//! Running quantity and cost-basis state of one account.

use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::positions_model::{option_leg_key, position_key, OptionLeg, Position};
use crate::errors::{InvalidMovementError, InvalidMovementReason, Result};
use crate::movements::{Movement, MovementKind, OptionAction, OptionContract, TradeSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegKind {
    Equity,
    Option,
}

/// Effect of one movement on the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionDelta {
    pub ticker: Option<String>,
    pub currency: String,
    /// Key of the equity position or option leg touched, if any.
    pub leg_id: Option<String>,
    pub leg_kind: Option<LegKind>,
    /// Shares for equity legs, signed contracts for option legs.
    pub quantity_before: Decimal,
    pub quantity_after: Decimal,
    pub realized: Decimal,
    pub cost_basis_change: Decimal,
    /// `|quantity| × multiplier × price` of an opening leg, zero otherwise.
    pub opening_notional: Decimal,
    /// Assigned or exercised premium still waiting for a share trade on the
    /// ticker after this movement. Non-zero means the strategy is not flat.
    pub pending_adjustment: Decimal,
}

impl PositionDelta {
    fn without_leg(movement: &Movement) -> Self {
        PositionDelta {
            ticker: movement.ticker.clone(),
            currency: movement.currency.clone(),
            leg_id: None,
            leg_kind: None,
            quantity_before: Decimal::ZERO,
            quantity_after: Decimal::ZERO,
            realized: Decimal::ZERO,
            cost_basis_change: Decimal::ZERO,
            opening_notional: Decimal::ZERO,
            pending_adjustment: Decimal::ZERO,
        }
    }

    pub fn is_opening(&self) -> bool {
        self.quantity_after.abs() > self.quantity_before.abs()
    }

    pub fn is_closing(&self) -> bool {
        self.quantity_after.abs() < self.quantity_before.abs()
    }
}

/// Per (ticker, currency) equity positions and per contract option legs of one account.
///
/// `apply` validates a movement completely before mutating anything, so a
/// rejected movement leaves the ledger exactly as it was.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionLedger {
    account_id: String,
    positions: BTreeMap<String, Position>,
    option_legs: BTreeMap<String, OptionLeg>,
    /// Premium of assigned or exercised contracts waiting to be folded into
    /// the next share trade of the underlying, keyed by position key.
    pending_basis_adjustments: BTreeMap<String, Decimal>,
}

impl PositionLedger {
    pub fn new(account_id: &str) -> Self {
        PositionLedger {
            account_id: account_id.to_string(),
            ..Default::default()
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn apply(&mut self, movement: &Movement) -> Result<PositionDelta> {
        let mut delta = match &movement.kind {
            MovementKind::Trade { side: TradeSide::Buy } => self.apply_buy(movement)?,
            MovementKind::Trade { side: TradeSide::Sell } => self.apply_sell(movement)?,
            MovementKind::OptionTrade { contract, action } => {
                self.apply_option(movement, contract, *action)?
            }
            MovementKind::Dividend { .. }
            | MovementKind::Deposit
            | MovementKind::Withdrawal
            | MovementKind::Conversion { .. }
            | MovementKind::FeeOnly
            | MovementKind::Interest => PositionDelta::without_leg(movement),
        };
        if let Some(ticker) = &movement.ticker {
            delta.pending_adjustment = self.pending_basis_adjustment(ticker, &movement.currency);
        }
        Ok(delta)
    }

    fn reject(&self, movement: &Movement, reason: InvalidMovementReason) -> crate::errors::Error {
        InvalidMovementError {
            account_id: self.account_id.clone(),
            sequence: movement.sequence,
            kind: movement.kind_label().to_string(),
            reason,
        }
        .into()
    }

    fn apply_buy(&mut self, movement: &Movement) -> Result<PositionDelta> {
        let ticker = movement.ticker_str();
        let key = position_key(ticker, &movement.currency);
        let adjustment = self
            .pending_basis_adjustments
            .remove(&key)
            .unwrap_or(Decimal::ZERO);

        let position = self
            .positions
            .entry(key.clone())
            .or_insert_with(|| Position::new(ticker, &movement.currency, movement.timestamp));
        let quantity_before = position.quantity;

        // A premium credit from an assigned put lowers the cost, a debit raises it.
        let cost = movement.quantity * movement.price + movement.commission + movement.fee
            - adjustment;
        let added = position.add_shares(movement.quantity, cost, movement.timestamp);

        Ok(PositionDelta {
            leg_id: Some(key),
            leg_kind: Some(LegKind::Equity),
            quantity_before,
            quantity_after: position.quantity,
            cost_basis_change: added,
            opening_notional: movement.quantity * movement.price,
            ..PositionDelta::without_leg(movement)
        })
    }

    fn apply_sell(&mut self, movement: &Movement) -> Result<PositionDelta> {
        let ticker = movement.ticker_str();
        let key = position_key(ticker, &movement.currency);
        let available = self
            .positions
            .get(&key)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO);

        if available.is_zero() || movement.quantity > available {
            warn!(
                "Sell of {} {} exceeds tracked quantity {} in account {}",
                movement.quantity, ticker, available, self.account_id
            );
            return Err(self.reject(
                movement,
                InvalidMovementReason::Oversell {
                    leg: key,
                    requested: movement.quantity,
                    available,
                },
            ));
        }

        let Some(position) = self.positions.get_mut(&key) else {
            return Err(self.reject(
                movement,
                InvalidMovementReason::Malformed(format!("position {} vanished", key)),
            ));
        };
        let adjustment = self
            .pending_basis_adjustments
            .remove(&key)
            .unwrap_or(Decimal::ZERO);

        let quantity_before = position.quantity;
        let released = position.remove_shares(movement.quantity, movement.timestamp);
        let proceeds = movement.quantity * movement.price - movement.commission - movement.fee;
        let realized = proceeds - released + adjustment;
        let quantity_after = position.quantity;

        if !position.is_open() {
            debug!("Position {} closed in account {}", key, self.account_id);
            self.positions.remove(&key);
        }

        Ok(PositionDelta {
            leg_id: Some(key),
            leg_kind: Some(LegKind::Equity),
            quantity_before,
            quantity_after,
            realized,
            cost_basis_change: -released,
            ..PositionDelta::without_leg(movement)
        })
    }

    fn apply_option(
        &mut self,
        movement: &Movement,
        contract: &OptionContract,
        action: OptionAction,
    ) -> Result<PositionDelta> {
        let ticker = movement.ticker_str();
        let symbol = contract.symbol(ticker);
        let key = option_leg_key(&symbol, &movement.currency);
        let open_quantity = self
            .option_legs
            .get(&key)
            .map(|leg| leg.quantity)
            .unwrap_or(Decimal::ZERO);
        let net_cash = movement.amount - movement.commission - movement.fee;

        // Validate against the current leg before touching it.
        if action.is_opening() {
            let direction = action.signed_direction().unwrap_or(Decimal::ONE);
            if !open_quantity.is_zero() && open_quantity.is_sign_positive() != direction.is_sign_positive() {
                return Err(self.reject(
                    movement,
                    InvalidMovementReason::Malformed(format!(
                        "{:?} against an open position of {} contracts on {}",
                        action, open_quantity, symbol
                    )),
                ));
            }
        } else {
            let available = match action {
                OptionAction::BuyToClose if open_quantity.is_sign_negative() => open_quantity.abs(),
                OptionAction::SellToClose if open_quantity.is_sign_positive() => open_quantity,
                OptionAction::Expired | OptionAction::Assigned | OptionAction::Exercised => {
                    open_quantity.abs()
                }
                _ => Decimal::ZERO,
            };
            if available.is_zero() || movement.quantity > available {
                warn!(
                    "{:?} of {} contracts on {} exceeds tracked {} in account {}",
                    action, movement.quantity, symbol, available, self.account_id
                );
                return Err(self.reject(
                    movement,
                    InvalidMovementReason::Oversell {
                        leg: symbol,
                        requested: movement.quantity,
                        available,
                    },
                ));
            }
        }

        let leg = self
            .option_legs
            .entry(key.clone())
            .or_insert_with(|| OptionLeg::new(ticker, &movement.currency, contract, movement.timestamp));
        let quantity_before = leg.quantity;
        let mut realized = Decimal::ZERO;
        let mut opening_notional = Decimal::ZERO;
        let mut folded = None;

        match action {
            OptionAction::BuyToOpen | OptionAction::SellToOpen => {
                let direction = action.signed_direction().unwrap_or(Decimal::ONE);
                if !leg.is_open() {
                    leg.opened_at = movement.timestamp;
                }
                leg.quantity += direction * movement.quantity;
                leg.open_premium += net_cash;
                leg.last_updated = movement.timestamp;
                opening_notional =
                    movement.quantity * contract.multiplier * movement.price;
            }
            OptionAction::BuyToClose | OptionAction::SellToClose | OptionAction::Expired => {
                let portion = leg.close_contracts(movement.quantity, movement.timestamp);
                realized = portion + net_cash;
            }
            OptionAction::Assigned | OptionAction::Exercised => {
                let portion = leg.close_contracts(movement.quantity, movement.timestamp);
                folded = Some(portion);
                realized = net_cash;
            }
        }

        let quantity_after = leg.quantity;
        if !leg.is_open() {
            self.option_legs.remove(&key);
        }

        if let Some(portion) = folded {
            let underlying_key = position_key(ticker, &movement.currency);
            debug!(
                "Folding {} of option premium from {} into {}",
                portion, symbol, underlying_key
            );
            *self
                .pending_basis_adjustments
                .entry(underlying_key)
                .or_insert(Decimal::ZERO) += portion;
        }

        Ok(PositionDelta {
            leg_id: Some(key),
            leg_kind: Some(LegKind::Option),
            quantity_before,
            quantity_after,
            realized,
            opening_notional,
            ..PositionDelta::without_leg(movement)
        })
    }

    pub fn position(&self, ticker: &str, currency: &str) -> Option<&Position> {
        self.positions.get(&position_key(ticker, currency))
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn option_legs(&self) -> impl Iterator<Item = &OptionLeg> {
        self.option_legs.values()
    }

    pub fn option_legs_for<'a>(
        &'a self,
        ticker: &'a str,
        currency: &'a str,
    ) -> impl Iterator<Item = &'a OptionLeg> + 'a {
        self.option_legs
            .values()
            .filter(move |leg| leg.ticker == ticker && leg.currency == currency)
    }

    pub fn pending_basis_adjustment(&self, ticker: &str, currency: &str) -> Decimal {
        self.pending_basis_adjustments
            .get(&position_key(ticker, currency))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Cost basis of open share positions in `currency`.
    pub fn invested(&self, currency: &str) -> Decimal {
        self.positions
            .values()
            .filter(|p| p.currency == currency && p.is_open())
            .map(|p| p.total_cost_basis)
            .sum()
    }

    /// Any share position or option leg still open in `currency`.
    pub fn has_open_legs(&self, currency: &str) -> bool {
        self.positions
            .values()
            .any(|p| p.currency == currency && p.is_open())
            || self
                .option_legs
                .values()
                .any(|leg| leg.currency == currency && leg.is_open())
    }

    pub fn has_open_legs_for(&self, ticker: &str, currency: &str) -> bool {
        self.position(ticker, currency).is_some_and(|p| p.is_open())
            || self.option_legs_for(ticker, currency).any(|leg| leg.is_open())
    }

    /// (ticker, currency) pairs with at least one open leg.
    pub fn open_tickers(&self) -> Vec<(String, String)> {
        let mut tickers: Vec<(String, String)> = self
            .positions
            .values()
            .filter(|p| p.is_open())
            .map(|p| (p.ticker.clone(), p.currency.clone()))
            .chain(
                self.option_legs
                    .values()
                    .filter(|leg| leg.is_open())
                    .map(|leg| (leg.ticker.clone(), leg.currency.clone())),
            )
            .collect();
        tickers.sort();
        tickers.dedup();
        tickers
    }
}
