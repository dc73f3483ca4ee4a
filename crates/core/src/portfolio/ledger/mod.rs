//! Position ledger - share positions and option legs per account.

mod position_ledger;
mod positions_model;

pub use position_ledger::*;
pub use positions_model::*;

#[cfg(test)]
mod position_ledger_tests;
