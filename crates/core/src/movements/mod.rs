//! Movements module - event models and the store trait.

mod movements_model;
mod movements_traits;

#[cfg(test)]
pub(crate) mod movements_fixtures;


pub use movements_model::{
    Movement, MovementKind, OptionAction, OptionContract, OptionType, TradeSide,
};
pub use movements_traits::MovementRepositoryTrait;
