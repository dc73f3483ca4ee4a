//! Account snapshots - daily cumulative financial state per currency.

mod snapshot_builder;
mod snapshot_model;
mod snapshot_traits;

pub use snapshot_builder::*;
pub use snapshot_model::*;
pub use snapshot_traits::*;
