//! Ticker/currency snapshots - per-holding running state by day.

mod ticker_snapshot_builder;
mod ticker_snapshot_model;

pub use ticker_snapshot_builder::*;
pub use ticker_snapshot_model::*;
