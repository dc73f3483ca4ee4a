//! TradeLedger Core - movement aggregation engine.
//!
//! Turns the chronological movement stream of a brokerage account into daily
//! financial snapshots, per-ticker snapshots and consolidated operations.
//! It is storage-agnostic and defines traits that host applications implement
//! for movements, prices, snapshots, operations and checkpoints.

pub mod constants;
pub mod errors;
pub mod events;
pub mod movements;
pub mod portfolio;
pub mod processing;
pub mod quotes;
pub mod settings;
pub mod utils;

// Re-export common types from movement and portfolio modules
pub use movements::*;
pub use portfolio::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
