//! Portfolio aggregation: positions, snapshots, valuation and operations.

pub mod ledger;
pub mod operations;
pub mod snapshot;
pub mod ticker_snapshot;
pub mod valuation;

pub use ledger::*;
pub use operations::*;
pub use snapshot::*;
pub use ticker_snapshot::*;
pub use valuation::*;
