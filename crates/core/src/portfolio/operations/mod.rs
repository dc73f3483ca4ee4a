//! Operations - per-ticker consolidation of trading strategies.

mod operation_consolidator;
mod operation_model;
mod operation_traits;

pub use operation_consolidator::*;
pub use operation_model::*;
pub use operation_traits::*;
