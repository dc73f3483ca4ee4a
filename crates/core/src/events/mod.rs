//! Processing events module.
//!
//! Event types and the sink trait the engine reports progress through. Hosts
//! implement the sink to forward events to their UI or job tracking.

mod processing_event;
mod sink;

pub use processing_event::*;
pub use sink::*;
