//! Chunked, resumable processing of account movement streams.

mod account_state;
mod cancellation;
mod processing_model;
mod processing_service;
mod processing_traits;

pub use account_state::AccountState;
pub use cancellation::CancellationFlag;
pub use processing_model::*;
pub use processing_service::ProcessingService;
pub use processing_traits::CheckpointRepositoryTrait;

#[cfg(test)]
mod account_state_tests;
