use futures::future::join_all;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::{
    AccountRunReport, AccountRunStatus, AccountState, CancellationFlag,
    CheckpointRepositoryTrait, FlushOutcome, ProcessingCheckpoint, ProcessingWarning,
};
use crate::errors::{Error, Result};
use crate::events::{ProcessingEvent, ProcessingEventSink};
use crate::movements::MovementRepositoryTrait;
use crate::portfolio::operations::{AutoImportOperation, OperationRepositoryTrait};
use crate::portfolio::snapshot::{BrokerFinancialSnapshot, SnapshotRepositoryTrait};
use crate::portfolio::ticker_snapshot::TickerCurrencySnapshot;
use crate::quotes::PriceProviderTrait;
use crate::settings::EngineSettings;

/// Running totals of one account run, kept outside the fallible part so a
/// failed or cancelled run still reports how far it got.
#[derive(Default)]
struct RunProgress {
    processed_count: u64,
    last_sequence: Option<u64>,
    warnings: Vec<ProcessingWarning>,
}

/// Drives the account fold over stored movements in bounded chunks.
#[derive(Clone)]
pub struct ProcessingService {
    movement_repository: Arc<dyn MovementRepositoryTrait>,
    snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
    operation_repository: Arc<dyn OperationRepositoryTrait>,
    checkpoint_repository: Arc<dyn CheckpointRepositoryTrait>,
    price_provider: Arc<dyn PriceProviderTrait>,
    event_sink: Arc<dyn ProcessingEventSink>,
    settings: EngineSettings,
}

impl ProcessingService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        movement_repository: Arc<dyn MovementRepositoryTrait>,
        snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
        operation_repository: Arc<dyn OperationRepositoryTrait>,
        checkpoint_repository: Arc<dyn CheckpointRepositoryTrait>,
        price_provider: Arc<dyn PriceProviderTrait>,
        event_sink: Arc<dyn ProcessingEventSink>,
        settings: EngineSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            movement_repository,
            snapshot_repository,
            operation_repository,
            checkpoint_repository,
            price_provider,
            event_sink,
            settings,
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Processes new movements of each account, resuming from checkpoints.
    /// Reports come back in the order of `account_ids`.
    pub async fn process_accounts(
        &self,
        account_ids: &[String],
        cancel: CancellationFlag,
    ) -> Vec<AccountRunReport> {
        self.run_accounts(account_ids, false, cancel).await
    }

    /// Discards checkpoints and rebuilds every account from its first movement.
    pub async fn recalculate_accounts(
        &self,
        account_ids: &[String],
        cancel: CancellationFlag,
    ) -> Vec<AccountRunReport> {
        self.run_accounts(account_ids, true, cancel).await
    }

    async fn run_accounts(
        &self,
        account_ids: &[String],
        recalculate_all: bool,
        cancel: CancellationFlag,
    ) -> Vec<AccountRunReport> {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_accounts));
        info!(
            "Processing {} accounts, at most {} at a time",
            account_ids.len(),
            self.settings.max_concurrent_accounts
        );

        let handles: Vec<_> = account_ids
            .iter()
            .map(|account_id| {
                let service = self.clone();
                let semaphore = Arc::clone(&semaphore);
                let cancel = cancel.clone();
                let account_id = account_id.clone();
                tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            return service.failed_report(
                                &account_id,
                                RunProgress::default(),
                                Error::Unexpected(format!("Worker pool closed: {}", e)),
                            );
                        }
                    };
                    service
                        .process_account(&account_id, recalculate_all, cancel)
                        .await
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(account_ids)
            .map(|(joined, account_id)| match joined {
                Ok(report) => report,
                Err(e) => self.failed_report(account_id, RunProgress::default(), e.into()),
            })
            .collect()
    }

    /// Runs one account to the end of its stored movements.
    pub async fn process_account(
        &self,
        account_id: &str,
        recalculate_all: bool,
        cancel: CancellationFlag,
    ) -> AccountRunReport {
        let mut progress = RunProgress::default();
        match self
            .run_account(account_id, recalculate_all, &cancel, &mut progress)
            .await
        {
            Ok(()) => {
                info!(
                    "Account {} processed: {} movements, last sequence {:?}",
                    account_id, progress.processed_count, progress.last_sequence
                );
                self.event_sink.emit(ProcessingEvent::AccountCompleted {
                    account_id: account_id.to_string(),
                    processed_count: progress.processed_count,
                });
                AccountRunReport {
                    account_id: account_id.to_string(),
                    status: AccountRunStatus::Completed,
                    processed_count: progress.processed_count,
                    last_sequence: progress.last_sequence,
                    warnings: progress.warnings,
                    error: None,
                }
            }
            Err(e) if e.is_cancellation() => {
                info!(
                    "Account {} cancelled after {} movements",
                    account_id, progress.processed_count
                );
                self.event_sink.emit(ProcessingEvent::AccountCancelled {
                    account_id: account_id.to_string(),
                    processed_count: progress.processed_count,
                });
                AccountRunReport {
                    account_id: account_id.to_string(),
                    status: AccountRunStatus::Cancelled,
                    processed_count: progress.processed_count,
                    last_sequence: progress.last_sequence,
                    warnings: progress.warnings,
                    error: Some(e),
                }
            }
            Err(e) => self.failed_report(account_id, progress, e),
        }
    }

    fn failed_report(&self, account_id: &str, progress: RunProgress, err: Error) -> AccountRunReport {
        error!("Processing failed for account {}: {}", account_id, err);
        self.event_sink.emit(ProcessingEvent::AccountFailed {
            account_id: account_id.to_string(),
            message: err.to_string(),
        });
        AccountRunReport {
            account_id: account_id.to_string(),
            status: AccountRunStatus::Failed,
            processed_count: progress.processed_count,
            last_sequence: progress.last_sequence,
            warnings: progress.warnings,
            error: Some(err),
        }
    }

    fn check_cancelled(&self, account_id: &str, cancel: &CancellationFlag) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::CancellationRequested {
                account_id: account_id.to_string(),
            });
        }
        Ok(())
    }

    async fn initial_state(
        &self,
        account_id: &str,
        recalculate_all: bool,
        progress: &mut RunProgress,
    ) -> Result<AccountState> {
        if recalculate_all {
            debug!("Dropping checkpoint of account {} for a full rebuild", account_id);
            self.checkpoint_repository
                .delete_checkpoint(account_id)
                .await?;
            return Ok(AccountState::new(account_id, &self.settings));
        }

        match self.checkpoint_repository.load_checkpoint(account_id).await? {
            Some(checkpoint) if checkpoint.account_id == account_id => {
                debug!(
                    "Resuming account {} after sequence {:?}",
                    account_id, checkpoint.last_sequence
                );
                progress.processed_count = checkpoint.processed_count;
                progress.last_sequence = checkpoint.last_sequence;
                Ok(checkpoint.state)
            }
            Some(checkpoint) => Err(Error::Repository(format!(
                "Checkpoint for account {} belongs to account {}",
                account_id, checkpoint.account_id
            ))),
            None => Ok(AccountState::new(account_id, &self.settings)),
        }
    }

    async fn run_account(
        &self,
        account_id: &str,
        recalculate_all: bool,
        cancel: &CancellationFlag,
        progress: &mut RunProgress,
    ) -> Result<()> {
        self.check_cancelled(account_id, cancel)?;

        let total_estimate = self.movement_repository.count_movements(account_id).await?;
        self.event_sink.emit(ProcessingEvent::AccountStarted {
            account_id: account_id.to_string(),
            total_estimate,
        });

        let mut state = self
            .initial_state(account_id, recalculate_all, progress)
            .await?;
        let prices = self.price_provider.as_ref();

        loop {
            self.check_cancelled(account_id, cancel)?;

            let movements = self
                .movement_repository
                .fetch_movements(account_id, state.last_sequence(), self.settings.chunk_size)
                .await?;
            if movements.is_empty() {
                break;
            }

            let outcome = state.apply_chunk(&movements, prices)?;
            self.persist(
                &outcome.broker_snapshots,
                &outcome.ticker_snapshots,
                &outcome.operations,
            )
            .await?;

            state = outcome.state;
            progress.processed_count += outcome.applied;
            progress.last_sequence = state.last_sequence();
            for warning in &outcome.warnings {
                warn!("Account {}: {}", account_id, warning);
            }
            progress.warnings.extend(outcome.warnings);

            self.checkpoint_repository
                .save_checkpoint(&ProcessingCheckpoint::new(&state, progress.processed_count))
                .await?;
            self.event_sink.emit(ProcessingEvent::ChunkProcessed {
                account_id: account_id.to_string(),
                processed_count: progress.processed_count,
                total_estimate,
            });
        }

        let FlushOutcome {
            broker_snapshots,
            ticker_snapshots,
        } = state.flush(prices);
        self.persist(&broker_snapshots, &ticker_snapshots, &[]).await
    }

    async fn persist(
        &self,
        broker_snapshots: &[BrokerFinancialSnapshot],
        ticker_snapshots: &[TickerCurrencySnapshot],
        operations: &[AutoImportOperation],
    ) -> Result<()> {
        if !broker_snapshots.is_empty() {
            self.snapshot_repository
                .save_broker_snapshots(broker_snapshots)
                .await?;
        }
        if !ticker_snapshots.is_empty() {
            self.snapshot_repository
                .save_ticker_snapshots(ticker_snapshots)
                .await?;
        }
        if !operations.is_empty() {
            self.operation_repository.save_operations(operations).await?;
        }
        Ok(())
    }
}
