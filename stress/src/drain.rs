//! Drain and reap phase
//!
//! After the stress phase: resume paused processes, wait for the operator or
//! a timeout, terminate every survivor regardless of budget, then wait for
//! all exits concurrently.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

use shared::{process_error, process_info, LogicalId};

use crate::config::DrainPolicy;
use crate::core::{AbortOnDrop, ProcessRegistry, ProcessState, Transition};
use crate::error::{StressError, StressResult};
use crate::traits::ExitOutcome;

/// Final status of one process under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitReport {
    pub logical_id: LogicalId,
    pub outcome: ExitOutcome,
}

pub struct Drain {
    registry: Arc<ProcessRegistry>,
}

impl Drain {
    pub fn new(registry: Arc<ProcessRegistry>) -> Self {
        Self { registry }
    }

    /// Move every stopped process back to running. Returns the resumed ids.
    pub async fn resume_stopped(&self) -> StressResult<Vec<LogicalId>> {
        let mut resumed = Vec::new();

        for record in self.registry.iter() {
            let mut slot = record.lock().await;
            if slot.state() != ProcessState::Stopped {
                continue;
            }
            if let Transition::Applied { signal, .. } = slot.transition(ProcessState::Running)? {
                process_info!(record.logical_id(), "Sending {} to process {}", signal, record.logical_id());
                resumed.push(record.logical_id());
            }
        }

        Ok(resumed)
    }

    /// Block according to the policy; the operator variant reads a line from stdin
    pub async fn wait_for_completion(policy: DrainPolicy) -> StressResult<()> {
        match policy {
            DrainPolicy::Timeout(duration) => {
                tracing::info!("⏳ Waiting for {} seconds before terminating", duration.as_secs_f64());
                tokio::time::sleep(duration).await;
                Ok(())
            }
            DrainPolicy::AwaitOperator => {
                println!("Press `Enter` when all processes have finished processing messages.");
                Self::wait_for_operator(BufReader::new(tokio::io::stdin())).await
            }
        }
    }

    /// Wait for one line (or end of input) from the operator
    pub async fn wait_for_operator<R: AsyncBufRead + Unpin>(mut reader: R) -> StressResult<()> {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        Ok(())
    }

    /// Terminate every process that is not terminated yet, bypassing the budget.
    ///
    /// Stopped processes are resumed first. Returns the ids that were terminated here.
    pub async fn terminate_survivors(&self) -> StressResult<Vec<LogicalId>> {
        let mut terminated = Vec::new();

        for record in self.registry.iter() {
            let mut slot = record.lock().await;
            if slot.state().is_terminal() {
                continue;
            }
            for signal in slot.force_terminate()? {
                process_info!(record.logical_id(), "Sending {} to process {}", signal, record.logical_id());
            }
            terminated.push(record.logical_id());
        }

        Ok(terminated)
    }

    /// Wait concurrently for every process to exit. Reports are logged one at a time
    /// and returned in logical id order.
    pub async fn reap(&self) -> StressResult<Vec<ExitReport>> {
        let reports = Arc::new(Mutex::new(Vec::with_capacity(self.registry.len())));
        let mut guard = AbortOnDrop::default();

        let waiters: Vec<_> = self
            .registry
            .ids()
            .iter()
            .map(|&logical_id| {
                let registry = Arc::clone(&self.registry);
                let reports = Arc::clone(&reports);
                let handle = tokio::spawn(async move {
                    let outcome = match registry.get(logical_id)?.lock().await.wait().await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            process_error!(logical_id, "❌ Waiting for process {} failed: {}", logical_id, e);
                            return Err(e);
                        }
                    };

                    let mut reports = reports.lock().await;
                    process_info!(logical_id, "Process {} exited with {}", logical_id, outcome);
                    reports.push(ExitReport {
                        logical_id,
                        outcome,
                    });
                    Ok::<_, StressError>(())
                });
                guard.track(&handle);
                handle
            })
            .collect();

        for (waiter, logical_id) in futures_util::future::join_all(waiters)
            .await
            .into_iter()
            .zip(self.registry.ids())
        {
            waiter.map_err(|e| StressError::ReapFailed {
                logical_id: *logical_id,
                reason: e.to_string(),
            })??;
        }

        let mut reports = std::mem::take(&mut *reports.lock().await);
        reports.sort_by_key(|report| report.logical_id);
        Ok(reports)
    }
}
