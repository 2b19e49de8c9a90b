//! Run sequencing
//!
//! Launch → fault injection → drain → survivor termination → reap. Whatever
//! the outcome, including an interrupt of the harness, every spawned process
//! is killed before the run returns.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use shared::{logging, process_info};

use crate::config::{DrainPolicy, InjectionConfig};
use crate::core::{ProcessRegistry, SaturatingCounter};
use crate::drain::{Drain, ExitReport};
use crate::error::{StressError, StressResult};
use crate::injector::{FaultInjector, InjectionReport};
use crate::summary::RunSummary;
use crate::traits::{LaunchPlan, ProcessLauncher};

/// Drives one stress run against processes started by `L`
pub struct StressRunner<L: ProcessLauncher> {
    launcher: L,
    plan: LaunchPlan,
    injection: InjectionConfig,
    drain: DrainPolicy,
    seed: Option<u64>,
}

impl<L: ProcessLauncher> StressRunner<L> {
    pub fn new(launcher: L, plan: LaunchPlan, injection: InjectionConfig, drain: DrainPolicy) -> Self {
        Self {
            launcher,
            plan,
            injection,
            drain,
            seed: None,
        }
    }

    /// Fix the seed of the fault-injection random source (fluent API)
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Run to completion, aborting on Ctrl-C or SIGTERM
    pub async fn run(&self) -> StressResult<RunSummary> {
        self.run_until(shutdown_signal()).await
    }

    /// Run to completion, aborting when `interrupt` resolves first
    pub async fn run_until<F>(&self, interrupt: F) -> StressResult<RunSummary>
    where
        F: std::future::Future<Output = ()>,
    {
        let started_at = Utc::now();
        let seed = self.seed.unwrap_or_else(rand::random);
        logging::log_progress("Seed", &seed.to_string());

        let processes = self.launcher.launch(&self.plan).await?;
        let registry = Arc::new(ProcessRegistry::new(processes)?);

        for record in registry.iter() {
            let pid = record.pid().map_or_else(|| "?".to_string(), |pid| pid.to_string());
            process_info!(
                record.logical_id(),
                "Process with logicalPID {} has PID {}",
                record.logical_id(),
                pid
            );
        }

        let outcome = tokio::select! {
            result = self.drive(Arc::clone(&registry), seed) => result,
            _ = interrupt => Err(StressError::Interrupted),
        };

        registry.kill_all().await;

        let (budget, injection, exits) = outcome?;
        let summary = RunSummary {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            processes: registry.len(),
            termination_limit: budget.limit(),
            injected_terminations: budget.granted(),
            injection,
            exits,
        };

        let path = summary.write_to(&self.plan.output_dir).await?;
        logging::log_progress("Run summary", &path.display().to_string());
        Ok(summary)
    }

    async fn drive(
        &self,
        registry: Arc<ProcessRegistry>,
        seed: u64,
    ) -> StressResult<(Arc<SaturatingCounter>, InjectionReport, Vec<ExitReport>)> {
        let budget = Arc::new(SaturatingCounter::for_processes(registry.len()));
        logging::log_progress(
            "Termination budget",
            &format!("{} of {} processes", budget.limit(), registry.len()),
        );

        let injector = FaultInjector::new(Arc::clone(&registry), Arc::clone(&budget), self.injection.clone())?;
        let injection = injector.run(seed).await?;
        logging::log_success(&format!(
            "Stress test done ({} faults injected, {} illegal, {} denied)",
            injection.successes(),
            injection.illegal_skips(),
            injection.budget_denials()
        ));

        let drain = Drain::new(Arc::clone(&registry));

        logging::log_progress("Drain", "Resuming stopped processes");
        drain.resume_stopped().await?;

        Drain::wait_for_completion(self.drain).await?;

        let survivors = drain.terminate_survivors().await?;
        if !survivors.is_empty() {
            logging::log_progress("Drain", &format!("Terminated {} surviving processes", survivors.len()));
        }

        let exits = drain.reap().await?;
        Ok((budget, injection, exits))
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                logging::log_error("Installing SIGTERM handler", &e);
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        logging::log_error("Installing Ctrl-C handler", &e);
        std::future::pending::<()>().await;
    }
}
