//! Fault Injection Engine
//!
//! Runs a configurable number of workers that concurrently pick a random
//! process and a random fault, validate the transition under the process's
//! lock and apply it. Terminations are additionally gated on the shared
//! termination budget, reserved before the signal is sent, so the number of
//! terminated processes never exceeds the budget whatever the interleaving.

use futures_util::future::join_all;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use shared::{process_debug, process_info, LogicalId};

use crate::config::{DelayBounds, FaultDistribution, InjectionConfig};
use crate::core::{AbortOnDrop, FaultKind, ProcessRegistry, SaturatingCounter, Transition};
use crate::error::{StressError, StressResult};

/// Statistics of a single worker's loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub worker: usize,
    /// Transitions applied
    pub successes: u64,
    /// Attempts skipped because the transition was not legal for the current state
    pub illegal_skips: u64,
    /// Terminations skipped because the budget was exhausted
    pub budget_denials: u64,
    pub iterations: u64,
}

/// Statistics of the whole injection phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionReport {
    pub seed: u64,
    pub workers: Vec<WorkerReport>,
}

impl InjectionReport {
    pub fn successes(&self) -> u64 {
        self.workers.iter().map(|w| w.successes).sum()
    }

    pub fn illegal_skips(&self) -> u64 {
        self.workers.iter().map(|w| w.illegal_skips).sum()
    }

    pub fn budget_denials(&self) -> u64 {
        self.workers.iter().map(|w| w.budget_denials).sum()
    }

    pub fn iterations(&self) -> u64 {
        self.workers.iter().map(|w| w.iterations).sum()
    }
}

/// Samples fault kinds according to an attempts distribution
#[derive(Debug, Clone)]
pub struct FaultSampler {
    index: WeightedIndex<f64>,
}

impl FaultSampler {
    pub fn new(distribution: &FaultDistribution) -> StressResult<Self> {
        let index = WeightedIndex::new(distribution.weights())
            .map_err(|e| StressError::distribution(e.to_string()))?;
        Ok(Self { index })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> FaultKind {
        FaultKind::ALL[self.index.sample(rng)]
    }
}

/// Drives randomized pause/resume/kill events against the process pool
pub struct FaultInjector {
    registry: Arc<ProcessRegistry>,
    budget: Arc<SaturatingCounter>,
    config: InjectionConfig,
    sampler: FaultSampler,
}

impl FaultInjector {
    pub fn new(
        registry: Arc<ProcessRegistry>,
        budget: Arc<SaturatingCounter>,
        config: InjectionConfig,
    ) -> StressResult<Self> {
        config.validate()?;
        let sampler = FaultSampler::new(&config.distribution)?;

        Ok(Self {
            registry,
            budget,
            config,
            sampler,
        })
    }

    /// Run every worker to completion and collect their statistics.
    ///
    /// Worker `i` draws from a random source seeded with `seed + i`. A failing
    /// worker does not stop the others; the first failure is returned once all
    /// have been joined.
    pub async fn run(&self, seed: u64) -> StressResult<InjectionReport> {
        let mut guard = AbortOnDrop::default();
        let handles: Vec<_> = (0..self.config.concurrency)
            .map(|index| {
                let worker = Worker {
                    index,
                    registry: Arc::clone(&self.registry),
                    budget: Arc::clone(&self.budget),
                    attempts: self.config.attempts,
                    max_iterations: self.config.max_iterations,
                    delay: self.config.delay,
                    sampler: self.sampler.clone(),
                    rng: StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
                };
                let handle = tokio::spawn(worker.run());
                guard.track(&handle);
                handle
            })
            .collect();

        let mut workers = Vec::with_capacity(handles.len());
        let mut first_error = None;

        for (index, result) in join_all(handles).await.into_iter().enumerate() {
            match result {
                Ok(Ok(report)) => workers.push(report),
                Ok(Err(e)) => {
                    tracing::error!(worker = index, "❌ Fault injection worker failed: {}", e);
                    first_error.get_or_insert(e);
                }
                Err(join_error) => {
                    tracing::error!(worker = index, "❌ Fault injection worker panicked: {}", join_error);
                    first_error.get_or_insert(StressError::WorkerFailed {
                        worker: index,
                        reason: join_error.to_string(),
                    });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(InjectionReport { seed, workers }),
        }
    }
}

struct Worker {
    index: usize,
    registry: Arc<ProcessRegistry>,
    budget: Arc<SaturatingCounter>,
    attempts: u64,
    max_iterations: Option<u64>,
    delay: DelayBounds,
    sampler: FaultSampler,
    rng: StdRng,
}

impl Worker {
    async fn run(mut self) -> StressResult<WorkerReport> {
        let mut report = WorkerReport {
            worker: self.index,
            ..WorkerReport::default()
        };

        let registry = Arc::clone(&self.registry);
        if registry.is_empty() {
            return Ok(report);
        }

        while report.successes < self.attempts {
            if self.max_iterations.is_some_and(|cap| report.iterations >= cap) {
                tracing::debug!(worker = self.index, "Iteration cap reached after {} successes", report.successes);
                break;
            }
            report.iterations += 1;

            let logical_id = self.pick_process();
            let kind = self.sampler.sample(&mut self.rng);
            let target = kind.target();

            let record = registry.get(logical_id)?;
            let mut slot = record.lock().await;

            if !slot.state().can_transition_to(target) {
                report.illegal_skips += 1;
                continue;
            }

            if kind == FaultKind::Terminate {
                if !self.budget.reserve() {
                    report.budget_denials += 1;
                    continue;
                }
                process_debug!(
                    logical_id,
                    "Termination reserved ({} of {})",
                    self.budget.granted(),
                    self.budget.limit()
                );
            }

            // Lock stays held: faults against this one process are serialized
            sleep(self.pick_delay()).await;

            match slot.transition(target)? {
                Transition::Applied { signal, .. } => {
                    report.successes += 1;
                    process_info!(logical_id, signal = %signal, "Sending {} to process {}", signal, logical_id);
                }
                Transition::NotApplied { current, requested } => {
                    // Unreachable while the lock is held across the check
                    process_debug!(logical_id, "Skipped {} -> {}", current, requested);
                }
            }
        }

        Ok(report)
    }

    fn pick_process(&mut self) -> LogicalId {
        let ids = self.registry.ids();
        ids[self.rng.gen_range(0..ids.len())]
    }

    fn pick_delay(&mut self) -> Duration {
        let min = self.delay.min.as_millis() as u64;
        let max = self.delay.max.as_millis() as u64;
        Duration::from_millis(self.rng.gen_range(min..=max))
    }
}
