//! Stress run configuration
//!
//! Provides the validated configuration of a run and a builder pattern for
//! constructing it, plus parsing of the `STOP:<f>,CONT:<f>,TERM:<f>`
//! attempts distribution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::core::FaultKind;
use crate::error::{StressError, StressResult};

/// Allowed deviation of the distribution weights from a sum of 1.0
pub const DISTRIBUTION_TOLERANCE: f64 = 0.001;

/// Largest value a lattice agreement proposal may contain
pub const MAX_PROPOSAL_VALUE: u32 = i32::MAX as u32;

/// Relative weights of the three fault kinds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultDistribution {
    pub stop: f64,
    pub cont: f64,
    pub term: f64,
}

impl FaultDistribution {
    pub fn new(stop: f64, cont: f64, term: f64) -> StressResult<Self> {
        let distribution = Self { stop, cont, term };
        distribution.validate()?;
        Ok(distribution)
    }

    pub fn weight(&self, kind: FaultKind) -> f64 {
        match kind {
            FaultKind::Stop => self.stop,
            FaultKind::Continue => self.cont,
            FaultKind::Terminate => self.term,
        }
    }

    /// Weights in [`FaultKind::ALL`] order
    pub fn weights(&self) -> [f64; 3] {
        FaultKind::ALL.map(|kind| self.weight(kind))
    }

    pub fn validate(&self) -> StressResult<()> {
        for kind in FaultKind::ALL {
            let weight = self.weight(kind);
            if !weight.is_finite() || weight < 0.0 {
                return Err(StressError::distribution(format!(
                    "{} weight must be a non-negative number, got {weight}",
                    kind.key()
                )));
            }
        }

        let sum: f64 = self.weights().iter().sum();
        if (sum - 1.0).abs() >= DISTRIBUTION_TOLERANCE {
            return Err(StressError::distribution(format!(
                "probabilities must sum to 1.0, got {sum}"
            )));
        }

        Ok(())
    }
}

impl Default for FaultDistribution {
    fn default() -> Self {
        Self {
            stop: 0.48,
            cont: 0.48,
            term: 0.04,
        }
    }
}

impl FromStr for FaultDistribution {
    type Err = StressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut weights: [Option<f64>; 3] = [None; 3];

        for pair in s.split(',') {
            let (key, value) = pair.split_once(':').ok_or_else(|| {
                StressError::distribution("must be in format 'STOP:0.48,CONT:0.48,TERM:0.04'")
            })?;

            let key = key.trim();
            let index = FaultKind::ALL
                .iter()
                .position(|kind| kind.key() == key)
                .ok_or_else(|| StressError::distribution(format!("unknown fault kind `{key}`")))?;

            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| StressError::distribution(format!("`{value}` is not a number")))?;

            if weights[index].replace(value).is_some() {
                return Err(StressError::distribution(format!("`{key}` given more than once")));
            }
        }

        let [Some(stop), Some(cont), Some(term)] = weights else {
            return Err(StressError::distribution("must include STOP, CONT, and TERM"));
        };

        Self::new(stop, cont, term)
    }
}

impl fmt::Display for FaultDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "STOP:{},CONT:{},TERM:{}", self.stop, self.cont, self.term)
    }
}

/// Bounds of the randomized delay before a fault is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayBounds {
    pub min: Duration,
    pub max: Duration,
}

impl DelayBounds {
    pub fn from_millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    pub fn none() -> Self {
        Self::from_millis(0, 0)
    }
}

impl Default for DelayBounds {
    fn default() -> Self {
        Self::from_millis(50, 500)
    }
}

/// Parameters of the fault-injection phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionConfig {
    /// Number of parallel workers
    pub concurrency: usize,
    /// Successful transitions each worker applies before it stops
    pub attempts: u64,
    pub distribution: FaultDistribution,
    pub delay: DelayBounds,
    /// Per-worker cap on loop iterations, successful or not. `None` spins until `attempts` is reached.
    pub max_iterations: Option<u64>,
}

impl InjectionConfig {
    pub fn validate(&self) -> StressResult<()> {
        if self.concurrency == 0 {
            return Err(StressError::config("concurrency", "must be at least 1"));
        }
        if self.delay.min > self.delay.max {
            return Err(StressError::config(
                "delay",
                format!("minimum {:?} exceeds maximum {:?}", self.delay.min, self.delay.max),
            ));
        }
        self.distribution.validate()
    }
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            attempts: 8,
            distribution: FaultDistribution::default(),
            delay: DelayBounds::default(),
            max_iterations: None,
        }
    }
}

/// What the harness waits for between resuming stopped processes and terminating survivors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrainPolicy {
    /// Block until the operator presses Enter
    AwaitOperator,
    /// Sleep for a fixed time
    Timeout(Duration),
}

impl DrainPolicy {
    pub fn from_timeout_secs(timeout: Option<u64>) -> Self {
        match timeout {
            Some(secs) => DrainPolicy::Timeout(Duration::from_secs(secs)),
            None => DrainPolicy::AwaitOperator,
        }
    }
}

/// Algorithm under test and its generation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Workload {
    PerfectLinks { messages: u32 },
    FifoBroadcast { messages: u32 },
    LatticeAgreement {
        proposals: u32,
        max_proposal_size: u32,
        distinct_values: u32,
    },
}

impl Workload {
    pub fn name(&self) -> &'static str {
        match self {
            Workload::PerfectLinks { .. } => "perfect links",
            Workload::FifoBroadcast { .. } => "fifo broadcast",
            Workload::LatticeAgreement { .. } => "lattice agreement",
        }
    }

    pub fn validate(&self) -> StressResult<()> {
        match *self {
            Workload::PerfectLinks { messages } | Workload::FifoBroadcast { messages } => {
                if messages == 0 {
                    return Err(StressError::config("messages", "must be at least 1"));
                }
            }
            Workload::LatticeAgreement {
                proposals,
                max_proposal_size,
                distinct_values,
            } => {
                if proposals == 0 || max_proposal_size == 0 || distinct_values == 0 {
                    return Err(StressError::config(
                        "proposals",
                        "proposal count, proposal size and distinct values must be at least 1",
                    ));
                }
                if max_proposal_size > distinct_values {
                    return Err(StressError::config(
                        "distinct_values",
                        "the distinct proposal values must be at least as many as the maximum values per proposal",
                    ));
                }
                if u64::from(distinct_values) > u64::from(MAX_PROPOSAL_VALUE) + 1 {
                    return Err(StressError::config("distinct_values", "cannot have that many distinct values"));
                }
            }
        }
        Ok(())
    }
}

/// Complete configuration of one stress run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressConfig {
    pub runscript: PathBuf,
    pub logs_dir: PathBuf,
    pub processes: u32,
    pub workload: Workload,
    pub injection: InjectionConfig,
    pub drain: DrainPolicy,
    /// Seed of the fault-injection random source; chosen at random when absent
    pub seed: Option<u64>,
}

impl StressConfig {
    pub fn builder() -> StressConfigBuilder {
        StressConfigBuilder::new()
    }

    /// Check everything that can be checked before a process is spawned
    pub fn validate(&self) -> StressResult<()> {
        if self.processes == 0 {
            return Err(StressError::config("processes", "must be at least 1"));
        }
        if !self.logs_dir.is_dir() {
            return Err(StressError::OutputDirMissing {
                path: self.logs_dir.clone(),
            });
        }
        self.workload.validate()?;
        self.injection.validate()
    }
}

pub struct StressConfigBuilder {
    config: StressConfig,
}

impl StressConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: StressConfig {
                runscript: PathBuf::from("run.sh"),
                logs_dir: PathBuf::from("."),
                processes: 1,
                workload: Workload::PerfectLinks { messages: 1 },
                injection: InjectionConfig::default(),
                drain: DrainPolicy::AwaitOperator,
                seed: None,
            },
        }
    }

    /// Set path to the runscript of the implementation under test
    pub fn runscript<P: Into<PathBuf>>(mut self, runscript: P) -> Self {
        self.config.runscript = runscript.into();
        self
    }

    /// Set directory receiving generated configs and process outputs
    pub fn logs_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.logs_dir = dir.into();
        self
    }

    pub fn processes(mut self, count: u32) -> Self {
        self.config.processes = count;
        self
    }

    pub fn workload(mut self, workload: Workload) -> Self {
        self.config.workload = workload;
        self
    }

    pub fn concurrency(mut self, workers: usize) -> Self {
        self.config.injection.concurrency = workers;
        self
    }

    pub fn attempts(mut self, attempts: u64) -> Self {
        self.config.injection.attempts = attempts;
        self
    }

    pub fn distribution(mut self, distribution: FaultDistribution) -> Self {
        self.config.injection.distribution = distribution;
        self
    }

    pub fn delay(mut self, delay: DelayBounds) -> Self {
        self.config.injection.delay = delay;
        self
    }

    pub fn max_iterations(mut self, cap: Option<u64>) -> Self {
        self.config.injection.max_iterations = cap;
        self
    }

    /// Seconds to wait before terminating survivors (`None` waits for the operator)
    pub fn timeout_secs(mut self, timeout: Option<u64>) -> Self {
        self.config.drain = DrainPolicy::from_timeout_secs(timeout);
        self
    }

    pub fn drain(mut self, policy: DrainPolicy) -> Self {
        self.config.drain = policy;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.config.seed = seed;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> StressResult<StressConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for StressConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
