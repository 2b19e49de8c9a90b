//! Stress harness for fault-tolerant distributed-algorithm implementations
//!
//! Launches N processes of an implementation under test, then concurrently
//! pauses, resumes and kills them at random while never killing more than a
//! minority of them. Afterwards it resumes whatever is paused, terminates the
//! survivors and reports every exit status.

pub mod config;
pub mod core;
pub mod drain;
pub mod error;
pub mod injector;
pub mod runner;
pub mod services;
pub mod summary;
pub mod traits;

// Re-export commonly used types
pub use config::{DelayBounds, DrainPolicy, FaultDistribution, InjectionConfig, StressConfig, Workload};
pub use core::{termination_limit, FaultKind, FaultSignal, ProcessRegistry, ProcessState, SaturatingCounter};
pub use drain::{Drain, ExitReport};
pub use error::{StressError, StressResult};
pub use injector::{FaultInjector, InjectionReport, WorkerReport};
pub use runner::StressRunner;
pub use summary::RunSummary;
pub use traits::{Delivery, ExitOutcome, LaunchPlan, LaunchedProcess, ProcessHandle, ProcessLauncher};
