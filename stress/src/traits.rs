//! Trait definitions with mockall annotations for testing
//!
//! The harness talks to the outside world through two seams: the launcher
//! that spawns the binary under test, and the handle to each spawned OS
//! process. Both are injected so the orchestrator can be exercised without
//! real child processes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use shared::LogicalId;

use crate::core::FaultSignal;
use crate::error::StressResult;

/// Result of delivering a signal to a process under test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The process had already exited; nothing was sent
    AlreadyExited,
}

/// How a process under test exited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitOutcome {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitOutcome {
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signaled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Exit code, or the negated signal number when killed by a signal
    pub fn return_code(&self) -> Option<i32> {
        self.code.or(self.signal.map(|signal| -signal))
    }
}

impl From<std::process::ExitStatus> for ExitOutcome {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.return_code() {
            Some(code) => write!(f, "{code}"),
            None => write!(f, "unknown status"),
        }
    }
}

/// Exclusive handle to one spawned OS process
#[mockall::automock]
#[async_trait::async_trait]
pub trait ProcessHandle: Send {
    /// OS pid, if the process has not been reaped yet
    fn pid(&self) -> Option<u32>;

    /// Deliver a lifecycle signal. An already-exited process is not an error.
    fn deliver(&mut self, signal: FaultSignal) -> StressResult<Delivery>;

    /// Wait for the process to exit
    async fn wait(&mut self) -> StressResult<ExitOutcome>;

    /// Forcibly kill the process without waiting for it
    async fn kill(&mut self) -> StressResult<()>;
}

/// Everything needed to start the processes of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub process_count: u32,
    pub hosts_file: PathBuf,
    /// Cycled round-robin over logical ids
    pub config_files: Vec<PathBuf>,
    pub output_dir: PathBuf,
}

/// A spawned process under test
pub struct LaunchedProcess {
    pub logical_id: LogicalId,
    pub handle: Box<dyn ProcessHandle>,
}

impl fmt::Debug for LaunchedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchedProcess")
            .field("logical_id", &self.logical_id)
            .field("pid", &self.handle.pid())
            .finish()
    }
}

/// Spawns the binary under test once per logical id
#[mockall::automock]
#[async_trait::async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Spawn every process of the plan, in logical id order
    async fn launch(&self, plan: &LaunchPlan) -> StressResult<Vec<LaunchedProcess>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_code_negates_signals() {
        assert_eq!(ExitOutcome::code(0).return_code(), Some(0));
        assert_eq!(ExitOutcome::signaled(15).return_code(), Some(-15));
        assert_eq!(ExitOutcome::signaled(9).to_string(), "-9");
        let unknown = ExitOutcome {
            code: None,
            signal: None,
        };
        assert_eq!(unknown.to_string(), "unknown status");
    }
}
