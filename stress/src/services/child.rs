//! Handle to a real OS child process

use async_trait::async_trait;
use tokio::process::Child;

use shared::LogicalId;

use crate::core::FaultSignal;
use crate::error::{StressError, StressResult};
use crate::traits::{Delivery, ExitOutcome, ProcessHandle};

/// A spawned process under test, signalled through its OS pid
pub struct ChildProcess {
    logical_id: LogicalId,
    child: Child,
}

impl ChildProcess {
    pub fn new(logical_id: LogicalId, child: Child) -> Self {
        Self { logical_id, child }
    }

    /// Whether the process has exited (and has been reaped)
    fn has_exited(&mut self) -> StressResult<bool> {
        Ok(self.child.try_wait()?.is_some())
    }

    #[cfg(unix)]
    fn send(&self, pid: u32, signal: FaultSignal) -> StressResult<Delivery> {
        use nix::errno::Errno;
        use nix::sys::signal;
        use nix::unistd::Pid;

        let raw = i32::try_from(pid).map_err(|_| StressError::SignalFailed {
            logical_id: self.logical_id,
            signal,
            reason: format!("pid {pid} out of range"),
        })?;

        match signal::kill(Pid::from_raw(raw), signal.as_nix()) {
            Ok(()) => Ok(Delivery::Delivered),
            Err(Errno::ESRCH) => Ok(Delivery::AlreadyExited),
            Err(e) => Err(StressError::SignalFailed {
                logical_id: self.logical_id,
                signal,
                reason: e.to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    fn send(&mut self, _pid: u32, signal: FaultSignal) -> StressResult<Delivery> {
        match signal {
            FaultSignal::Terminate => {
                self.child.start_kill()?;
                Ok(Delivery::Delivered)
            }
            FaultSignal::Stop | FaultSignal::Continue => Err(StressError::SignalFailed {
                logical_id: self.logical_id,
                signal,
                reason: "pausing processes is only supported on unix".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ProcessHandle for ChildProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn deliver(&mut self, signal: FaultSignal) -> StressResult<Delivery> {
        if self.has_exited()? {
            return Ok(Delivery::AlreadyExited);
        }
        match self.child.id() {
            Some(pid) => self.send(pid, signal),
            None => Ok(Delivery::AlreadyExited),
        }
    }

    async fn wait(&mut self) -> StressResult<ExitOutcome> {
        let status = self.child.wait().await?;
        Ok(ExitOutcome::from(status))
    }

    async fn kill(&mut self) -> StressResult<()> {
        match self.child.start_kill() {
            Ok(()) => Ok(()),
            // Already exited and reaped
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
