//! Lifecycle state machine of a process under test

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::traits::Delivery;

/// Lifecycle state of a process under test. `Terminated` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    Running,
    Stopped,
    Terminated,
}

impl ProcessState {
    /// Whether `target` is a legal successor of this state
    pub fn can_transition_to(self, target: ProcessState) -> bool {
        match self {
            ProcessState::Running => matches!(target, ProcessState::Stopped | ProcessState::Terminated),
            ProcessState::Stopped => target == ProcessState::Running,
            ProcessState::Terminated => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ProcessState::Terminated
    }

    /// Signal that moves a process into this state
    pub fn entry_signal(self) -> FaultSignal {
        match self {
            ProcessState::Running => FaultSignal::Continue,
            ProcessState::Stopped => FaultSignal::Stop,
            ProcessState::Terminated => FaultSignal::Terminate,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Running => write!(f, "running"),
            ProcessState::Stopped => write!(f, "stopped"),
            ProcessState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Kind of fault a worker may inject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    Stop,
    Continue,
    Terminate,
}

impl FaultKind {
    /// Order matches the weights of an attempts distribution
    pub const ALL: [FaultKind; 3] = [FaultKind::Stop, FaultKind::Continue, FaultKind::Terminate];

    pub fn target(self) -> ProcessState {
        match self {
            FaultKind::Stop => ProcessState::Stopped,
            FaultKind::Continue => ProcessState::Running,
            FaultKind::Terminate => ProcessState::Terminated,
        }
    }

    /// Key used in the `STOP:<f>,CONT:<f>,TERM:<f>` distribution format
    pub fn key(self) -> &'static str {
        match self {
            FaultKind::Stop => "STOP",
            FaultKind::Continue => "CONT",
            FaultKind::Terminate => "TERM",
        }
    }
}

/// OS-level lifecycle signal delivered to a process under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultSignal {
    Stop,
    Continue,
    Terminate,
}

impl FaultSignal {
    pub fn name(self) -> &'static str {
        match self {
            FaultSignal::Stop => "SIGSTOP",
            FaultSignal::Continue => "SIGCONT",
            FaultSignal::Terminate => "SIGTERM",
        }
    }

    #[cfg(unix)]
    pub fn as_nix(self) -> nix::sys::signal::Signal {
        use nix::sys::signal::Signal;

        match self {
            FaultSignal::Stop => Signal::SIGSTOP,
            FaultSignal::Continue => Signal::SIGCONT,
            FaultSignal::Terminate => Signal::SIGTERM,
        }
    }
}

impl fmt::Display for FaultSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of asking a record to move to a new state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Signal sent and state updated
    Applied {
        from: ProcessState,
        to: ProcessState,
        signal: FaultSignal,
        delivery: Delivery,
    },
    /// Not in the transition table; nothing was sent
    NotApplied {
        current: ProcessState,
        requested: ProcessState,
    },
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProcessState::*;

    #[test]
    fn test_transition_table() {
        let legal = [(Running, Stopped), (Running, Terminated), (Stopped, Running)];

        for from in [Running, Stopped, Terminated] {
            for to in [Running, Stopped, Terminated] {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_stopped_process_cannot_be_terminated_directly() {
        assert!(!Stopped.can_transition_to(Terminated));
        assert!(!Stopped.can_transition_to(Stopped));
    }

    #[test]
    fn test_entry_signals() {
        assert_eq!(Running.entry_signal(), FaultSignal::Continue);
        assert_eq!(Stopped.entry_signal(), FaultSignal::Stop);
        assert_eq!(Terminated.entry_signal(), FaultSignal::Terminate);
        assert_eq!(FaultSignal::Terminate.to_string(), "SIGTERM");
    }

    #[test]
    fn test_fault_kind_targets() {
        assert_eq!(FaultKind::Stop.target(), Stopped);
        assert_eq!(FaultKind::Continue.target(), Running);
        assert_eq!(FaultKind::Terminate.target(), Terminated);
        assert!(Terminated.is_terminal());
        assert!(!Stopped.is_terminal());
    }
}
