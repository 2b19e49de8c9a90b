//! Common test utilities and infrastructure
//!
//! A recording process handle that stands in for a real OS process, plus
//! helpers to build registries and check recorded signal histories.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shared::LogicalId;
use stress::{
    Delivery, ExitOutcome, FaultSignal, LaunchedProcess, ProcessHandle, ProcessRegistry, ProcessState, StressResult,
};

/// Signals delivered across all fake processes, in delivery order
#[derive(Clone, Default)]
pub struct SignalLog {
    events: Arc<Mutex<Vec<(LogicalId, FaultSignal)>>>,
    kills: Arc<Mutex<Vec<LogicalId>>>,
}

impl SignalLog {
    pub fn record_kill(&self, id: LogicalId) {
        self.kills.lock().unwrap().push(id);
    }

    /// Processes that were forcibly killed, in kill order
    pub fn kills(&self) -> Vec<LogicalId> {
        self.kills.lock().unwrap().clone()
    }

    pub fn record(&self, id: LogicalId, signal: FaultSignal) {
        self.events.lock().unwrap().push((id, signal));
    }

    pub fn events(&self) -> Vec<(LogicalId, FaultSignal)> {
        self.events.lock().unwrap().clone()
    }

    /// Signals grouped per process, each in delivery order
    pub fn per_process(&self) -> BTreeMap<LogicalId, Vec<FaultSignal>> {
        let mut grouped: BTreeMap<LogicalId, Vec<FaultSignal>> = BTreeMap::new();
        for (id, signal) in self.events() {
            grouped.entry(id).or_default().push(signal);
        }
        grouped
    }

    pub fn count(&self, signal: FaultSignal) -> usize {
        self.events().iter().filter(|(_, s)| *s == signal).count()
    }
}

/// Fake process that records every signal and exits once terminated or killed
pub struct RecordingHandle {
    id: LogicalId,
    log: SignalLog,
    terminated: bool,
    killed: bool,
}

impl RecordingHandle {
    pub fn new(id: LogicalId, log: SignalLog) -> Self {
        Self {
            id,
            log,
            terminated: false,
            killed: false,
        }
    }
}

#[async_trait]
impl ProcessHandle for RecordingHandle {
    fn pid(&self) -> Option<u32> {
        Some(10_000 + self.id.get())
    }

    fn deliver(&mut self, signal: FaultSignal) -> StressResult<Delivery> {
        // Recorded even when exited, so stray signals show up in the history
        self.log.record(self.id, signal);
        if self.terminated || self.killed {
            return Ok(Delivery::AlreadyExited);
        }
        if signal == FaultSignal::Terminate {
            self.terminated = true;
        }
        Ok(Delivery::Delivered)
    }

    async fn wait(&mut self) -> StressResult<ExitOutcome> {
        tokio::task::yield_now().await;
        if self.terminated {
            Ok(ExitOutcome::signaled(15))
        } else {
            Ok(ExitOutcome::code(0))
        }
    }

    async fn kill(&mut self) -> StressResult<()> {
        self.log.record_kill(self.id);
        self.killed = true;
        Ok(())
    }
}

pub fn id(n: u32) -> LogicalId {
    LogicalId::new(n).unwrap()
}

/// Recording handles for processes 1..=count
pub fn launched(count: u32, log: &SignalLog) -> Vec<LaunchedProcess> {
    LogicalId::range(count)
        .map(|logical_id| LaunchedProcess {
            logical_id,
            handle: Box::new(RecordingHandle::new(logical_id, log.clone())),
        })
        .collect()
}

pub fn registry(count: u32, log: &SignalLog) -> Arc<ProcessRegistry> {
    Arc::new(ProcessRegistry::new(launched(count, log)).unwrap())
}

/// Replay a process's signal history through the transition table, panicking on
/// the first illegal step. Returns the final state.
pub fn replay(history: &[FaultSignal]) -> ProcessState {
    let mut state = ProcessState::Running;
    for (step, signal) in history.iter().enumerate() {
        let target = match signal {
            FaultSignal::Stop => ProcessState::Stopped,
            FaultSignal::Continue => ProcessState::Running,
            FaultSignal::Terminate => ProcessState::Terminated,
        };
        assert!(
            state.can_transition_to(target),
            "illegal step {step}: {state} -> {target} in {history:?}"
        );
        state = target;
    }
    state
}
