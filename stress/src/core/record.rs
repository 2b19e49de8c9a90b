//! Process records and the registry shared by all workers
//!
//! Every record owns the handle of one spawned process together with its
//! lifecycle state behind a single async mutex, so that checking legality,
//! delivering the signal and updating the state happen as one unit.

use std::collections::BTreeMap;
use tokio::sync::{Mutex, MutexGuard};

use shared::{process_debug, process_warn, LogicalId};

use crate::core::state::{FaultSignal, ProcessState, Transition};
use crate::error::{StressError, StressResult};
use crate::traits::{Delivery, ExitOutcome, LaunchedProcess, ProcessHandle};

/// State guarded by a record's lock
pub struct RecordSlot {
    logical_id: LogicalId,
    state: ProcessState,
    handle: Box<dyn ProcessHandle>,
}

impl RecordSlot {
    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn logical_id(&self) -> LogicalId {
        self.logical_id
    }

    /// Move to `target` if the transition table allows it, sending exactly one signal.
    ///
    /// An illegal request leaves the state untouched and sends nothing.
    pub fn transition(&mut self, target: ProcessState) -> StressResult<Transition> {
        let from = self.state;
        if !from.can_transition_to(target) {
            return Ok(Transition::NotApplied {
                current: from,
                requested: target,
            });
        }

        let signal = target.entry_signal();
        let delivery = self.handle.deliver(signal)?;
        if delivery == Delivery::AlreadyExited {
            process_debug!(self.logical_id, "{} not delivered, process already exited", signal);
        }

        self.state = target;
        Ok(Transition::Applied {
            from,
            to: target,
            signal,
            delivery,
        })
    }

    /// Terminate regardless of budget, resuming first when stopped.
    ///
    /// Returns the signals that were sent, empty if already terminated.
    pub fn force_terminate(&mut self) -> StressResult<Vec<FaultSignal>> {
        let mut sent = Vec::new();

        if self.state == ProcessState::Stopped {
            if let Transition::Applied { signal, .. } = self.transition(ProcessState::Running)? {
                sent.push(signal);
            }
        }
        if let Transition::Applied { signal, .. } = self.transition(ProcessState::Terminated)? {
            sent.push(signal);
        }

        Ok(sent)
    }

    pub async fn wait(&mut self) -> StressResult<ExitOutcome> {
        self.handle.wait().await
    }

    pub async fn kill(&mut self) -> StressResult<()> {
        self.handle.kill().await
    }
}

/// One spawned process under test
pub struct ProcessRecord {
    logical_id: LogicalId,
    pid: Option<u32>,
    slot: Mutex<RecordSlot>,
}

impl ProcessRecord {
    pub fn new(logical_id: LogicalId, handle: Box<dyn ProcessHandle>) -> Self {
        let pid = handle.pid();
        Self {
            logical_id,
            pid,
            slot: Mutex::new(RecordSlot {
                logical_id,
                state: ProcessState::Running,
                handle,
            }),
        }
    }

    pub fn logical_id(&self) -> LogicalId {
        self.logical_id
    }

    /// OS pid at launch time
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub async fn lock(&self) -> MutexGuard<'_, RecordSlot> {
        self.slot.lock().await
    }

    pub async fn state(&self) -> ProcessState {
        self.slot.lock().await.state
    }
}

impl std::fmt::Debug for ProcessRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRecord")
            .field("logical_id", &self.logical_id)
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// All records of a run keyed by logical id; built once at launch and never resized
pub struct ProcessRegistry {
    ids: Vec<LogicalId>,
    records: BTreeMap<LogicalId, ProcessRecord>,
}

impl ProcessRegistry {
    pub fn new(processes: Vec<LaunchedProcess>) -> StressResult<Self> {
        let mut records = BTreeMap::new();

        for LaunchedProcess { logical_id, handle } in processes {
            if records.contains_key(&logical_id) {
                return Err(StressError::config(
                    "processes",
                    format!("logical id {logical_id} launched twice"),
                ));
            }
            records.insert(logical_id, ProcessRecord::new(logical_id, handle));
        }

        Ok(Self {
            ids: records.keys().copied().collect(),
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Logical ids in ascending order
    pub fn ids(&self) -> &[LogicalId] {
        &self.ids
    }

    pub fn get(&self, logical_id: LogicalId) -> StressResult<&ProcessRecord> {
        self.records
            .get(&logical_id)
            .ok_or(StressError::UnknownProcess { logical_id })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.values()
    }

    /// Current state of every record, in id order
    pub async fn snapshot(&self) -> Vec<(LogicalId, ProcessState)> {
        let mut states = Vec::with_capacity(self.len());
        for record in self.iter() {
            states.push((record.logical_id(), record.state().await));
        }
        states
    }

    pub async fn count_in(&self, state: ProcessState) -> usize {
        self.snapshot().await.into_iter().filter(|(_, s)| *s == state).count()
    }

    /// Kill every spawned process, ignoring failures. Used on every exit path of a run.
    pub async fn kill_all(&self) {
        for record in self.iter() {
            if let Err(e) = record.lock().await.kill().await {
                process_warn!(record.logical_id(), "⚠️ Failed to kill process: {}", e);
            }
        }
    }
}
