//! Core fault-injection domain: lifecycle state machine, termination budget
//! and the per-process records shared between workers.

pub mod counter;
pub mod record;
pub mod state;
pub(crate) mod tasks;

pub use counter::{termination_limit, SaturatingCounter};
pub use record::{ProcessRecord, ProcessRegistry, RecordSlot};
pub use state::{FaultKind, FaultSignal, ProcessState, Transition};
pub(crate) use tasks::AbortOnDrop;
