//! Service implementations
//!
//! Real implementations of the harness seams: spawning the binary under
//! test, signalling its processes, and writing the workload artifacts it reads.

pub mod child;
pub mod generator;
pub mod launcher;

#[cfg(test)]
mod tests;

pub use child::ChildProcess;
pub use generator::{GeneratedWorkload, WorkloadGenerator};
pub use launcher::{Executable, RealLauncher};
