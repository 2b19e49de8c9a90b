//! Stress harness error types

use std::path::PathBuf;
use thiserror::Error;

use shared::{LogicalId, SharedError};

use crate::core::FaultSignal;

#[derive(Error, Debug)]
pub enum StressError {
    #[error("`{}` is not a file", path.display())]
    RunscriptMissing { path: PathBuf },

    #[error("`{}` is not a runscript", path.display())]
    NotARunscript { path: PathBuf },

    #[error("`{}` could not find a binary to execute. Make sure you build before validating", runscript.display())]
    BinaryNotFound { runscript: PathBuf },

    #[error("`{}` is not a directory", path.display())]
    OutputDirMissing { path: PathBuf },

    #[error("Invalid attempts distribution: {reason}")]
    InvalidDistribution { reason: String },

    #[error("Configuration error: {field}: {reason}")]
    ConfigurationError { field: String, reason: String },

    #[error("Failed to spawn process {logical_id}: {source}")]
    SpawnFailed {
        logical_id: LogicalId,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to deliver {signal} to process {logical_id}: {reason}")]
    SignalFailed {
        logical_id: LogicalId,
        signal: FaultSignal,
        reason: String,
    },

    #[error("Unknown process: {logical_id}")]
    UnknownProcess { logical_id: LogicalId },

    #[error("Fault injection worker {worker} failed: {reason}")]
    WorkerFailed { worker: usize, reason: String },

    #[error("Waiting for process {logical_id} failed: {reason}")]
    ReapFailed { logical_id: LogicalId, reason: String },

    #[error("Run interrupted")]
    Interrupted,

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl StressError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigurationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn distribution(reason: impl Into<String>) -> Self {
        Self::InvalidDistribution { reason: reason.into() }
    }

    /// Errors detected before any process is spawned
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::RunscriptMissing { .. }
                | Self::NotARunscript { .. }
                | Self::BinaryNotFound { .. }
                | Self::OutputDirMissing { .. }
                | Self::InvalidDistribution { .. }
                | Self::ConfigurationError { .. }
        )
    }

    /// Process exit status for a run that ended with this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Interrupted => 130,
            e if e.is_configuration() => 2,
            _ => 1,
        }
    }
}

pub type StressResult<T> = Result<T, StressError>;
