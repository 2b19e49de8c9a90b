//! JSON summary written at the end of a run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::drain::ExitReport;
use crate::error::StressResult;
use crate::injector::InjectionReport;

pub const SUMMARY_FILE: &str = "stress-summary.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub processes: usize,
    pub termination_limit: usize,
    /// Terminations granted during the injection phase
    pub injected_terminations: usize,
    pub injection: InjectionReport,
    pub exits: Vec<ExitReport>,
}

impl RunSummary {
    /// Write the summary as pretty JSON into `dir`
    pub async fn write_to(&self, dir: &Path) -> StressResult<PathBuf> {
        let path = dir.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }

    pub async fn read_from(path: &Path) -> StressResult<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&json)?)
    }
}
