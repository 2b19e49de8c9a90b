//! Real process launcher implementation
//!
//! Resolves the executable next to the implementation's `run.sh` and spawns
//! it once per logical id, redirecting stdout and stderr to per-process files.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs::File;
use tokio::process::Command;

use shared::{process_debug, ArtifactPaths, LogicalId};

use crate::error::{StressError, StressResult};
use crate::services::child::ChildProcess;
use crate::traits::{LaunchPlan, LaunchedProcess, ProcessLauncher};

/// File name every implementation's runscript must have
pub const RUNSCRIPT_NAME: &str = "run.sh";

/// Built artifact of the implementation under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executable {
    /// `bin/da_proc`, run directly
    Native(PathBuf),
    /// `bin/da_proc.jar`, run through `java -jar`
    Jar(PathBuf),
}

impl Executable {
    /// Look for a built binary in the `bin/` directory next to the runscript
    pub fn discover(base_dir: &Path) -> Option<Self> {
        let native = base_dir.join("bin").join("da_proc");
        let jar = base_dir.join("bin").join("da_proc.jar");

        if native.exists() {
            Some(Executable::Native(native))
        } else if jar.exists() {
            Some(Executable::Jar(jar))
        } else {
            None
        }
    }

    fn command(&self) -> Command {
        match self {
            Executable::Native(path) => Command::new(path),
            Executable::Jar(path) => {
                let mut cmd = Command::new("java");
                cmd.arg("-jar").arg(path);
                cmd
            }
        }
    }
}

/// Spawns the implementation under test found through its runscript
#[derive(Debug, Clone)]
pub struct RealLauncher {
    runscript: PathBuf,
    executable: Executable,
}

impl RealLauncher {
    /// Validate the runscript and locate the executable. Fails before anything is spawned.
    pub fn from_runscript(runscript: impl AsRef<Path>) -> StressResult<Self> {
        let runscript = std::path::absolute(runscript.as_ref())?;

        if !runscript.is_file() {
            return Err(StressError::RunscriptMissing { path: runscript });
        }
        if runscript.file_name().and_then(|name| name.to_str()) != Some(RUNSCRIPT_NAME) {
            return Err(StressError::NotARunscript { path: runscript });
        }

        let base_dir = runscript.parent().unwrap_or_else(|| Path::new("/"));
        let executable = Executable::discover(base_dir)
            .ok_or_else(|| StressError::BinaryNotFound { runscript: runscript.clone() })?;

        Ok(Self {
            runscript,
            executable,
        })
    }

    pub fn runscript(&self) -> &Path {
        &self.runscript
    }

    pub fn executable(&self) -> &Executable {
        &self.executable
    }

    /// Spawn a single process under test
    async fn spawn_one(
        &self,
        logical_id: LogicalId,
        hosts_file: &Path,
        config_file: &Path,
        output_dir: &Path,
    ) -> StressResult<ChildProcess> {
        let artifacts = ArtifactPaths::for_process(output_dir, logical_id);
        let stdout = File::create(&artifacts.stdout).await?.into_std().await;
        let stderr = File::create(&artifacts.stderr).await?.into_std().await;

        let mut cmd = self.executable.command();
        cmd.arg("--id")
            .arg(logical_id.to_string())
            .arg("--hosts")
            .arg(hosts_file)
            .arg("--output")
            .arg(&artifacts.output)
            .arg(config_file)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|source| StressError::SpawnFailed { logical_id, source })?;

        process_debug!(logical_id, "🚀 Spawned process {} (PID: {:?})", logical_id, child.id());
        Ok(ChildProcess::new(logical_id, child))
    }
}

#[async_trait]
impl ProcessLauncher for RealLauncher {
    async fn launch(&self, plan: &LaunchPlan) -> StressResult<Vec<LaunchedProcess>> {
        let output_dir = std::path::absolute(&plan.output_dir)?;
        if !output_dir.is_dir() {
            return Err(StressError::OutputDirMissing { path: output_dir });
        }
        if plan.config_files.is_empty() {
            return Err(StressError::config("config_files", "at least one config file is required"));
        }

        let hosts_file = std::path::absolute(&plan.hosts_file)?;
        let config_files = plan
            .config_files
            .iter()
            .map(std::path::absolute)
            .collect::<Result<Vec<_>, _>>()?;

        let mut processes = Vec::with_capacity(plan.process_count as usize);
        for (logical_id, config_file) in LogicalId::range(plan.process_count).zip(config_files.iter().cycle()) {
            let child = self
                .spawn_one(logical_id, &hosts_file, config_file, &output_dir)
                .await?;
            processes.push(LaunchedProcess {
                logical_id,
                handle: Box::new(child),
            });
        }

        Ok(processes)
    }
}
