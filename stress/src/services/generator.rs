//! Workload artifact generation
//!
//! Writes the hosts file and the config file(s) read by the implementation
//! under test. Lattice agreement proposals are drawn from a fixed seed so
//! that repeated runs stress the same input.

use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use std::fmt::Write as _;
use std::path::PathBuf;
use tokio::fs;

use shared::{HostEntry, LogicalId};

use crate::config::{Workload, MAX_PROPOSAL_VALUE};
use crate::error::StressResult;

/// Seed of the proposal generator
pub const PROPOSAL_SEED: u64 = 42;

/// Paths of the generated artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedWorkload {
    pub hosts_file: PathBuf,
    /// One shared file, or one file per process in logical id order
    pub config_files: Vec<PathBuf>,
}

pub struct WorkloadGenerator {
    dir: PathBuf,
    processes: u32,
}

impl WorkloadGenerator {
    pub fn new(dir: impl Into<PathBuf>, processes: u32) -> Self {
        Self {
            dir: dir.into(),
            processes,
        }
    }

    pub fn hosts_path(&self) -> PathBuf {
        self.dir.join("hosts")
    }

    /// Write every artifact the workload needs
    pub async fn generate(&self, workload: &Workload) -> StressResult<GeneratedWorkload> {
        workload.validate()?;
        let hosts_file = self.write_hosts().await?;

        let config_files = match *workload {
            Workload::PerfectLinks { messages } => {
                // Every process sends to process 1
                vec![self.write_shared_config(&format!("{messages} 1\n")).await?]
            }
            Workload::FifoBroadcast { messages } => vec![self.write_shared_config(&format!("{messages}\n")).await?],
            Workload::LatticeAgreement {
                proposals,
                max_proposal_size,
                distinct_values,
            } => {
                self.write_proposals(proposals, max_proposal_size, distinct_values)
                    .await?
            }
        };

        tracing::debug!("Generated {} config file(s) for {}", config_files.len(), workload.name());
        Ok(GeneratedWorkload {
            hosts_file,
            config_files,
        })
    }

    async fn write_hosts(&self) -> StressResult<PathBuf> {
        let mut contents = String::new();
        for id in LogicalId::range(self.processes) {
            let _ = writeln!(contents, "{}", HostEntry::localhost(id)?);
        }

        let path = self.hosts_path();
        fs::write(&path, contents).await?;
        Ok(path)
    }

    async fn write_shared_config(&self, contents: &str) -> StressResult<PathBuf> {
        let path = self.dir.join("config");
        fs::write(&path, contents).await?;
        Ok(path)
    }

    async fn write_proposals(
        &self,
        proposals: u32,
        max_proposal_size: u32,
        distinct_values: u32,
    ) -> StressResult<Vec<PathBuf>> {
        let mut rng = StdRng::seed_from_u64(PROPOSAL_SEED);
        let pool = value_pool(&mut rng, distinct_values);

        let mut paths = Vec::with_capacity(self.processes as usize);
        for id in LogicalId::range(self.processes) {
            let mut contents = format!("{proposals} {max_proposal_size} {distinct_values}\n");

            for _ in 0..proposals {
                let size = rng.gen_range(1..=max_proposal_size) as usize;
                let proposal: Vec<String> = pool
                    .choose_multiple(&mut rng, size)
                    .map(u32::to_string)
                    .collect();
                contents.push_str(&proposal.join(" "));
                contents.push('\n');
            }

            let path = self.dir.join(id.artifact_name("config"));
            fs::write(&path, contents).await?;
            paths.push(path);
        }

        Ok(paths)
    }
}

/// `count` distinct values from `[0, MAX_PROPOSAL_VALUE]`
fn value_pool(rng: &mut StdRng, count: u32) -> Vec<u32> {
    let range = MAX_PROPOSAL_VALUE as usize + 1;
    index::sample(rng, range, count as usize)
        .into_iter()
        .map(|value| value as u32)
        .collect()
}

/// Read back the proposals of an agreement config file; used by the tests
#[cfg(test)]
pub(crate) fn parse_proposals(contents: &str) -> (Vec<u32>, Vec<Vec<u32>>) {
    let mut lines = contents.lines();
    let header = lines
        .next()
        .map(|line| line.split_whitespace().map(|v| v.parse().unwrap()).collect())
        .unwrap_or_default();
    let proposals = lines
        .map(|line| line.split_whitespace().map(|v| v.parse().unwrap()).collect())
        .collect();
    (header, proposals)
}
