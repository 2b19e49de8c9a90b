//! Core types shared by every harness-side tool

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{SharedError, SharedResult};

/// First port of the range handed out in the hosts file; process `i` listens on `BASE + i`
pub const PROCESSES_BASE_PORT: u16 = 11000;

/// Stable identity of a process under test, as seen by the algorithm and its logs.
///
/// Logical ids are 1-based and unique within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct LogicalId(u32);

impl LogicalId {
    pub fn new(id: u32) -> SharedResult<Self> {
        if id == 0 {
            return Err(SharedError::InvalidLogicalId { input: id.to_string() });
        }
        Ok(Self(id))
    }

    /// All ids of a run with `count` processes, in order
    pub fn range(count: u32) -> impl Iterator<Item = LogicalId> {
        (1..=count).map(LogicalId)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Per-process artifact name, e.g. `proc07.stdout`
    pub fn artifact_name(self, extension: &str) -> String {
        format!("proc{:02}.{}", self.0, extension)
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LogicalId {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .trim()
            .parse::<u32>()
            .map_err(|_| SharedError::InvalidLogicalId { input: s.to_string() })?;
        Self::new(id)
    }
}

impl TryFrom<u32> for LogicalId {
    type Error = SharedError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogicalId> for u32 {
    fn from(id: LogicalId) -> Self {
        id.0
    }
}

/// One line of the hosts file: `<id> <host> <port>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    pub id: LogicalId,
    pub host: String,
    pub port: u16,
}

impl HostEntry {
    /// Entry for a process running on this machine at its conventional port
    pub fn localhost(id: LogicalId) -> SharedResult<Self> {
        let port = u16::try_from(id.get())
            .ok()
            .and_then(|offset| PROCESSES_BASE_PORT.checked_add(offset))
            .ok_or_else(|| SharedError::InvalidHostEntry {
                line: format!("no port left for process {id}"),
            })?;

        Ok(Self {
            id,
            host: "localhost".to_string(),
            port,
        })
    }
}

impl fmt::Display for HostEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.id, self.host, self.port)
    }
}

impl FromStr for HostEntry {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SharedError::InvalidHostEntry { line: s.to_string() };

        let mut parts = s.split_whitespace();
        let (Some(id), Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };

        Ok(Self {
            id: id.parse()?,
            host: host.to_string(),
            port: port.parse().map_err(|_| invalid())?,
        })
    }
}

/// Files a single process under test reads from or writes to inside the logs directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub output: PathBuf,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

impl ArtifactPaths {
    pub fn for_process(dir: &Path, id: LogicalId) -> Self {
        Self {
            output: dir.join(id.artifact_name("output")),
            stdout: dir.join(id.artifact_name("stdout")),
            stderr: dir.join(id.artifact_name("stderr")),
        }
    }
}
