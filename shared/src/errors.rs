//! Shared error types for the stress harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid logical process id: {input}")]
    InvalidLogicalId { input: String },

    #[error("Invalid hosts file entry: {line}")]
    InvalidHostEntry { line: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
