// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskwardenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown process '{process}' referenced in {context}")]
    UnknownProcess { process: String, context: String },

    #[error("Cyclic ordering constraints: {0}")]
    CyclicConstraint(String),

    #[error("Duplicate process name: {0}")]
    DuplicateProcess(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskwardenError>;
