// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::product::BoundName;

#[derive(Error, Debug)]
pub enum BakeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The requested closure is not a DAG. `cycle` starts and ends with the
    /// repeated product.
    #[error("Cycle in product dependencies : {}", join_names(.cycle))]
    DependencyCycle { cycle: Vec<BoundName> },

    #[error("{0}")]
    MissingProducts(String),

    #[error("Bad glob: {0}")]
    InvalidGlob(String),

    #[error("Invalid product name: {0}")]
    InvalidName(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn join_names(names: &[BoundName]) -> String {
    names
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BakeError>;
