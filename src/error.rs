use std::path::PathBuf;

use thiserror::Error;

/// Raised when a dataset does not carry a column a stage depends on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Column '{column}' not found in dataset '{dataset}'")]
    MissingColumn { dataset: String, column: String },
    #[error("Column '{column}' already exists in dataset '{dataset}'")]
    DuplicateColumn { dataset: String, column: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Identifier '{value}' is shorter than its {prefix_len}-character prefix")]
    TooShort { value: String, prefix_len: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No path configured for the {0} input; set it in the config file or pass --{1}")]
    MissingInput(&'static str, &'static str),
    #[error("Reference price index must be a positive finite number, got {0}")]
    InvalidReferenceIndex(f64),
    #[error("Multi-value delimiter cannot be empty")]
    EmptyDelimiter,
    #[error("Output path {0:?} exists and is not a directory")]
    OutputNotDirectory(PathBuf),
}
