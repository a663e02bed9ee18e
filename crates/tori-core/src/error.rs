use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Block serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Rule descriptor error: {0}")]
    RuleFormat(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("rule.json not found in {}", .0.display())]
    RuleNotFound(PathBuf),

    #[error("Rule set in {0} has conflicting match parts")]
    InvalidRuleSet(String),

    #[error("Unknown change type: {0}")]
    InvalidChangeType(String),

    #[error("No folder row for path {0}")]
    FolderNotFound(String),

    #[error("No input file blocks provided")]
    EmptyInput,

    #[error("Server datablock is missing its updated_at field")]
    MissingVersion,

    #[error("Client datablock ({client}) is newer than server version ({server})")]
    ClientAheadOfServer {
        client: DateTime<Utc>,
        server: DateTime<Utc>,
    },

    #[error("Sync cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
