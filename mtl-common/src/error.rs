//! Shared error type

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config file missing, unreadable or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Write still blocked by another connection when the retry deadline passed
    #[error("{label}: database still locked after {attempts} attempts ({waited:?})")]
    LockTimeout {
        label: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
