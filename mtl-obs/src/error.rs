//! Error types for mtl-obs
//!
//! Four failure classes reach the operator:
//! - validation: blocks submission, always names the field to fix
//! - transport: the API could not be reached; saves fall back to local storage
//! - precondition: the operation cannot run at all (e.g. no owning test request)
//! - capture: the photo could not be taken; the operator may retry or upload

use crate::models::MetadataField;
use crate::validator::ValidationFailure;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, ObservationError>;

/// Top-level engine error
#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("Validation failed: {0}")]
    Validation(ValidationFailures),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Cannot proceed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Photo capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("Draft error: {0}")]
    Draft(#[from] DraftError),

    #[error("Common error: {0}")]
    Common(#[from] mtl_common::Error),
}

/// Ordered, non-empty list of validation failures
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailures(pub Vec<ValidationFailure>);

impl ValidationFailures {
    /// The failure shown when only one message fits
    pub fn first(&self) -> Option<&ValidationFailure> {
        self.0.first()
    }
}

impl fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Remote API failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Status(u16, String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Could not decode response: {0}")]
    Decode(String),
}

/// Conditions that stop an operation before it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("missing-owner")]
    MissingOwner,

    #[error("session-closed")]
    SessionClosed,
}

/// Image capture failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("Camera access denied: {0}")]
    CaptureDenied(String),

    #[error("Capture cancelled")]
    CaptureCancelled,

    #[error("Could not read image: {0}")]
    Unreadable(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Illegal operations on the draft store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("Row {index} does not exist (draft has {len} rows)")]
    RowOutOfRange { index: usize, len: usize },

    #[error("Field '{0}' is fixed and cannot be edited")]
    ReadOnlyField(MetadataField),

    #[error("Rows were already seeded for this session")]
    AlreadySeeded,

    #[error("Rows cannot be seeded after a saved draft was loaded")]
    SeedAfterRehydrate,

    #[error("A draft holds at most {max} specimens")]
    RowLimit { max: usize },

    #[error("The last remaining specimen cannot be removed")]
    LastRow,

    #[error("No specimen ids left to assign")]
    RowIdsExhausted,

    #[error("Specimen with id {id} was removed")]
    RowRemoved { id: u32 },
}
