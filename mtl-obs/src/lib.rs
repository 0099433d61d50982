//! # mtl-obs
//!
//! Test observation capture and derived-metrics engine for concrete cube
//! compression tests:
//! - Specimen rows with derived area and density
//! - Completeness validation (numbers, photos, signatures)
//! - Remote save with a durable local fallback and progress reporting
//! - Session loading for new and continued drafts

pub mod capture;
pub mod config;
pub mod draft_store;
pub mod error;
pub mod events;
pub mod loader;
pub mod metrics;
pub mod models;
pub mod persistence;
pub mod session;
pub mod validator;

pub use crate::error::{ObservationError, Result};
pub use crate::session::ObservationSession;
