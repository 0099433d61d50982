//! # MTL Common Library
//!
//! Shared code for the material-testing lab services:
//! - Error and result types
//! - Configuration loading and root folder resolution
//! - SQLite initialization and the local observation store table
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
