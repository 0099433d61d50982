//! Shared test helpers for mtl-obs integration tests
#![allow(dead_code)]

pub mod doubles;
pub mod fixtures;

pub use doubles::{CountingLocal, ScriptedRemote};
pub use fixtures::{complete_draft, complete_row, test_config};
