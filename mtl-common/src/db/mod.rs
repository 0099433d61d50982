//! Database initialization and local store queries

pub mod init;
pub mod local_entries;
pub mod retry;

pub use init::init_database;
pub use local_entries::{get_entry, list_entries, put_entry, LocalEntrySummary};
pub use retry::{retry_on_lock, LockRetry};
