//! Draft persistence: remote API first, local fallback second

pub mod coordinator;
pub mod local;
pub mod progress;
pub mod remote;

pub use coordinator::{PersistenceCoordinator, RejectReason, SaveOutcome};
pub use local::{LocalStore, SqliteLocalStore};
pub use progress::{ProgressTracker, SavePhase, VALIDATED_PERCENT};
pub use remote::{HttpRemoteStore, RemoteFetch, RemoteStore};

use crate::models::OwnerId;

/// Local store key for an owner's draft; `temp` when there is no owner
pub fn storage_key(owner_id: Option<&OwnerId>) -> String {
    match owner_id {
        Some(id) => format!("test_observations_{}", id),
        None => "test_observations_temp".to_string(),
    }
}
