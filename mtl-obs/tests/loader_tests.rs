//! Session loader: seeding new drafts and rehydrating saved ones

mod helpers;

use helpers::{complete_draft, CountingLocal, ScriptedRemote};
use mtl_obs::draft_store::DraftStore;
use mtl_obs::error::{DraftError, ObservationError, PreconditionError, TransportError};
use mtl_obs::loader::{DraftSource, LoadMode, SessionLoader};
use mtl_obs::metrics::MetricsCalculator;
use mtl_obs::models::{FormDefaults, OwnerId};
use mtl_obs::persistence::{LocalStore, RemoteFetch};
use std::sync::Arc;
use std::time::Duration;

fn store(owner_id: Option<OwnerId>) -> DraftStore {
    DraftStore::new(owner_id, MetricsCalculator::default(), FormDefaults::default(), 3)
}

fn loader(remote: &Arc<ScriptedRemote>, local: Option<Arc<CountingLocal>>) -> SessionLoader {
    let local = local.map(|l| l as Arc<dyn LocalStore>);
    SessionLoader::new(remote.clone(), local, 3, Duration::from_secs(5))
}

#[tokio::test]
async fn test_new_session_seeds_clamped_rows() {
    let remote = ScriptedRemote::new();
    let loader = loader(&remote, None);

    for (quantity, expected) in [(Some(2), 2), (None, 3), (Some(7), 3), (Some(0), 1)] {
        let mut store = store(Some(OwnerId(1)));
        let report = loader
            .load(&mut store, Some(OwnerId(1)), LoadMode::New { quantity })
            .await
            .unwrap();
        assert_eq!(report.source, DraftSource::Seeded(expected));
        assert!(report.warning.is_none());
        assert_eq!(store.get_draft().rows.len(), expected);
        assert!(store.get_draft().images.is_empty());
    }
    assert_eq!(remote.fetch_calls(), 0);
}

#[tokio::test]
async fn test_edit_requires_owner() {
    let remote = ScriptedRemote::new();
    let mut store = store(None);

    let err = loader(&remote, None)
        .load(&mut store, None, LoadMode::Edit)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ObservationError::Precondition(PreconditionError::MissingOwner)
    ));
    assert_eq!(remote.fetch_calls(), 0);
}

#[tokio::test]
async fn test_edit_rehydrates_remote_draft() {
    let remote = ScriptedRemote::new();
    let saved = complete_draft(Some(OwnerId(9)), 2);
    remote.push_fetch(Ok(RemoteFetch::Found(saved.to_document())));
    let mut store = store(Some(OwnerId(9)));

    let report = loader(&remote, None)
        .load(&mut store, Some(OwnerId(9)), LoadMode::Edit)
        .await
        .unwrap();

    assert_eq!(report.source, DraftSource::Remote);
    let draft = store.get_draft();
    assert_eq!(draft.rows, saved.rows);
    assert_eq!(draft.images.len(), 6);
    assert_eq!(draft.form.tested_by, "R. Kumar");
    assert_eq!(store.seed_rows(3), Err(DraftError::SeedAfterRehydrate));
}

#[tokio::test]
async fn test_edit_with_nothing_saved_stays_empty() {
    let remote = ScriptedRemote::new();
    remote.push_fetch(Ok(RemoteFetch::Empty));
    let mut store = store(Some(OwnerId(9)));

    let report = loader(&remote, None)
        .load(&mut store, Some(OwnerId(9)), LoadMode::Edit)
        .await
        .unwrap();

    assert_eq!(report.source, DraftSource::Empty);
    assert!(report.warning.is_none());
    assert!(store.get_draft().rows.is_empty());
    assert_eq!(store.get_draft().form.machine_used, "Universal Testing Machine");
    assert_eq!(store.seed_rows(3), Err(DraftError::SeedAfterRehydrate));
}

#[tokio::test]
async fn test_transport_error_recovers_local_copy() {
    let remote = ScriptedRemote::new();
    remote.push_fetch(Err(TransportError::Network("connection refused".into())));
    let local = CountingLocal::new();
    let saved = complete_draft(Some(OwnerId(9)), 1);
    local.insert(
        "test_observations_9",
        &serde_json::to_string(&saved.to_document()).unwrap(),
    );
    let mut store = store(Some(OwnerId(9)));

    let report = loader(&remote, Some(local))
        .load(&mut store, Some(OwnerId(9)), LoadMode::Edit)
        .await
        .unwrap();

    assert_eq!(report.source, DraftSource::Local);
    assert_eq!(
        report.warning,
        Some(TransportError::Network("connection refused".into()))
    );
    assert_eq!(store.get_draft().rows.len(), 1);
}

#[tokio::test]
async fn test_transport_error_without_local_copy_is_soft() {
    let remote = ScriptedRemote::new();
    remote.push_fetch(Err(TransportError::Status(503, "unavailable".into())));
    let local = CountingLocal::new();
    local.insert("test_observations_9", "not json");
    let mut store = store(Some(OwnerId(9)));

    let report = loader(&remote, Some(local))
        .load(&mut store, Some(OwnerId(9)), LoadMode::Edit)
        .await
        .unwrap();

    assert_eq!(report.source, DraftSource::Empty);
    assert!(matches!(report.warning, Some(TransportError::Status(503, _))));
    // Manual entry can still start
    assert_eq!(store.seed_rows(2), Ok(2));
}
