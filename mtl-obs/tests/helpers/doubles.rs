//! Scripted stand-ins for the remote API and the local store

use async_trait::async_trait;
use mtl_common::db::LocalEntrySummary;
use mtl_obs::error::TransportError;
use mtl_obs::models::{ObservationPayload, OwnerId};
use mtl_obs::persistence::{LocalStore, RemoteFetch, RemoteStore};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Remote store answering from queued results
///
/// Empty queues answer `Ok(Empty)` for fetches and `Ok(())` for saves.
#[derive(Default)]
pub struct ScriptedRemote {
    fetch_results: Mutex<VecDeque<Result<RemoteFetch, TransportError>>>,
    save_results: Mutex<VecDeque<Result<(), TransportError>>>,
    saved: Mutex<Vec<(OwnerId, ObservationPayload)>>,
    fetch_calls: AtomicUsize,
    save_calls: AtomicUsize,
    save_delay: Mutex<Option<Duration>>,
    fetch_delay: Mutex<Option<Duration>>,
    held: AtomicBool,
    save_started: Notify,
    release: Notify,
}

impl ScriptedRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_fetch(&self, result: Result<RemoteFetch, TransportError>) {
        self.fetch_results.lock().unwrap().push_back(result);
    }

    pub fn push_save(&self, result: Result<(), TransportError>) {
        self.save_results.lock().unwrap().push_back(result);
    }

    /// Every save sleeps this long before answering
    pub fn delay_saves(&self, delay: Duration) {
        *self.save_delay.lock().unwrap() = Some(delay);
    }

    /// Every fetch sleeps this long before answering
    pub fn delay_fetches(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    /// Saves block until [`release_save`](Self::release_save)
    pub fn hold_saves(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release_save(&self) {
        self.release.notify_one();
    }

    /// Resolves once a save call has started
    pub async fn save_started(&self) {
        self.save_started.notified().await;
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Vec<(OwnerId, ObservationPayload)> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    async fn fetch(&self, _owner_id: OwnerId) -> Result<RemoteFetch, TransportError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.fetch_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(RemoteFetch::Empty))
    }

    async fn save(
        &self,
        owner_id: OwnerId,
        payload: &ObservationPayload,
    ) -> Result<(), TransportError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.save_started.notify_one();

        if self.held.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        let delay = *self.save_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = self
            .save_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        if result.is_ok() {
            self.saved.lock().unwrap().push((owner_id, payload.clone()));
        }
        result
    }
}

/// In-memory local store counting every write attempt
#[derive(Default)]
pub struct CountingLocal {
    entries: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl CountingLocal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        Arc::new(store)
    }

    pub fn insert(&self, key: &str, document: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), document.to_string());
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl LocalStore for CountingLocal {
    async fn write(&self, key: &str, document: &str) -> mtl_common::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(mtl_common::Error::Internal("disk full".to_string()));
        }
        self.insert(key, document);
        Ok(())
    }

    async fn read(&self, key: &str) -> mtl_common::Result<Option<String>> {
        Ok(self.get(key))
    }

    async fn list(&self) -> mtl_common::Result<Vec<LocalEntrySummary>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(key, value)| LocalEntrySummary {
                key: key.clone(),
                updated_at: String::new(),
                size_bytes: value.len() as i64,
            })
            .collect())
    }
}
