//! Observation session handle
//!
//! Ties one draft store to the loader, the persistence coordinator and the
//! event bus. Clones share the same session. At most one save runs at a
//! time; a save still in flight when the session closes finishes its I/O but
//! leaves the (discarded) store alone and publishes nothing further.

use crate::capture::{CaptureTarget, ImageCaptureAdapter};
use crate::config::{ObsConfig, ProgressConfig};
use crate::draft_store::DraftStore;
use crate::error::{DraftError, PreconditionError, Result};
use crate::events::{EventBus, ObservationEvent};
use crate::loader::{LoadMode, LoadReport, SessionLoader};
use crate::metrics::MetricsCalculator;
use crate::models::{MetadataField, ObservationDraft, OwnerId, PhotoAngle, RowField, SpecimenRow};
use crate::persistence::{
    LocalStore, PersistenceCoordinator, ProgressTracker, RejectReason, RemoteStore, SaveOutcome,
};
use crate::validator::{self, ValidationMode, ValidationResult, WeightAdvisory};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

struct SessionInner {
    id: Uuid,
    owner_id: Option<OwnerId>,
    store: RwLock<DraftStore>,
    save_gate: Mutex<()>,
    coordinator: PersistenceCoordinator,
    loader: SessionLoader,
    bus: EventBus,
    progress: ProgressConfig,
    weight_range: Option<(f64, f64)>,
    cancel: CancellationToken,
}

/// Handle to one observation entry session
#[derive(Clone)]
pub struct ObservationSession {
    inner: Arc<SessionInner>,
}

impl ObservationSession {
    /// Build a session for `owner_id` from configuration and the two stores
    pub fn from_config(
        config: &ObsConfig,
        owner_id: Option<OwnerId>,
        remote: Arc<dyn RemoteStore>,
        local: Arc<dyn LocalStore>,
        bus: EventBus,
    ) -> Self {
        let store = DraftStore::new(
            owner_id,
            MetricsCalculator::new(config.precision),
            config.form_defaults.clone(),
            config.specimens.max_count,
        );
        let timeout = config.api.request_timeout();
        let coordinator = PersistenceCoordinator::new(remote.clone(), local.clone(), timeout);
        let loader = SessionLoader::new(remote, Some(local), config.specimens.default_count, timeout);

        let inner = SessionInner {
            id: Uuid::new_v4(),
            owner_id,
            store: RwLock::new(store),
            save_gate: Mutex::new(()),
            coordinator,
            loader,
            bus,
            progress: config.progress,
            weight_range: config.weight_range(),
            cancel: CancellationToken::new(),
        };
        debug!(session_id = %inner.id, owner_id = ?owner_id, "Session created");
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn owner_id(&self) -> Option<OwnerId> {
        self.inner.owner_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ObservationEvent> {
        self.inner.bus.subscribe()
    }

    /// Seed or rehydrate the draft
    pub async fn load(&self, mode: LoadMode) -> Result<LoadReport> {
        self.ensure_open()?;
        // Fetch without the store lock so edits keep flowing meanwhile
        let pending = self.inner.loader.fetch(self.inner.owner_id, mode).await?;
        self.ensure_open()?;

        let mut store = self.inner.store.write().await;
        let report = self.inner.loader.apply(&mut store, pending)?;
        let rows = store.get_draft().rows.len();
        drop(store);

        let timestamp = mtl_common::time::now();
        self.inner.bus.emit_lossy(ObservationEvent::DraftLoaded {
            session_id: self.inner.id,
            owner_id: self.inner.owner_id,
            source: report.source.to_string(),
            rows,
            timestamp,
        });
        if let Some(warning) = &report.warning {
            self.inner.bus.emit_lossy(ObservationEvent::LoadWarning {
                session_id: self.inner.id,
                owner_id: self.inner.owner_id,
                message: warning.to_string(),
                timestamp,
            });
        }
        Ok(report)
    }

    /// Current draft
    pub async fn draft(&self) -> ObservationDraft {
        self.inner.store.read().await.snapshot()
    }

    /// Replace the whole draft (e.g. a draft file edited outside the session)
    pub async fn replace_draft(&self, draft: ObservationDraft) -> Result<()> {
        self.ensure_open()?;
        self.inner.store.write().await.replace_draft(draft);
        Ok(())
    }

    pub async fn mutate_row(&self, index: usize, field: RowField, value: &str) -> Result<SpecimenRow> {
        self.ensure_open()?;
        let mut store = self.inner.store.write().await;
        let row = store.mutate_row(index, field, value)?;
        Ok(row.clone())
    }

    pub async fn mutate_metadata(&self, field: MetadataField, value: &str) -> Result<()> {
        self.ensure_open()?;
        self.inner.store.write().await.mutate_metadata(field, value)?;
        Ok(())
    }

    pub async fn add_row(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.inner.store.write().await.add_row()?)
    }

    pub async fn remove_row(&self, index: usize) -> Result<SpecimenRow> {
        self.ensure_open()?;
        Ok(self.inner.store.write().await.remove_row(index)?)
    }

    /// Take a photo through `adapter` and store it for `target`
    ///
    /// The store is not locked while the adapter works. The photo goes to
    /// the row that was at `target.specimen` when capture started, wherever
    /// that row sits afterwards.
    pub async fn capture_photo(
        &self,
        adapter: &dyn ImageCaptureAdapter,
        target: CaptureTarget,
    ) -> Result<()> {
        self.ensure_open()?;
        let row_id = {
            let store = self.inner.store.read().await;
            match store.get_draft().row(target.specimen) {
                Some(row) => row.id,
                None => {
                    return Err(DraftError::RowOutOfRange {
                        index: target.specimen,
                        len: store.get_draft().rows.len(),
                    }
                    .into())
                }
            }
        };

        let image = adapter.capture(target).await?;

        self.ensure_open()?;
        // Rows may have moved while the adapter was busy
        let mut store = self.inner.store.write().await;
        let position = store
            .position_of(row_id)
            .ok_or(DraftError::RowRemoved { id: row_id })?;
        store.set_captured_image(position, target.angle, image)?;
        Ok(())
    }

    pub async fn remove_photo(&self, specimen: usize, angle: PhotoAngle) -> Result<bool> {
        self.ensure_open()?;
        Ok(self
            .inner
            .store
            .write()
            .await
            .remove_captured_image(specimen, angle)
            .is_some())
    }

    pub async fn validate(&self, mode: ValidationMode) -> ValidationResult {
        let store = self.inner.store.read().await;
        validator::validate_with(store.get_draft(), mode)
    }

    /// Non-blocking weight warnings; empty when no range is configured
    pub async fn weight_advisories(&self) -> Vec<WeightAdvisory> {
        match self.inner.weight_range {
            Some(range) => {
                let store = self.inner.store.read().await;
                validator::weight_advisories(store.get_draft(), range)
            }
            None => Vec::new(),
        }
    }

    pub async fn suggest_average_strength(&self) -> Option<String> {
        self.inner.store.read().await.suggest_average_strength()
    }

    /// Validate and persist the current draft
    ///
    /// A second call while one is in flight is rejected with
    /// [`RejectReason::SaveInProgress`].
    pub async fn save(&self) -> Result<SaveOutcome> {
        self.ensure_open()?;

        let Ok(_gate) = self.inner.save_gate.try_lock() else {
            debug!(session_id = %self.inner.id, "Save already in progress");
            return Ok(SaveOutcome::Rejected(RejectReason::SaveInProgress));
        };

        let snapshot = self.inner.store.read().await.snapshot();
        let mut tracker =
            ProgressTracker::new(self.inner.id, self.inner.progress, Some(self.inner.bus.clone()))
                .silenced_by(self.inner.cancel.clone());

        let outcome = self
            .inner
            .coordinator
            .save(&snapshot, snapshot.owner_id, &mut tracker)
            .await;

        if self.inner.cancel.is_cancelled() {
            info!(
                session_id = %self.inner.id,
                outcome = outcome.code(),
                "Save finished after session closed"
            );
            return Ok(outcome);
        }
        if let Some(kind) = outcome.save_kind() {
            self.inner
                .store
                .write()
                .await
                .mark_saved(kind, mtl_common::time::now());
        }

        self.inner.bus.emit_lossy(ObservationEvent::SaveFinished {
            session_id: self.inner.id,
            outcome: outcome.code().to_string(),
            message: outcome.message(),
            timestamp: mtl_common::time::now(),
        });
        Ok(outcome)
    }

    /// Tear the session down; later operations fail with `session-closed`
    pub fn close(&self) {
        if !self.inner.cancel.is_cancelled() {
            self.inner.cancel.cancel();
            info!(session_id = %self.inner.id, "Session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(PreconditionError::SessionClosed.into())
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for ObservationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationSession")
            .field("id", &self.inner.id)
            .field("owner_id", &self.inner.owner_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
