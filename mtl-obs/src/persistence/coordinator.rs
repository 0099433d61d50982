//! Persistence coordinator
//!
//! The only component that performs I/O on save. Order is fixed: owner check,
//! full validation, remote save (bounded by the request timeout, with the
//! progress ramp running alongside), and only after a definite remote failure
//! exactly one local write.

use super::local::LocalStore;
use super::progress::{ProgressTracker, SavePhase, VALIDATED_PERCENT};
use super::remote::RemoteStore;
use super::storage_key;
use crate::error::{TransportError, ValidationFailures};
use crate::models::{ObservationDraft, OwnerId, SaveKind};
use crate::validator;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Why a save did not happen
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// No owning test request
    MissingOwner,
    Validation(ValidationFailures),
    /// Another save on the same session has not finished
    SaveInProgress,
    /// The remote save failed and so did the local fallback write
    LocalStoreFailed(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingOwner => f.write_str("missing-owner"),
            RejectReason::Validation(failures) => write!(f, "{}", failures),
            RejectReason::SaveInProgress => f.write_str("A save is already in progress"),
            RejectReason::LocalStoreFailed(e) => {
                write!(f, "Failed to save test observations locally: {}", e)
            }
        }
    }
}

/// Result of [`PersistenceCoordinator::save`]
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    RemoteSaved,
    /// Remote failed with `cause`; the draft is stored locally under `key`
    LocalFallbackSaved { key: String, cause: TransportError },
    Rejected(RejectReason),
}

impl SaveOutcome {
    pub fn code(&self) -> &'static str {
        match self {
            SaveOutcome::RemoteSaved => "remote-saved",
            SaveOutcome::LocalFallbackSaved { .. } => "local-fallback-saved",
            SaveOutcome::Rejected(_) => "rejected",
        }
    }

    /// Where the draft landed, if anywhere
    pub fn save_kind(&self) -> Option<SaveKind> {
        match self {
            SaveOutcome::RemoteSaved => Some(SaveKind::Remote),
            SaveOutcome::LocalFallbackSaved { .. } => Some(SaveKind::LocalFallback),
            SaveOutcome::Rejected(_) => None,
        }
    }

    /// Message for the operator
    pub fn message(&self) -> String {
        match self {
            SaveOutcome::RemoteSaved => "Test observations saved successfully!".to_string(),
            SaveOutcome::LocalFallbackSaved { .. } => "Test observations saved locally!".to_string(),
            SaveOutcome::Rejected(RejectReason::Validation(failures)) => failures
                .first()
                .map(ToString::to_string)
                .unwrap_or_else(|| "Please fix validation errors before submitting.".to_string()),
            SaveOutcome::Rejected(reason) => reason.to_string(),
        }
    }
}

/// Remote-then-local save orchestration
#[derive(Clone)]
pub struct PersistenceCoordinator {
    remote: Arc<dyn RemoteStore>,
    local: Arc<dyn LocalStore>,
    request_timeout: Duration,
}

impl PersistenceCoordinator {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        local: Arc<dyn LocalStore>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            remote,
            local,
            request_timeout,
        }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    pub fn local(&self) -> &Arc<dyn LocalStore> {
        &self.local
    }

    /// Save a draft snapshot for `owner_id`
    ///
    /// Never returns a transport failure: a failed remote save degrades to
    /// [`SaveOutcome::LocalFallbackSaved`].
    pub async fn save(
        &self,
        draft: &ObservationDraft,
        owner_id: Option<OwnerId>,
        progress: &mut ProgressTracker,
    ) -> SaveOutcome {
        let Some(owner_id) = owner_id else {
            warn!("Save rejected: no owning test request");
            progress.transition(SavePhase::Failed);
            return SaveOutcome::Rejected(RejectReason::MissingOwner);
        };

        let result = validator::validate_all(draft);
        if let Err(failures) = result.into_result() {
            info!(
                owner_id = %owner_id,
                failures = failures.0.len(),
                first = %failures.first().map(|f| f.code()).unwrap_or_default(),
                "Save rejected by validation"
            );
            progress.transition(SavePhase::Failed);
            return SaveOutcome::Rejected(RejectReason::Validation(failures));
        }

        progress.transition(SavePhase::Attempting);
        progress.set_percent(VALIDATED_PERCENT);

        let payload = draft.to_payload(owner_id, mtl_common::time::now());

        let cause = match self.save_remote(owner_id, &payload, progress).await {
            Ok(()) => {
                progress.transition(SavePhase::Done);
                info!(owner_id = %owner_id, rows = payload.test_rows.len(), "Observations saved");
                return SaveOutcome::RemoteSaved;
            }
            Err(cause) => cause,
        };

        warn!(owner_id = %owner_id, error = %cause, "Remote save failed, using local fallback");
        progress.transition(SavePhase::RemoteFailed);
        progress.transition(SavePhase::LocalAttempting);

        let key = storage_key(Some(&owner_id));
        let written = match serde_json::to_string(&payload) {
            Ok(document) => self
                .local
                .write(&key, &document)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match written {
            Ok(()) => {
                progress.transition(SavePhase::Done);
                info!(owner_id = %owner_id, key = %key, "Observations saved locally");
                SaveOutcome::LocalFallbackSaved { key, cause }
            }
            Err(e) => {
                error!(owner_id = %owner_id, key = %key, error = %e, "Local fallback write failed");
                progress.transition(SavePhase::Failed);
                SaveOutcome::Rejected(RejectReason::LocalStoreFailed(e))
            }
        }
    }

    /// Remote save raced against the progress ramp, bounded by the request timeout
    async fn save_remote(
        &self,
        owner_id: OwnerId,
        payload: &crate::models::ObservationPayload,
        progress: &mut ProgressTracker,
    ) -> Result<(), TransportError> {
        let call = tokio::time::timeout(self.request_timeout, self.remote.save(owner_id, payload));
        tokio::pin!(call);

        let mut ticker = tokio::time::interval(progress.config().tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                result = &mut call => {
                    return match result {
                        Ok(inner) => inner,
                        Err(_) => Err(TransportError::Timeout(self.request_timeout)),
                    };
                }
                _ = ticker.tick() => progress.step_ramp(),
            }
        }
    }
}

impl fmt::Debug for PersistenceCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceCoordinator")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
