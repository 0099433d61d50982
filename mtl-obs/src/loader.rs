//! Observation session loader
//!
//! New sessions get seeded rows. Edit sessions are rehydrated from the
//! backend; when the backend cannot be reached the local fallback copy is
//! used instead, and the transport problem is reported as a soft warning.

use crate::draft_store::DraftStore;
use crate::error::{PreconditionError, Result, TransportError};
use crate::models::{ObservationDraft, ObservationPayload, OwnerId};
use crate::persistence::{storage_key, LocalStore, RemoteFetch, RemoteStore};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How the session was entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Fresh entry; `quantity` is the test request's specimen count, if stated
    New { quantity: Option<usize> },
    /// Continue a previously saved draft
    Edit,
}

/// Where the loaded draft came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSource {
    /// This many empty rows were created
    Seeded(usize),
    Remote,
    /// The local fallback copy
    Local,
    /// Nothing saved yet, or nothing reachable
    Empty,
}

impl fmt::Display for DraftSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftSource::Seeded(n) => write!(f, "seeded({})", n),
            DraftSource::Remote => f.write_str("remote"),
            DraftSource::Local => f.write_str("local"),
            DraftSource::Empty => f.write_str("empty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub source: DraftSource,
    /// Set when the backend could not be reached; entry can continue
    pub warning: Option<TransportError>,
}

/// What a finished fetch will do to the store
#[derive(Debug, Clone, PartialEq)]
pub enum LoadPlan {
    /// Create this many empty rows (clamped by the store)
    Seed(usize),
    /// Install a saved draft
    Rehydrate {
        payload: ObservationPayload,
        source: DraftSource,
    },
    /// Backend has nothing saved; start from an empty draft without seeding
    Empty,
    /// Nothing reachable; leave the store as is so manual entry can start
    Untouched,
}

/// Result of [`SessionLoader::fetch`], ready for [`SessionLoader::apply`]
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLoad {
    pub owner_id: Option<OwnerId>,
    pub plan: LoadPlan,
    pub warning: Option<TransportError>,
}

pub struct SessionLoader {
    remote: Arc<dyn RemoteStore>,
    local: Option<Arc<dyn LocalStore>>,
    default_count: usize,
    request_timeout: Duration,
}

impl SessionLoader {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        local: Option<Arc<dyn LocalStore>>,
        default_count: usize,
        request_timeout: Duration,
    ) -> Self {
        Self {
            remote,
            local,
            default_count,
            request_timeout,
        }
    }

    /// Seed or rehydrate `store`
    ///
    /// Holds `store` across the remote fetch; callers sharing the store
    /// should use [`fetch`](Self::fetch) and [`apply`](Self::apply) instead.
    pub async fn load(
        &self,
        store: &mut DraftStore,
        owner_id: Option<OwnerId>,
        mode: LoadMode,
    ) -> Result<LoadReport> {
        let pending = self.fetch(owner_id, mode).await?;
        self.apply(store, pending)
    }

    /// The I/O half of a load: decide what the store should receive
    pub async fn fetch(&self, owner_id: Option<OwnerId>, mode: LoadMode) -> Result<PendingLoad> {
        match mode {
            LoadMode::New { quantity } => Ok(PendingLoad {
                owner_id,
                plan: LoadPlan::Seed(quantity.unwrap_or(self.default_count)),
                warning: None,
            }),
            LoadMode::Edit => {
                let owner_id = owner_id.ok_or(PreconditionError::MissingOwner)?;
                Ok(self.fetch_saved(owner_id).await)
            }
        }
    }

    /// The in-memory half of a load
    pub fn apply(&self, store: &mut DraftStore, pending: PendingLoad) -> Result<LoadReport> {
        let PendingLoad {
            owner_id,
            plan,
            warning,
        } = pending;

        let source = match plan {
            LoadPlan::Seed(count) => {
                let seeded = store.seed_rows(count)?;
                info!(owner_id = ?owner_id, rows = seeded, "New observation draft");
                DraftSource::Seeded(seeded)
            }
            LoadPlan::Rehydrate { payload, source } => {
                let draft = payload.into_draft(owner_id, store.defaults());
                store.replace_draft(draft);
                info!(owner_id = ?owner_id, rows = store.get_draft().rows.len(), source = %source, "Saved observations loaded");
                source
            }
            LoadPlan::Empty => {
                let draft = ObservationDraft::empty(owner_id, store.defaults());
                store.replace_draft(draft);
                info!(owner_id = ?owner_id, "No saved observations yet");
                DraftSource::Empty
            }
            LoadPlan::Untouched => DraftSource::Empty,
        };

        Ok(LoadReport { source, warning })
    }

    async fn fetch_saved(&self, owner_id: OwnerId) -> PendingLoad {
        let fetched = match tokio::time::timeout(self.request_timeout, self.remote.fetch(owner_id)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.request_timeout)),
        };

        let (plan, warning) = match fetched {
            Ok(RemoteFetch::Found(payload)) => (
                LoadPlan::Rehydrate {
                    payload,
                    source: DraftSource::Remote,
                },
                None,
            ),
            Ok(RemoteFetch::Empty) => (LoadPlan::Empty, None),
            Err(cause) => {
                warn!(owner_id = %owner_id, error = %cause, "Could not fetch saved observations");
                let plan = match self.read_local(owner_id).await {
                    Some(payload) => LoadPlan::Rehydrate {
                        payload,
                        source: DraftSource::Local,
                    },
                    None => LoadPlan::Untouched,
                };
                (plan, Some(cause))
            }
        };

        PendingLoad {
            owner_id: Some(owner_id),
            plan,
            warning,
        }
    }

    async fn read_local(&self, owner_id: OwnerId) -> Option<ObservationPayload> {
        let local = self.local.as_ref()?;
        let key = storage_key(Some(&owner_id));

        let document = match local.read(&key).await {
            Ok(document) => document?,
            Err(e) => {
                warn!(key = %key, error = %e, "Local store read failed");
                return None;
            }
        };

        match serde_json::from_str(&document) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring unreadable local copy");
                None
            }
        }
    }
}
