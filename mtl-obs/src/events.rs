//! User-visible session events
//!
//! Save progress and load results are broadcast to whoever renders them
//! (CLI progress line, UI, tests). Emitting never blocks and never fails the
//! operation that emits.

use crate::models::OwnerId;
use crate::persistence::SavePhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events published by an observation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObservationEvent {
    /// Save state machine moved or the progress ramp advanced
    SaveProgress {
        session_id: Uuid,
        phase: SavePhase,
        /// 0-100; never 100 before the save resolves
        percent: f64,
        timestamp: DateTime<Utc>,
    },

    /// A save attempt resolved
    SaveFinished {
        session_id: Uuid,
        /// Outcome code (`remote-saved`, `local-fallback-saved`, `rejected`)
        outcome: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// The session's draft was seeded or rehydrated
    DraftLoaded {
        session_id: Uuid,
        owner_id: Option<OwnerId>,
        source: String,
        rows: usize,
        timestamp: DateTime<Utc>,
    },

    /// Loading hit a recoverable problem; manual entry is still possible
    LoadWarning {
        session_id: Uuid,
        owner_id: Option<OwnerId>,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ObservationEvent {
    pub fn event_type(&self) -> &str {
        match self {
            ObservationEvent::SaveProgress { .. } => "SaveProgress",
            ObservationEvent::SaveFinished { .. } => "SaveFinished",
            ObservationEvent::DraftLoaded { .. } => "DraftLoaded",
            ObservationEvent::LoadWarning { .. } => "LoadWarning",
        }
    }

    pub fn session_id(&self) -> Uuid {
        match self {
            ObservationEvent::SaveProgress { session_id, .. }
            | ObservationEvent::SaveFinished { session_id, .. }
            | ObservationEvent::DraftLoaded { session_id, .. }
            | ObservationEvent::LoadWarning { session_id, .. } => *session_id,
        }
    }
}

/// Broadcast channel for [`ObservationEvent`]s
///
/// Cloning shares the channel. Slow receivers lose the oldest events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ObservationEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ObservationEvent> {
        self.tx.subscribe()
    }

    /// Emit, reporting the number of receivers or the event back if there are none
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ObservationEvent,
    ) -> Result<usize, broadcast::error::SendError<ObservationEvent>> {
        self.tx.send(event)
    }

    /// Emit, ignoring whether anyone is listening
    pub fn emit_lossy(&self, event: ObservationEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
