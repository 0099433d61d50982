//! Save phases and the user-visible progress ramp
//!
//! A save walks an explicit state machine:
//!
//! ```text
//! Validating ─▶ Attempting ─▶ Done
//!     │             │
//!     ▼             ▼
//!   Failed ◀─ LocalAttempting ◀─ RemoteFailed
//!                   │
//!                   ▼
//!                 Done
//! ```
//!
//! Progress is simulated while the remote call is outstanding: random steps
//! that never pass the configured ceiling, then 100 once the save resolves.

use crate::config::ProgressConfig;
use crate::events::{EventBus, ObservationEvent};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

/// Percent reported once validation has passed
pub const VALIDATED_PERCENT: f64 = 10.0;

/// Phase of a single save attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SavePhase {
    Validating,
    Attempting,
    RemoteFailed,
    LocalAttempting,
    Done,
    Failed,
}

impl SavePhase {
    pub fn can_transition_to(self, next: SavePhase) -> bool {
        use SavePhase::*;
        matches!(
            (self, next),
            (Validating, Attempting)
                | (Validating, Failed)
                | (Attempting, Done)
                | (Attempting, RemoteFailed)
                | (RemoteFailed, LocalAttempting)
                | (LocalAttempting, Done)
                | (LocalAttempting, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SavePhase::Done | SavePhase::Failed)
    }
}

impl std::fmt::Display for SavePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SavePhase::Validating => "validating",
            SavePhase::Attempting => "attempting",
            SavePhase::RemoteFailed => "remote-failed",
            SavePhase::LocalAttempting => "local-attempting",
            SavePhase::Done => "done",
            SavePhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks one save attempt's phase and percent, publishing every change
#[derive(Debug)]
pub struct ProgressTracker {
    session_id: Uuid,
    config: ProgressConfig,
    bus: Option<EventBus>,
    phase: SavePhase,
    percent: f64,
    trail: Vec<SavePhase>,
    silence: Option<CancellationToken>,
}

impl ProgressTracker {
    pub fn new(session_id: Uuid, config: ProgressConfig, bus: Option<EventBus>) -> Self {
        Self {
            session_id,
            config,
            bus,
            phase: SavePhase::Validating,
            percent: 0.0,
            trail: vec![SavePhase::Validating],
            silence: None,
        }
    }

    /// Stop publishing once `token` is cancelled; phase and percent still advance
    pub fn silenced_by(mut self, token: CancellationToken) -> Self {
        self.silence = Some(token);
        self
    }

    /// Tracker that publishes nowhere
    pub fn detached(config: ProgressConfig) -> Self {
        Self::new(Uuid::new_v4(), config, None)
    }

    pub fn phase(&self) -> SavePhase {
        self.phase
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Every phase visited, in order
    pub fn trail(&self) -> &[SavePhase] {
        &self.trail
    }

    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    /// Move to `next`; illegal moves are logged and ignored
    pub fn transition(&mut self, next: SavePhase) -> bool {
        if !self.phase.can_transition_to(next) {
            error!(from = %self.phase, to = %next, "Illegal save phase transition");
            return false;
        }
        debug!(from = %self.phase, to = %next, "Save phase");
        self.phase = next;
        self.trail.push(next);
        if next.is_terminal() {
            self.percent = 100.0;
        }
        self.publish();
        true
    }

    /// Raise the percent; never lowers it and never reaches 100 before a terminal phase
    pub fn set_percent(&mut self, percent: f64) {
        let cap = if self.phase.is_terminal() { 100.0 } else { 99.0 };
        let percent = percent.clamp(0.0, cap);
        if percent > self.percent {
            self.percent = percent;
            self.publish();
        }
    }

    /// One random ramp step toward the ceiling
    pub fn step_ramp(&mut self) {
        if self.percent >= self.config.ceiling {
            return;
        }
        // Non-finite steps would make the uniform range invalid
        let max_step = if self.config.max_step.is_finite() {
            self.config.max_step.clamp(1.0, 100.0)
        } else {
            100.0
        };
        let step = rand::thread_rng().gen_range(1.0..=max_step);
        let next = (self.percent + step).min(self.config.ceiling);
        self.set_percent(next);
    }

    fn publish(&self) {
        if self.silence.as_ref().is_some_and(|t| t.is_cancelled()) {
            return;
        }
        if let Some(bus) = &self.bus {
            bus.emit_lossy(ObservationEvent::SaveProgress {
                session_id: self.session_id,
                phase: self.phase,
                percent: self.percent,
                timestamp: mtl_common::time::now(),
            });
        }
    }
}
