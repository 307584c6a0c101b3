//! Radar mode lifecycle.
//!
//! Pure state machine with no I/O; the host drives the transitions when the
//! user starts or stops the radar and performs sensor and audio start-up
//! itself.
//!
//! ```text
//!   Inactive ──start(no target)──▶ TargetNotSet
//!      │                              │
//!      └──────start(target)──▶ Running ◀──start(target)──┘
//!                                 │
//!                 stop (from any) ▼
//!                              Stopped ──start(..)──▶ Running / TargetNotSet
//! ```

use serde::{Deserialize, Serialize};

/// Current radar mode status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RadarStatus {
    /// Never started
    #[default]
    Inactive,
    /// Start was requested without a destination
    TargetNotSet,
    /// Sensors running, feedback enabled
    Running,
    /// Stopped by the user
    Stopped,
}

impl RadarStatus {
    /// Samples are only processed while running
    pub fn is_running(&self) -> bool {
        matches!(self, RadarStatus::Running)
    }
}

impl std::fmt::Display for RadarStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RadarStatus::Inactive => write!(f, "Inactive"),
            RadarStatus::TargetNotSet => write!(f, "Target Not Set"),
            RadarStatus::Running => write!(f, "Running"),
            RadarStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Tracks the radar status and how long it has been in it
#[derive(Debug, Clone, Default)]
pub struct RadarLifecycle {
    status: RadarStatus,
    /// Timestamp of last state change (milliseconds)
    last_change_ms: u64,
    /// Number of runs started since creation
    sessions: u32,
}

impl RadarLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RadarStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    pub fn time_in_state_ms(&self, current_time_ms: u64) -> u64 {
        current_time_ms.saturating_sub(self.last_change_ms)
    }

    /// Request a start.
    ///
    /// Returns the resulting status. Starting while already running keeps the
    /// current run and does not count a new session.
    pub fn start(&mut self, has_target: bool, current_time_ms: u64) -> RadarStatus {
        if !has_target {
            self.set_status(RadarStatus::TargetNotSet, current_time_ms);
        } else if !self.is_running() {
            self.set_status(RadarStatus::Running, current_time_ms);
            self.sessions = self.sessions.saturating_add(1);
        }
        self.status
    }

    /// Stop from any state. Returns true if a run was actually stopped.
    pub fn stop(&mut self, current_time_ms: u64) -> bool {
        let was_running = self.is_running();
        self.set_status(RadarStatus::Stopped, current_time_ms);
        was_running
    }

    fn set_status(&mut self, status: RadarStatus, current_time_ms: u64) {
        if self.status != status {
            self.status = status;
            self.last_change_ms = current_time_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        let mut radar = RadarLifecycle::new();
        assert_eq!(radar.status(), RadarStatus::Inactive);

        assert_eq!(radar.start(false, 100), RadarStatus::TargetNotSet);
        assert!(!radar.is_running());
        assert_eq!(radar.sessions(), 0);

        assert_eq!(radar.start(true, 200), RadarStatus::Running);
        assert!(radar.is_running());
        assert_eq!(radar.sessions(), 1);

        assert!(radar.stop(300));
        assert_eq!(radar.status(), RadarStatus::Stopped);
        assert!(!radar.stop(400));
    }

    #[test]
    fn test_restart_while_running_is_same_session() {
        let mut radar = RadarLifecycle::new();
        radar.start(true, 0);
        radar.start(true, 50);
        assert_eq!(radar.sessions(), 1);
        assert_eq!(radar.time_in_state_ms(150), 150);
    }

    #[test]
    fn test_start_without_target_while_running() {
        let mut radar = RadarLifecycle::new();
        radar.start(true, 0);
        assert_eq!(radar.start(false, 10), RadarStatus::TargetNotSet);
        assert!(!radar.is_running());
    }
}
