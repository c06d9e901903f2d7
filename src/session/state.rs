//! Session state machine
//!
//! A session exists only once its connection is authorized and registered,
//! so it starts out `Active`.

use std::time::{Duration, Instant};

use crate::chat::Conversant;
use crate::connection::ConnectionId;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Reading and dispatching requests
    Active,
    /// Deregistered; terminal
    Terminated,
}

/// Per-connection session state
#[derive(Debug)]
pub struct SessionState {
    /// Connection this session runs on
    pub connection_id: ConnectionId,

    /// Authorized identity
    pub conversant: Conversant,

    /// Current phase
    pub phase: SessionPhase,

    /// Time the session started
    pub started_at: Instant,

    /// Requests dispatched, invalid ones included
    pub requests: u64,

    /// Requests answered with an error
    pub errors: u64,
}

impl SessionState {
    /// Create an active session
    pub fn new(connection_id: ConnectionId, conversant: Conversant) -> Self {
        Self {
            connection_id,
            conversant,
            phase: SessionPhase::Active,
            started_at: Instant::now(),
            requests: 0,
            errors: 0,
        }
    }

    /// Check if session is active
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn record_request(&mut self) {
        self.requests += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Move to `Terminated`
    ///
    /// Returns `false` if the session was already terminated.
    pub fn terminate(&mut self) -> bool {
        let was_active = self.is_active();
        self.phase = SessionPhase::Terminated;
        was_active
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut state = SessionState::new(1, Conversant::new(Uuid::new_v4(), "ana"));
        assert_eq!(state.phase, SessionPhase::Active);
        assert!(state.is_active());

        assert!(state.terminate());
        assert_eq!(state.phase, SessionPhase::Terminated);
        assert!(!state.terminate());
        assert!(!state.is_active());
    }

    #[test]
    fn test_counters() {
        let mut state = SessionState::new(1, Conversant::new(Uuid::new_v4(), "ana"));
        state.record_request();
        state.record_request();
        state.record_error();
        assert_eq!(state.requests, 2);
        assert_eq!(state.errors, 1);
    }
}
