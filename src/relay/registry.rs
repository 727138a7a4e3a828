//! # Session Registry
//!
//! Tracks the relay's client connections and their upstream status. This is
//! the only state shared across sessions; the sessions themselves are
//! isolated actors and a failure in one never propagates through here.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use chrono::{DateTime, Utc};

/// Upstream status of one client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Client connected, no upstream session requested yet
    Idle,
    /// `start` received, upstream handshake in flight
    Connecting,
    /// Upstream session live, audio flowing
    Connected,
    /// Upstream or configuration failure
    Error,
    /// Upstream session closed (client `stop` or disconnect)
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Error => "error",
            SessionStatus::Closed => "closed",
        }
    }
}

/// Registry entry for one client connection.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

/// Shared registry of live relay sessions.
///
/// Enforces the concurrent-session limit at registration time; everything
/// else is bookkeeping for health/metrics.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client connection.
    ///
    /// Returns an error when the concurrent-session limit is reached; the
    /// caller turns that into an error frame and closes the socket.
    pub fn register(&self, session_id: &str, max_sessions: usize) -> Result<(), String> {
        let mut sessions = self.sessions.write().unwrap();

        if sessions.len() >= max_sessions {
            return Err(format!(
                "Maximum concurrent sessions ({}) reached",
                max_sessions
            ));
        }

        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                status: SessionStatus::Idle,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Update the status of a session; unknown ids are ignored.
    pub fn set_status(&self, session_id: &str, status: SessionStatus) {
        let mut sessions = self.sessions.write().unwrap();
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.status = status;
        }
    }

    pub fn status(&self, session_id: &str) -> Option<SessionStatus> {
        let sessions = self.sessions.read().unwrap();
        sessions.get(session_id).map(|entry| entry.status.clone())
    }

    /// Remove a session when its socket closes.
    pub fn remove(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(session_id).is_some()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    /// Status counts for the metrics endpoint.
    pub fn status_summary(&self) -> HashMap<String, usize> {
        let sessions = self.sessions.read().unwrap();
        let mut counts = HashMap::new();
        for entry in sessions.values() {
            *counts.entry(entry.status.as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        let registry = SessionRegistry::new();
        registry.register("s1", 10).unwrap();
        assert_eq!(registry.status("s1"), Some(SessionStatus::Idle));

        registry.set_status("s1", SessionStatus::Connecting);
        registry.set_status("s1", SessionStatus::Connected);
        assert_eq!(registry.status("s1"), Some(SessionStatus::Connected));

        assert!(registry.remove("s1"));
        assert_eq!(registry.status("s1"), None);
        assert!(!registry.remove("s1"));
    }

    #[test]
    fn test_session_limit_enforced() {
        let registry = SessionRegistry::new();
        registry.register("s1", 2).unwrap();
        registry.register("s2", 2).unwrap();
        assert!(registry.register("s3", 2).is_err());

        registry.remove("s1");
        assert!(registry.register("s3", 2).is_ok());
    }

    #[test]
    fn test_status_summary_counts() {
        let registry = SessionRegistry::new();
        registry.register("a", 10).unwrap();
        registry.register("b", 10).unwrap();
        registry.set_status("b", SessionStatus::Connected);

        let summary = registry.status_summary();
        assert_eq!(summary.get("idle"), Some(&1));
        assert_eq!(summary.get("connected"), Some(&1));
    }
}
