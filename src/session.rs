// In-process session registry
//
// Owns the negotiated capability set, the dialect tag, the per-session
// proxy configuration, and the append-only event log. Dispatch reads a
// snapshot per request and never mutates it mid-flight.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::capabilities::{CapabilityMap, Dialect};
use crate::core::errors::BridgeError;
use crate::dispatch::ProxyConfig;

/// One entry of the append-only per-session event log.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub vendor: String,
    pub event: String,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    dialect: Dialect,
    capabilities: CapabilityMap,
    proxy: ProxyConfig,
    events: Vec<LogEvent>,
}

/// Immutable per-request view of one session.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub dialect: Dialect,
    pub capabilities: CapabilityMap,
    pub proxy: ProxyConfig,
}

/// Registry of active sessions. The only mutable shared structure in the
/// bridge; everything behind a single lock, snapshots cloned out.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly negotiated session and return its id.
    pub fn create(&self, dialect: Dialect, capabilities: CapabilityMap) -> String {
        let session_id = Uuid::new_v4().to_string();
        let entry = SessionEntry {
            dialect,
            capabilities,
            proxy: ProxyConfig::default(),
            events: Vec::new(),
        };
        self.write().insert(session_id.clone(), entry);
        info!(session_id = %session_id, dialect = dialect.as_str(), "session created");
        session_id
    }

    pub fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, BridgeError> {
        let sessions = self.read();
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| BridgeError::InvalidSessionId(session_id.to_string()))?;
        Ok(SessionSnapshot {
            session_id: session_id.to_string(),
            dialect: entry.dialect,
            capabilities: entry.capabilities.clone(),
            proxy: entry.proxy.clone(),
        })
    }

    pub fn remove(&self, session_id: &str) -> Result<(), BridgeError> {
        self.write()
            .remove(session_id)
            .map(|_| info!(session_id = %session_id, "session deleted"))
            .ok_or_else(|| BridgeError::InvalidSessionId(session_id.to_string()))
    }

    /// Replace a session's proxy configuration. Takes effect for requests
    /// that snapshot after this call; in-flight requests keep their view.
    pub fn set_proxy(&self, session_id: &str, proxy: ProxyConfig) -> Result<(), BridgeError> {
        let mut sessions = self.write();
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| BridgeError::InvalidSessionId(session_id.to_string()))?;
        entry.proxy = proxy;
        Ok(())
    }

    pub fn log_event(
        &self,
        session_id: &str,
        vendor: impl Into<String>,
        event: impl Into<String>,
    ) -> Result<LogEvent, BridgeError> {
        let log_event = LogEvent {
            vendor: vendor.into(),
            event: event.into(),
            timestamp_ms: Utc::now().timestamp_millis(),
        };
        let mut sessions = self.write();
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| BridgeError::InvalidSessionId(session_id.to_string()))?;
        entry.events.push(log_event.clone());
        Ok(log_event)
    }

    pub fn events(&self, session_id: &str) -> Result<Vec<LogEvent>, BridgeError> {
        let sessions = self.read();
        sessions
            .get(session_id)
            .map(|e| e.events.clone())
            .ok_or_else(|| BridgeError::InvalidSessionId(session_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
