// Command dispatch contract between the bridge and a concrete driver

use async_trait::async_trait;
use serde_json::Value;

use crate::capabilities::{CapabilityMap, ConstraintSchema};
use crate::core::errors::BridgeError;
use crate::routing::MethodMap;

/// A concrete automation driver plugged into the bridge.
///
/// The bridge owns negotiation, routing, and the proxy decision; the
/// driver owns command business logic. Implementations must be cheap to
/// share across concurrent requests (`Arc<dyn Driver>`).
#[async_trait]
pub trait Driver: Send + Sync {
    /// Constraint schema incoming capabilities are validated against.
    /// Supplied once at construction; the bridge treats it as immutable.
    fn constraint_schema(&self) -> &ConstraintSchema;

    /// Driver-specific extension commands, merged over the base method
    /// map with override semantics.
    fn extension_method_map(&self) -> MethodMap {
        MethodMap::new()
    }

    /// Called after negotiation succeeds and the session is registered.
    async fn on_session_created(
        &self,
        _session_id: &str,
        _capabilities: &CapabilityMap,
    ) -> Result<(), BridgeError> {
        Ok(())
    }

    /// Called after a session is removed from the registry.
    async fn on_session_deleted(&self, _session_id: &str) -> Result<(), BridgeError> {
        Ok(())
    }

    /// Execute a command locally. `params` carries the validated body
    /// parameters merged with the route's named path segments.
    async fn execute(
        &self,
        session_id: Option<&str>,
        command: &str,
        params: Value,
    ) -> Result<Value, BridgeError>;
}
