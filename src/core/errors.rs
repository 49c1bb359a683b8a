// Domain error types for the protocol bridge

use thiserror::Error;

/// Main error type for the bridge.
///
/// Negotiation and routing errors are deterministic functions of client
/// input or driver configuration and are never retried. Startup errors
/// (`InvalidRouteSpec`, `ServerBind`, `Configuration`) abort the process.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Capability payload matches neither accepted dialect, or both at once (HTTP 400)
    #[error("malformed capabilities: {0}")]
    MalformedCapabilities(String),

    /// A presence-required capability is absent (HTTP 400)
    #[error("missing required capability '{0}'")]
    MissingCapability(String),

    /// A capability value has the wrong runtime type (HTTP 400)
    #[error("capability '{key}' must be of type {expected}, got {actual}")]
    InvalidCapabilityType {
        key: String,
        expected: String,
        actual: String,
    },

    /// A capability value fails allowed-values or custom validation (HTTP 400)
    #[error("invalid value for capability '{key}': {reason}")]
    InvalidCapabilityValue { key: String, reason: String },

    /// No candidate in a W3C firstMatch sequence satisfies the schema (HTTP 500)
    #[error("could not create session: no matching capabilities ({0})")]
    NoMatchingCapabilities(String),

    /// A route spec is unusable; raised at build time, fatal at startup
    #[error("invalid route spec for command '{command}': {reason}")]
    InvalidRouteSpec { command: String, reason: String },

    /// Listener bind failure; fatal at startup, never retried
    #[error("failed to bind {addr}: {source}")]
    ServerBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Request references a session the registry does not know (HTTP 404)
    #[error("no active session with id '{0}'")]
    InvalidSessionId(String),

    /// Request matched no command route (HTTP 404)
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A required parameter from the route spec is absent from the body (HTTP 400)
    #[error("command '{command}' requires parameter '{param}'")]
    MissingParameter { command: String, param: String },

    /// The request body is not valid JSON (HTTP 400)
    #[error("invalid request body: {0}")]
    InvalidRequestBody(String),

    /// Forwarding to the upstream proxy failed (HTTP 502)
    #[error("upstream proxy error: {0}")]
    UpstreamProxy(String),

    /// The driver reported a command failure (HTTP 500)
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// Configuration error (startup, fatal)
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl BridgeError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            BridgeError::MalformedCapabilities(_)
            | BridgeError::MissingCapability(_)
            | BridgeError::InvalidCapabilityType { .. }
            | BridgeError::InvalidCapabilityValue { .. }
            | BridgeError::MissingParameter { .. }
            | BridgeError::InvalidRequestBody(_) => 400,
            BridgeError::InvalidSessionId(_) | BridgeError::UnknownCommand(_) => 404,
            BridgeError::UpstreamProxy(_) => 502,
            BridgeError::NoMatchingCapabilities(_)
            | BridgeError::InvalidRouteSpec { .. }
            | BridgeError::ServerBind { .. }
            | BridgeError::CommandFailed(_)
            | BridgeError::Configuration(_) => 500,
        }
    }

    /// W3C wire error code string for the response envelope.
    pub fn error_code(&self) -> &'static str {
        match self {
            BridgeError::MalformedCapabilities(_)
            | BridgeError::MissingCapability(_)
            | BridgeError::InvalidCapabilityType { .. }
            | BridgeError::InvalidCapabilityValue { .. }
            | BridgeError::MissingParameter { .. }
            | BridgeError::InvalidRequestBody(_) => "invalid argument",
            BridgeError::NoMatchingCapabilities(_) => "session not created",
            BridgeError::InvalidSessionId(_) => "invalid session id",
            BridgeError::UnknownCommand(_) => "unknown command",
            BridgeError::UpstreamProxy(_)
            | BridgeError::InvalidRouteSpec { .. }
            | BridgeError::ServerBind { .. }
            | BridgeError::CommandFailed(_)
            | BridgeError::Configuration(_) => "unknown error",
        }
    }

    /// Legacy-dialect numeric status for the response envelope.
    pub fn legacy_status(&self) -> u16 {
        match self {
            BridgeError::MalformedCapabilities(_)
            | BridgeError::MissingCapability(_)
            | BridgeError::InvalidCapabilityType { .. }
            | BridgeError::InvalidCapabilityValue { .. }
            | BridgeError::NoMatchingCapabilities(_) => 33, // session not created
            BridgeError::InvalidSessionId(_) => 6, // no such driver
            BridgeError::UnknownCommand(_) => 9,
            _ => 13, // unknown error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            BridgeError::MalformedCapabilities("x".to_string()).status_code(),
            400
        );
        assert_eq!(
            BridgeError::MissingCapability("platformName".to_string()).status_code(),
            400
        );
        assert_eq!(
            BridgeError::NoMatchingCapabilities("none".to_string()).status_code(),
            500
        );
        assert_eq!(
            BridgeError::InvalidSessionId("abc".to_string()).status_code(),
            404
        );
        assert_eq!(
            BridgeError::UpstreamProxy("refused".to_string()).status_code(),
            502
        );
    }

    #[test]
    fn test_error_codes_match_dialect_contract() {
        assert_eq!(
            BridgeError::MissingCapability("k".to_string()).error_code(),
            "invalid argument"
        );
        assert_eq!(
            BridgeError::NoMatchingCapabilities("n".to_string()).error_code(),
            "session not created"
        );
        assert_eq!(
            BridgeError::InvalidSessionId("s".to_string()).error_code(),
            "invalid session id"
        );
        assert_eq!(
            BridgeError::UnknownCommand("c".to_string()).legacy_status(),
            9
        );
    }

    #[test]
    fn test_messages_name_the_offending_key() {
        let err = BridgeError::InvalidCapabilityType {
            key: "platformName".to_string(),
            expected: "string".to_string(),
            actual: "42".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("platformName"));
        assert!(msg.contains("string"));
        assert!(msg.contains("42"));
    }
}
