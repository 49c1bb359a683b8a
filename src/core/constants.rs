// Wire-contract constants shared across negotiation and dispatch

/// Body key under which the W3C dialect carries an element reference.
pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Body key under which the legacy dialect carries an element reference.
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Identifier prefix marking a synthetic image element. Image elements are
/// materialized locally by the driver and must never be forwarded upstream.
pub const IMAGE_ELEMENT_PREFIX: &str = "elem-img-";

/// Capability namespace reserved for the bridge itself. Unknown capabilities
/// under this prefix are rejected during negotiation; every other unknown
/// key passes through untouched.
pub const RESERVED_CAPABILITY_PREFIX: &str = "bridge:";

/// Path parameter name used by route patterns for the session identifier.
pub const SESSION_ID_PARAM: &str = "sessionId";

/// Environment variable names understood by `Config::from_env`.
pub mod env {
    pub const BIND_ADDRESS: &str = "BIND_ADDRESS";
    pub const PORT: &str = "PORT";
    pub const BASE_PATH: &str = "BASE_PATH";
    pub const CORS_ENABLED: &str = "CORS_ENABLED";
    pub const KEEP_ALIVE_SECS: &str = "KEEP_ALIVE_SECS";
    pub const REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";
    pub const BODY_SIZE_LIMIT_BYTES: &str = "BODY_SIZE_LIMIT_BYTES";
    pub const PROXY_TIMEOUT_SECS: &str = "PROXY_TIMEOUT_SECS";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}
