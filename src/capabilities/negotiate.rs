// Dialect detection and capability negotiation
//
// All dialect branching lives here: callers get a tagged `Negotiated` value
// and never re-inspect the raw payload shape.

use serde_json::{Map, Value};
use tracing::debug;

use crate::capabilities::schema::ConstraintSchema;
use crate::core::constants::RESERVED_CAPABILITY_PREFIX;
use crate::core::errors::BridgeError;

/// Flat, validated capability mapping.
pub type CapabilityMap = Map<String, Value>;

/// The two capability-negotiation dialects accepted on session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Pre-standard shape: `desiredCapabilities` / `requiredCapabilities`.
    Legacy,
    /// Standard shape: `capabilities.alwaysMatch` / `capabilities.firstMatch`.
    W3c,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Legacy => "legacy",
            Dialect::W3c => "w3c",
        }
    }
}

/// Outcome of a successful negotiation: the resolved dialect plus the
/// validated flat capability set.
#[derive(Debug, Clone)]
pub struct Negotiated {
    pub dialect: Dialect,
    pub capabilities: CapabilityMap,
}

/// Resolve which dialect a session-creation payload speaks.
///
/// W3C wins when `capabilities` is an object containing `alwaysMatch`
/// and/or `firstMatch` (the values may be empty, the container key must
/// exist). A payload carrying both a recognizable W3C container and
/// `desiredCapabilities` is ambiguous and rejected.
pub fn detect_dialect(payload: &Value) -> Result<Dialect, BridgeError> {
    let obj = payload.as_object().ok_or_else(|| {
        BridgeError::MalformedCapabilities("session request body must be a JSON object".to_string())
    })?;

    let has_w3c_container = obj
        .get("capabilities")
        .and_then(Value::as_object)
        .map(|caps| caps.contains_key("alwaysMatch") || caps.contains_key("firstMatch"))
        .unwrap_or(false);
    let has_legacy = obj.contains_key("desiredCapabilities");

    match (has_w3c_container, has_legacy) {
        (true, true) => Err(BridgeError::MalformedCapabilities(
            "payload carries both desiredCapabilities and a W3C capabilities container"
                .to_string(),
        )),
        (true, false) => Ok(Dialect::W3c),
        (false, true) => Ok(Dialect::Legacy),
        (false, false) => Err(BridgeError::MalformedCapabilities(
            "expected desiredCapabilities or capabilities.alwaysMatch/firstMatch".to_string(),
        )),
    }
}

/// Negotiate a session-creation payload against a driver's constraint
/// schema. Pure function of its inputs; no side effects beyond the result.
pub fn negotiate(payload: &Value, schema: &ConstraintSchema) -> Result<Negotiated, BridgeError> {
    let dialect = detect_dialect(payload)?;
    debug!(dialect = dialect.as_str(), "resolved capability dialect");

    match dialect {
        Dialect::Legacy => {
            let obj = payload.as_object().expect("checked by detect_dialect");
            let desired = require_object(obj.get("desiredCapabilities"), "desiredCapabilities")?;
            let required = match obj.get("requiredCapabilities") {
                Some(v) => require_object(Some(v), "requiredCapabilities")?,
                None => Map::new(),
            };
            // Required keys take precedence on conflict; no candidate search.
            let candidate = merge_over(&desired, &required);
            let capabilities = validate_candidate(candidate, schema)?;
            Ok(Negotiated {
                dialect,
                capabilities,
            })
        }
        Dialect::W3c => {
            let caps = payload
                .as_object()
                .and_then(|o| o.get("capabilities"))
                .and_then(Value::as_object)
                .expect("checked by detect_dialect");

            let always_match = match caps.get("alwaysMatch") {
                Some(v) => require_object(Some(v), "capabilities.alwaysMatch")?,
                None => Map::new(),
            };
            let first_match = first_match_deltas(caps.get("firstMatch"))?;

            // First candidate (in array order) that satisfies every
            // constraint wins, even if a later one would also satisfy it.
            let mut failures: Vec<BridgeError> = Vec::new();
            for delta in &first_match {
                let candidate = merge_over(&always_match, delta);
                match validate_candidate(candidate, schema) {
                    Ok(capabilities) => {
                        return Ok(Negotiated {
                            dialect,
                            capabilities,
                        })
                    }
                    Err(err) => failures.push(err),
                }
            }

            // A lone candidate surfaces its specific error; a multi-candidate
            // search that exhausted every option is the terminal outcome.
            if failures.len() == 1 {
                Err(failures.remove(0))
            } else {
                let reasons = failures
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(BridgeError::NoMatchingCapabilities(reasons))
            }
        }
    }
}

/// Parse `firstMatch` into a sequence of delta objects. An empty or absent
/// sequence is treated as a single empty delta.
fn first_match_deltas(value: Option<&Value>) -> Result<Vec<CapabilityMap>, BridgeError> {
    let entries = match value {
        None | Some(Value::Null) => return Ok(vec![Map::new()]),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(BridgeError::MalformedCapabilities(format!(
                "capabilities.firstMatch must be an array, got {other}"
            )))
        }
    };
    if entries.is_empty() {
        return Ok(vec![Map::new()]);
    }
    entries
        .iter()
        .map(|entry| {
            entry.as_object().cloned().ok_or_else(|| {
                BridgeError::MalformedCapabilities(format!(
                    "capabilities.firstMatch entries must be objects, got {entry}"
                ))
            })
        })
        .collect()
}

fn require_object(value: Option<&Value>, what: &str) -> Result<CapabilityMap, BridgeError> {
    match value {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(BridgeError::MalformedCapabilities(format!(
            "{what} must be an object, got {other}"
        ))),
        None => Err(BridgeError::MalformedCapabilities(format!(
            "{what} is missing"
        ))),
    }
}

/// Merge `delta` over `base`; delta keys win on conflict.
fn merge_over(base: &CapabilityMap, delta: &CapabilityMap) -> CapabilityMap {
    let mut merged = base.clone();
    for (key, value) in delta {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Validate one flat candidate key-by-key against the schema.
///
/// `null` values are treated as absent. Keys not declared in the schema
/// pass through unchanged unless they sit in the reserved namespace.
fn validate_candidate(
    candidate: CapabilityMap,
    schema: &ConstraintSchema,
) -> Result<CapabilityMap, BridgeError> {
    let mut validated = CapabilityMap::new();

    for (key, value) in candidate {
        if value.is_null() {
            continue;
        }
        match schema.get(&key) {
            Some(constraint) => {
                if !constraint.kind.matches(&value) {
                    return Err(BridgeError::InvalidCapabilityType {
                        key,
                        expected: constraint.kind.to_string(),
                        actual: value.to_string(),
                    });
                }
                if let Some(allowed) = &constraint.allowed_values {
                    if !allowed.contains(&value) {
                        let allowed = allowed
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ");
                        return Err(BridgeError::InvalidCapabilityValue {
                            key,
                            reason: format!("{value} is not one of [{allowed}]"),
                        });
                    }
                }
                if let Some(custom) = &constraint.custom {
                    if let Err(reason) = custom(&value) {
                        return Err(BridgeError::InvalidCapabilityValue { key, reason });
                    }
                }
            }
            None => {
                if key.starts_with(RESERVED_CAPABILITY_PREFIX) {
                    return Err(BridgeError::InvalidCapabilityValue {
                        key,
                        reason: format!(
                            "capability namespace '{RESERVED_CAPABILITY_PREFIX}' is reserved"
                        ),
                    });
                }
                // Unknown vendor/extension capability: pass through unchanged.
            }
        }
        validated.insert(key, value);
    }

    for required in schema.required_keys() {
        if !validated.contains_key(required) {
            return Err(BridgeError::MissingCapability(required.clone()));
        }
    }

    Ok(validated)
}
