// Driver-declared constraint schema for capability validation

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Runtime kind a capability value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    String,
    Boolean,
    Number,
    Array,
    Object,
}

impl CapabilityKind {
    /// Check a JSON value against this kind.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            CapabilityKind::String => value.is_string(),
            CapabilityKind::Boolean => value.is_boolean(),
            CapabilityKind::Number => value.is_number(),
            CapabilityKind::Array => value.is_array(),
            CapabilityKind::Object => value.is_object(),
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CapabilityKind::String => "string",
            CapabilityKind::Boolean => "boolean",
            CapabilityKind::Number => "number",
            CapabilityKind::Array => "array",
            CapabilityKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// Custom predicate attached to a constraint. Returns a rejection reason
/// on failure.
pub type CustomValidator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Constraint descriptor for one capability name.
#[derive(Clone)]
pub struct Constraint {
    pub presence_required: bool,
    pub kind: CapabilityKind,
    pub allowed_values: Option<Vec<Value>>,
    pub custom: Option<CustomValidator>,
}

impl Constraint {
    pub fn new(kind: CapabilityKind) -> Self {
        Self {
            presence_required: false,
            kind,
            allowed_values: None,
            custom: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.presence_required = true;
        self
    }

    pub fn allowed(mut self, values: Vec<Value>) -> Self {
        self.allowed_values = Some(values);
        self
    }

    pub fn custom<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(validator));
        self
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("presence_required", &self.presence_required)
            .field("kind", &self.kind)
            .field("allowed_values", &self.allowed_values)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

/// Declarative description of every capability a driver accepts.
/// Supplied once at driver construction; immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSchema {
    constraints: HashMap<String, Constraint>,
}

impl ConstraintSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a constraint for a capability name.
    pub fn constrain(mut self, name: impl Into<String>, constraint: Constraint) -> Self {
        self.constraints.insert(name.into(), constraint);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Constraint> {
        self.constraints.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Constraint)> {
        self.constraints.iter()
    }

    /// Names of all presence-required capabilities.
    pub fn required_keys(&self) -> impl Iterator<Item = &String> {
        self.constraints
            .iter()
            .filter(|(_, c)| c.presence_required)
            .map(|(k, _)| k)
    }
}
