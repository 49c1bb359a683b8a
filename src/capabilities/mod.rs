// Capability negotiation: dialect detection, constraint validation

pub mod negotiate;
pub mod schema;

pub use negotiate::{detect_dialect, negotiate, CapabilityMap, Dialect, Negotiated};
pub use schema::{CapabilityKind, Constraint, ConstraintSchema};
