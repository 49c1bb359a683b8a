// Route table construction: validated once at startup, read-only afterwards

use axum::http::Method;
use std::sync::Arc;

use crate::core::errors::BridgeError;
use crate::routing::method_map::{MethodMap, RouteSpec};

/// HTTP methods the wire protocol uses. Anything else in a route spec is a
/// build-time error.
pub const SUPPORTED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::DELETE];

/// One concrete route: a command bound to a pattern the web framework can
/// register. `pattern` is the unprefixed spec pattern (avoided-route
/// predicates match on it); `full_pattern` carries the base-path prefix.
#[derive(Debug, Clone)]
pub struct Route {
    pub command: String,
    pub spec: RouteSpec,
    pub pattern: String,
    pub full_pattern: String,
}

impl Route {
    pub fn http_method(&self) -> &Method {
        &self.spec.http_method
    }
}

/// Ordered, immutable set of concrete routes derived 1:1 from a merged
/// method map.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn find(&self, command: &str) -> Option<&Arc<Route>> {
        self.routes.iter().find(|r| r.command == command)
    }
}

/// Compile the base and extension method maps into a route table.
///
/// Extension entries override base entries per command name. Every spec is
/// validated here so an unusable route aborts startup instead of surfacing
/// at request time.
pub fn build_routes(
    base: MethodMap,
    extension: &MethodMap,
    base_path: &str,
) -> Result<RouteTable, BridgeError> {
    let merged = base.merge(extension);
    let prefix = normalize_base_path(base_path);

    let mut routes = Vec::with_capacity(merged.len());
    for (command, spec) in merged.iter() {
        validate_spec(command, spec)?;
        let full_pattern = format!("{prefix}{}", spec.url_pattern);
        routes.push(Arc::new(Route {
            command: command.clone(),
            spec: spec.clone(),
            pattern: spec.url_pattern.clone(),
            full_pattern,
        }));
    }

    Ok(RouteTable { routes })
}

fn validate_spec(command: &str, spec: &RouteSpec) -> Result<(), BridgeError> {
    if !SUPPORTED_METHODS.contains(&spec.http_method) {
        return Err(BridgeError::InvalidRouteSpec {
            command: command.to_string(),
            reason: format!("unsupported HTTP method {}", spec.http_method),
        });
    }
    if spec.url_pattern.is_empty() {
        return Err(BridgeError::InvalidRouteSpec {
            command: command.to_string(),
            reason: "empty url pattern".to_string(),
        });
    }
    if !spec.url_pattern.starts_with('/') {
        return Err(BridgeError::InvalidRouteSpec {
            command: command.to_string(),
            reason: format!("url pattern '{}' must start with '/'", spec.url_pattern),
        });
    }
    Ok(())
}

/// Normalize a base path: strip trailing slashes, ensure a single leading
/// slash, collapse empty/`/`-only input to the empty string. Idempotent.
pub fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
