// Declarative command-to-route mapping
//
// The base map is fixed; drivers contribute an extension map whose entries
// override base entries with the same command name.

use axum::http::Method;
use std::collections::BTreeMap;

/// Declarative description of one command's HTTP binding.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub http_method: Method,
    pub url_pattern: String,
    pub required_params: Vec<String>,
    pub optional_params: Vec<String>,
}

impl RouteSpec {
    pub fn new(http_method: Method, url_pattern: impl Into<String>) -> Self {
        Self {
            http_method,
            url_pattern: url_pattern.into(),
            required_params: Vec::new(),
            optional_params: Vec::new(),
        }
    }

    pub fn require(mut self, params: &[&str]) -> Self {
        self.required_params = params.iter().map(|p| (*p).to_string()).collect();
        self
    }

    pub fn optional(mut self, params: &[&str]) -> Self {
        self.optional_params = params.iter().map(|p| (*p).to_string()).collect();
        self
    }
}

/// Mapping from command name to route spec. Ordered so the derived route
/// table is deterministic.
#[derive(Debug, Clone, Default)]
pub struct MethodMap {
    entries: BTreeMap<String, RouteSpec>,
}

impl MethodMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, command: impl Into<String>, spec: RouteSpec) {
        self.entries.insert(command.into(), spec);
    }

    pub fn command(mut self, command: impl Into<String>, spec: RouteSpec) -> Self {
        self.insert(command, spec);
        self
    }

    pub fn get(&self, command: &str) -> Option<&RouteSpec> {
        self.entries.get(command)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RouteSpec)> {
        self.entries.iter()
    }

    /// Merge `extension` into this map; extension entries overwrite or
    /// insert per command name (last-writer-wins).
    pub fn merge(mut self, extension: &MethodMap) -> Self {
        for (command, spec) in extension.iter() {
            self.entries.insert(command.clone(), spec.clone());
        }
        self
    }
}

/// The fixed base method map every driver starts from.
pub fn base_method_map() -> MethodMap {
    MethodMap::new()
        .command("status", RouteSpec::new(Method::GET, "/status"))
        .command("newSession", RouteSpec::new(Method::POST, "/session"))
        .command(
            "deleteSession",
            RouteSpec::new(Method::DELETE, "/session/:sessionId"),
        )
        .command(
            "getTimeouts",
            RouteSpec::new(Method::GET, "/session/:sessionId/timeouts"),
        )
        .command(
            "setTimeouts",
            RouteSpec::new(Method::POST, "/session/:sessionId/timeouts")
                .optional(&["script", "pageLoad", "implicit"]),
        )
        .command(
            "getUrl",
            RouteSpec::new(Method::GET, "/session/:sessionId/url"),
        )
        .command(
            "setUrl",
            RouteSpec::new(Method::POST, "/session/:sessionId/url").require(&["url"]),
        )
        .command(
            "back",
            RouteSpec::new(Method::POST, "/session/:sessionId/back"),
        )
        .command(
            "forward",
            RouteSpec::new(Method::POST, "/session/:sessionId/forward"),
        )
        .command(
            "refresh",
            RouteSpec::new(Method::POST, "/session/:sessionId/refresh"),
        )
        .command(
            "getTitle",
            RouteSpec::new(Method::GET, "/session/:sessionId/title"),
        )
        .command(
            "findElement",
            RouteSpec::new(Method::POST, "/session/:sessionId/element")
                .require(&["using", "value"]),
        )
        .command(
            "findElements",
            RouteSpec::new(Method::POST, "/session/:sessionId/elements")
                .require(&["using", "value"]),
        )
        .command(
            "click",
            RouteSpec::new(Method::POST, "/session/:sessionId/element/:elementId/click"),
        )
        .command(
            "clear",
            RouteSpec::new(Method::POST, "/session/:sessionId/element/:elementId/clear"),
        )
        .command(
            "setValue",
            RouteSpec::new(Method::POST, "/session/:sessionId/element/:elementId/value")
                .require(&["text"]),
        )
        .command(
            "getText",
            RouteSpec::new(Method::GET, "/session/:sessionId/element/:elementId/text"),
        )
        .command(
            "getAttribute",
            RouteSpec::new(
                Method::GET,
                "/session/:sessionId/element/:elementId/attribute/:name",
            ),
        )
        .command(
            "getScreenshot",
            RouteSpec::new(Method::GET, "/session/:sessionId/screenshot"),
        )
        .command(
            "getElementScreenshot",
            RouteSpec::new(
                Method::GET,
                "/session/:sessionId/element/:elementId/screenshot",
            ),
        )
        .command(
            "execute",
            RouteSpec::new(Method::POST, "/session/:sessionId/execute/sync")
                .require(&["script", "args"]),
        )
        .command(
            "executeAsync",
            RouteSpec::new(Method::POST, "/session/:sessionId/execute/async")
                .require(&["script", "args"]),
        )
        .command(
            "logCustomEvent",
            RouteSpec::new(Method::POST, "/session/:sessionId/events")
                .require(&["vendor", "event"]),
        )
        .command(
            "getLogEvents",
            RouteSpec::new(Method::GET, "/session/:sessionId/events"),
        )
}
