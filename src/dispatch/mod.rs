// Proxy dispatch filter: local execution vs. upstream forward
//
// The decision is total over its inputs; forwarding failures are reported
// by the proxy client, not here.

pub mod client;

use axum::http::Method;
use serde_json::Value;

use crate::core::constants::{IMAGE_ELEMENT_PREFIX, LEGACY_ELEMENT_KEY, W3C_ELEMENT_KEY};
use crate::routing::Route;

/// A route the session layer has opted out of proxying. Matches on the
/// route's unprefixed pattern so avoid lists are independent of the
/// server's base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvoidedRoute {
    pub method: Method,
    pub url_pattern: String,
}

impl AvoidedRoute {
    pub fn new(method: Method, url_pattern: impl Into<String>) -> Self {
        Self {
            method,
            url_pattern: url_pattern.into(),
        }
    }

    pub fn matches(&self, route: &Route) -> bool {
        self.method == *route.http_method() && self.url_pattern == route.pattern
    }
}

/// Proxy configuration attached to a session, read per request as an
/// immutable snapshot.
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    pub active: bool,
    pub upstream_url: Option<String>,
    pub avoided_routes: Vec<AvoidedRoute>,
}

/// Per-request transient dispatch input. Built from the session's proxy
/// snapshot at the start of dispatch; discarded after the decision.
#[derive(Debug, Clone)]
pub struct ProxyContext {
    pub proxy_active: bool,
    pub avoided_routes: Vec<AvoidedRoute>,
    pub request_url: String,
    pub request_body: Value,
}

impl ProxyContext {
    pub fn from_config(config: &ProxyConfig, request_url: impl Into<String>, body: Value) -> Self {
        Self {
            proxy_active: config.active,
            avoided_routes: config.avoided_routes.clone(),
            request_url: request_url.into(),
            request_body: body,
        }
    }
}

/// Decide whether a matched request is forwarded to the downstream proxy
/// or executed locally by the owning driver.
pub fn should_proxy(route: &Route, ctx: &ProxyContext) -> bool {
    if !ctx.proxy_active {
        return false;
    }
    if ctx.avoided_routes.iter().any(|a| a.matches(route)) {
        return false;
    }
    // Synthetic image elements are materialized locally and must never be
    // forwarded, regardless of proxy state.
    if url_references_image_element(&ctx.request_url)
        || body_references_image_element(&ctx.request_body)
    {
        return false;
    }
    true
}

/// The explicit predicate for the image-element wire contract: an
/// identifier is an image element iff it starts with the reserved prefix
/// and has a non-empty payload after it.
pub fn is_image_element(id: &str) -> bool {
    id.len() > IMAGE_ELEMENT_PREFIX.len() && id.starts_with(IMAGE_ELEMENT_PREFIX)
}

/// Check the URL path segment that denotes an element id.
fn url_references_image_element(url: &str) -> bool {
    let path = url.split('?').next().unwrap_or(url);
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    while let Some(segment) = segments.next() {
        if segment == "element" {
            if let Some(id) = segments.next() {
                return is_image_element(id);
            }
        }
    }
    false
}

/// Walk the body for element references under either dialect's element
/// key. Non-string values are ignored, not errors.
fn body_references_image_element(body: &Value) -> bool {
    match body {
        Value::Object(map) => map.iter().any(|(key, value)| {
            let is_element_ref = (key == LEGACY_ELEMENT_KEY || key == W3C_ELEMENT_KEY)
                && value.as_str().map(is_image_element).unwrap_or(false);
            is_element_ref || body_references_image_element(value)
        }),
        Value::Array(items) => items.iter().any(body_references_image_element),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::method_map::{MethodMap, RouteSpec};
    use crate::routing::{build_routes, RouteTable};
    use serde_json::json;
    use std::sync::Arc;

    fn test_table() -> RouteTable {
        let base = MethodMap::new()
            .command(
                "click",
                RouteSpec::new(Method::POST, "/session/:sessionId/element/:elementId/click"),
            )
            .command(
                "getUrl",
                RouteSpec::new(Method::GET, "/session/:sessionId/url"),
            );
        build_routes(base, &MethodMap::new(), "").unwrap()
    }

    fn click_route() -> Arc<Route> {
        test_table().find("click").unwrap().clone()
    }

    fn active_ctx(url: &str, body: Value) -> ProxyContext {
        ProxyContext {
            proxy_active: true,
            avoided_routes: Vec::new(),
            request_url: url.to_string(),
            request_body: body,
        }
    }

    #[test]
    fn test_inactive_proxy_never_forwards() {
        let route = click_route();
        let ctx = ProxyContext {
            proxy_active: false,
            avoided_routes: Vec::new(),
            request_url: "/session/abc/element/elem-img-bar/click".to_string(),
            request_body: json!({"ELEMENT": "whatever"}),
        };
        assert!(!should_proxy(&route, &ctx));
    }

    #[test]
    fn test_avoided_route_executes_locally() {
        let route = click_route();
        let mut ctx = active_ctx("/session/abc/element/e1/click", Value::Null);
        ctx.avoided_routes = vec![AvoidedRoute::new(
            Method::POST,
            "/session/:sessionId/element/:elementId/click",
        )];
        assert!(!should_proxy(&route, &ctx));
    }

    #[test]
    fn test_avoided_route_requires_matching_method() {
        let route = click_route();
        let mut ctx = active_ctx("/session/abc/element/e1/click", Value::Null);
        ctx.avoided_routes = vec![AvoidedRoute::new(
            Method::GET,
            "/session/:sessionId/element/:elementId/click",
        )];
        assert!(should_proxy(&route, &ctx));
    }

    #[test]
    fn test_w3c_element_ref_to_image_element_blocks_forwarding() {
        let route = click_route();
        let ctx = active_ctx(
            "/session/abc/element/e1/click",
            json!({"element-6066-11e4-a52e-4f735466cecf": "elem-img-bar"}),
        );
        assert!(!should_proxy(&route, &ctx));
    }

    #[test]
    fn test_legacy_element_ref_to_plain_element_forwards() {
        let route = click_route();
        let ctx = active_ctx("/session/abc/element/e1/click", json!({"ELEMENT": "bar"}));
        assert!(should_proxy(&route, &ctx));
    }

    #[test]
    fn test_image_element_in_url_blocks_forwarding() {
        let route = click_route();
        let ctx = active_ctx("/session/abc/element/elem-img-bar/click", Value::Null);
        assert!(!should_proxy(&route, &ctx));

        let ctx = active_ctx("/session/abc/element/elem123/click", Value::Null);
        assert!(should_proxy(&route, &ctx));
    }

    #[test]
    fn test_nested_element_refs_are_scanned() {
        let route = click_route();
        let ctx = active_ctx(
            "/session/abc/element/e1/click",
            json!({
                "actions": [
                    {"origin": {"element-6066-11e4-a52e-4f735466cecf": "elem-img-zone"}}
                ]
            }),
        );
        assert!(!should_proxy(&route, &ctx));
    }

    #[test]
    fn test_bare_prefix_is_not_an_image_element() {
        assert!(!is_image_element("elem-img-"));
        assert!(is_image_element("elem-img-x"));
    }

    #[test]
    fn test_prefix_must_be_leading() {
        assert!(!is_image_element("foo-elem-img-bar"));

        let route = click_route();
        let ctx = active_ctx(
            "/session/abc/element/e1/click",
            json!({"ELEMENT": "suffix-elem-img-bar"}),
        );
        assert!(should_proxy(&route, &ctx));
    }

    #[test]
    fn test_non_string_element_values_are_ignored() {
        let route = click_route();
        let ctx = active_ctx(
            "/session/abc/element/e1/click",
            json!({"ELEMENT": 42, "element-6066-11e4-a52e-4f735466cecf": {"nested": true}}),
        );
        assert!(should_proxy(&route, &ctx));
    }

    #[test]
    fn test_query_string_does_not_confuse_url_scan() {
        let route = click_route();
        let ctx = active_ctx("/session/abc/url?q=/element/elem-img-x", Value::Null);
        assert!(should_proxy(&route, &ctx));
    }

    #[test]
    fn test_from_config_snapshot() {
        let config = ProxyConfig {
            active: true,
            upstream_url: Some("http://127.0.0.1:4723".to_string()),
            avoided_routes: vec![AvoidedRoute::new(Method::GET, "/status")],
        };
        let ctx = ProxyContext::from_config(&config, "/status", Value::Null);
        assert!(ctx.proxy_active);
        assert_eq!(ctx.avoided_routes.len(), 1);
    }
}
