// Request dispatch
//
// One handler services every route in the table. Session-lifecycle and
// event-log commands are always executed locally; everything else runs
// through the proxy filter first.

use axum::body::Bytes;
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::capabilities::{detect_dialect, negotiate, Dialect};
use crate::core::constants::SESSION_ID_PARAM;
use crate::core::errors::BridgeError;
use crate::dispatch::client::ForwardedResponse;
use crate::dispatch::{should_proxy, ProxyConfig, ProxyContext};
use crate::routing::Route;
use crate::server::responses::{
    error_response, forwarded_response, session_created_response, success_response,
};
use crate::server::AppState;

/// Entry point for every registered route.
pub async fn dispatch(
    state: Arc<AppState>,
    route: Arc<Route>,
    path_params: HashMap<String, String>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    info!(
        request_id = %request_id,
        command = %route.command,
        path = %uri.path(),
        "dispatching command"
    );

    let body_value = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(v) => v,
            Err(e) => {
                return error_response(
                    Dialect::W3c,
                    None,
                    &BridgeError::InvalidRequestBody(e.to_string()),
                )
            }
        }
    };

    let session_id = path_params.get(SESSION_ID_PARAM).cloned();

    match route.command.as_str() {
        "status" => handle_status(&state),
        "newSession" => handle_new_session(&state, &body_value).await,
        "deleteSession" => handle_delete_session(&state, session_id.as_deref()).await,
        "logCustomEvent" => handle_log_event(&state, &route, session_id.as_deref(), &body_value),
        "getLogEvents" => handle_get_events(&state, session_id.as_deref()),
        _ => {
            handle_command(
                &state,
                &route,
                session_id.as_deref(),
                &path_params,
                &uri,
                body_value,
                body,
            )
            .await
        }
    }
}

fn handle_status(state: &AppState) -> Response {
    let value = json!({
        "ready": true,
        "message": "bridge is ready",
        "build": { "version": env!("CARGO_PKG_VERSION") },
        "sessions": state.sessions.len(),
    });
    success_response(Dialect::W3c, None, value)
}

async fn handle_new_session(state: &AppState, body: &Value) -> Response {
    // On failure, answer in the dialect the payload tried to speak; a
    // payload too malformed to classify gets the standard envelope.
    let error_dialect = detect_dialect(body).unwrap_or(Dialect::W3c);

    let negotiated = match negotiate(body, state.driver.constraint_schema()) {
        Ok(n) => n,
        Err(err) => {
            warn!(error = %err, "session negotiation failed");
            return error_response(error_dialect, None, &err);
        }
    };

    let session_id = state
        .sessions
        .create(negotiated.dialect, negotiated.capabilities.clone());

    if let Err(err) = state
        .driver
        .on_session_created(&session_id, &negotiated.capabilities)
        .await
    {
        warn!(session_id = %session_id, error = %err, "driver rejected new session");
        let _ = state.sessions.remove(&session_id);
        return error_response(negotiated.dialect, None, &err);
    }

    session_created_response(negotiated.dialect, &session_id, &negotiated.capabilities)
}

async fn handle_delete_session(state: &AppState, session_id: Option<&str>) -> Response {
    let sid = match session_id {
        Some(s) => s,
        None => {
            return error_response(
                Dialect::W3c,
                None,
                &BridgeError::InvalidSessionId(String::new()),
            )
        }
    };
    let snapshot = match state.sessions.snapshot(sid) {
        Ok(s) => s,
        Err(err) => return error_response(Dialect::W3c, Some(sid), &err),
    };
    if let Err(err) = state.sessions.remove(sid) {
        return error_response(snapshot.dialect, Some(sid), &err);
    }
    if let Err(err) = state.driver.on_session_deleted(sid).await {
        warn!(session_id = %sid, error = %err, "driver cleanup failed after session removal");
        return error_response(snapshot.dialect, Some(sid), &err);
    }
    success_response(snapshot.dialect, Some(sid), Value::Null)
}

fn handle_log_event(
    state: &AppState,
    route: &Route,
    session_id: Option<&str>,
    body: &Value,
) -> Response {
    let (sid, snapshot) = match resolve_session(state, session_id) {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    let params = match build_params(route, body, &HashMap::new()) {
        Ok(p) => p,
        Err(err) => return error_response(snapshot.dialect, Some(&sid), &err),
    };

    let vendor = params.get("vendor").and_then(Value::as_str);
    let event = params.get("event").and_then(Value::as_str);
    let (vendor, event) = match (vendor, event) {
        (Some(v), Some(e)) => (v, e),
        _ => {
            let err =
                BridgeError::InvalidRequestBody("'vendor' and 'event' must be strings".to_string());
            return error_response(snapshot.dialect, Some(&sid), &err);
        }
    };

    match state.sessions.log_event(&sid, vendor, event) {
        Ok(_) => success_response(snapshot.dialect, Some(&sid), Value::Null),
        Err(err) => error_response(snapshot.dialect, Some(&sid), &err),
    }
}

fn handle_get_events(state: &AppState, session_id: Option<&str>) -> Response {
    let (sid, snapshot) = match resolve_session(state, session_id) {
        Ok(pair) => pair,
        Err(response) => return response,
    };
    match state.sessions.events(&sid) {
        Ok(events) => {
            let value = serde_json::to_value(&events).unwrap_or_default();
            success_response(snapshot.dialect, Some(&sid), value)
        }
        Err(err) => error_response(snapshot.dialect, Some(&sid), &err),
    }
}

async fn handle_command(
    state: &AppState,
    route: &Route,
    session_id: Option<&str>,
    path_params: &HashMap<String, String>,
    uri: &Uri,
    body_value: Value,
    raw_body: Bytes,
) -> Response {
    // Extension routes without a session segment execute locally with no
    // session context.
    let snapshot = match session_id {
        Some(sid) => match state.sessions.snapshot(sid) {
            Ok(s) => Some(s),
            Err(err) => return error_response(Dialect::W3c, Some(sid), &err),
        },
        None => None,
    };
    let dialect = snapshot.as_ref().map(|s| s.dialect).unwrap_or(Dialect::W3c);

    if let Some(snapshot) = &snapshot {
        let ctx = ProxyContext::from_config(&snapshot.proxy, uri.path(), body_value.clone());
        if should_proxy(route, &ctx) {
            return match forward_upstream(state, route, &snapshot.proxy, uri, raw_body).await {
                Ok(upstream) => forwarded_response(upstream),
                Err(err) => error_response(dialect, session_id, &err),
            };
        }
    }

    let params = match build_params(route, &body_value, path_params) {
        Ok(p) => p,
        Err(err) => return error_response(dialect, session_id, &err),
    };

    match state
        .driver
        .execute(session_id, &route.command, Value::Object(params))
        .await
    {
        Ok(value) => success_response(dialect, session_id, value),
        Err(err) => {
            warn!(command = %route.command, error = %err, "command execution failed");
            error_response(dialect, session_id, &err)
        }
    }
}

async fn forward_upstream(
    state: &AppState,
    route: &Route,
    proxy: &ProxyConfig,
    uri: &Uri,
    body: Bytes,
) -> Result<ForwardedResponse, BridgeError> {
    let base = proxy.upstream_url.as_deref().ok_or_else(|| {
        BridgeError::UpstreamProxy("proxy is active but no upstream url is configured".to_string())
    })?;
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let target = format!("{}{}", base.trim_end_matches('/'), path_and_query);
    let target = url::Url::parse(&target)
        .map_err(|e| BridgeError::UpstreamProxy(format!("invalid upstream target '{target}': {e}")))?;
    debug!(target = %target, "forwarding to upstream");
    state
        .proxy_client
        .forward(route.http_method(), target.as_str(), body.to_vec())
        .await
}

/// Look up a session and produce the error response inline when it is
/// missing, so callers can use `?`-like early returns.
fn resolve_session(
    state: &AppState,
    session_id: Option<&str>,
) -> Result<(String, crate::session::SessionSnapshot), Response> {
    let sid = session_id.ok_or_else(|| {
        error_response(
            Dialect::W3c,
            None,
            &BridgeError::InvalidSessionId(String::new()),
        )
    })?;
    let snapshot = state
        .sessions
        .snapshot(sid)
        .map_err(|err| error_response(Dialect::W3c, Some(sid), &err))?;
    Ok((sid.to_string(), snapshot))
}

/// Merge the JSON body with the route's named path segments and enforce
/// the spec's required parameters.
fn build_params(
    route: &Route,
    body: &Value,
    path_params: &HashMap<String, String>,
) -> Result<Map<String, Value>, BridgeError> {
    let mut params = match body {
        Value::Null => Map::new(),
        Value::Object(map) => map.clone(),
        _ => {
            return Err(BridgeError::InvalidRequestBody(
                "request body must be a JSON object".to_string(),
            ))
        }
    };

    for required in &route.spec.required_params {
        let present = params.get(required).map(|v| !v.is_null()).unwrap_or(false);
        if !present {
            return Err(BridgeError::MissingParameter {
                command: route.command.clone(),
                param: required.clone(),
            });
        }
    }

    // Path segments win over body keys of the same name.
    for (key, value) in path_params {
        if key != SESSION_ID_PARAM {
            params.insert(key.clone(), Value::String(value.clone()));
        }
    }

    Ok(params)
}
