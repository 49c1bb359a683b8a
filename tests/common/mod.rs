// Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use autobridge::capabilities::{CapabilityKind, Constraint, ConstraintSchema};
use autobridge::config::Config;
use autobridge::core::errors::BridgeError;
use autobridge::dispatch::client::{ForwardedResponse, ProxyClient};
use autobridge::driver::Driver;
use autobridge::routing::{base_method_map, build_routes, MethodMap};
use autobridge::server::{build_router, AppState};
use autobridge::session::SessionRegistry;

/// Driver that accepts `platformName`-based sessions and records every
/// executed command.
pub struct FixtureDriver {
    schema: ConstraintSchema,
    extension: MethodMap,
    pub executed: Mutex<Vec<ExecutedCommand>>,
}

#[derive(Debug, Clone)]
pub struct ExecutedCommand {
    pub session_id: Option<String>,
    pub command: String,
    pub params: Value,
}

impl FixtureDriver {
    pub fn new() -> Self {
        let schema = ConstraintSchema::new()
            .constrain(
                "platformName",
                Constraint::new(CapabilityKind::String).required(),
            )
            .constrain("automationName", Constraint::new(CapabilityKind::String))
            .constrain(
                "deviceKind",
                Constraint::new(CapabilityKind::String)
                    .allowed(vec![json!("phone"), json!("tablet")]),
            );
        Self {
            schema,
            extension: MethodMap::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_extension(mut self, extension: MethodMap) -> Self {
        self.extension = extension;
        self
    }

    pub fn executed_commands(&self) -> Vec<ExecutedCommand> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Driver for FixtureDriver {
    fn constraint_schema(&self) -> &ConstraintSchema {
        &self.schema
    }

    fn extension_method_map(&self) -> MethodMap {
        self.extension.clone()
    }

    async fn execute(
        &self,
        session_id: Option<&str>,
        command: &str,
        params: Value,
    ) -> Result<Value, BridgeError> {
        self.executed.lock().unwrap().push(ExecutedCommand {
            session_id: session_id.map(ToString::to_string),
            command: command.to_string(),
            params: params.clone(),
        });
        Ok(json!({ "command": command, "params": params }))
    }
}

/// Proxy client that records forwards and answers with a canned response.
pub struct RecordingProxyClient {
    pub calls: Mutex<Vec<(String, String)>>,
    pub status: u16,
    pub response_body: Value,
}

impl RecordingProxyClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            status: 200,
            response_body: json!({ "value": "from-upstream" }),
        }
    }

    pub fn recorded_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProxyClient for RecordingProxyClient {
    async fn forward(
        &self,
        method: &Method,
        url: &str,
        _body: Vec<u8>,
    ) -> Result<ForwardedResponse, BridgeError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), url.to_string()));
        Ok(ForwardedResponse {
            status: self.status,
            body: serde_json::to_vec(&self.response_body).unwrap(),
        })
    }
}

/// Fully wired bridge with handles to its collaborators.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub driver: Arc<FixtureDriver>,
    pub proxy: Arc<RecordingProxyClient>,
}

pub fn test_app() -> TestApp {
    test_app_with(FixtureDriver::new(), Config::default())
}

pub fn test_app_with(driver: FixtureDriver, config: Config) -> TestApp {
    let driver = Arc::new(driver);
    let table = build_routes(
        base_method_map(),
        &driver.extension_method_map(),
        &config.base_path,
    )
    .expect("route table builds");
    let proxy = Arc::new(RecordingProxyClient::new());
    let state = Arc::new(AppState {
        driver: driver.clone(),
        sessions: SessionRegistry::new(),
        proxy_client: proxy.clone(),
    });
    let router = build_router(state.clone(), &table, &config).expect("router builds");
    TestApp {
        router,
        state,
        driver,
        proxy,
    }
}

/// Fire one request at the router and decode the JSON response.
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // Middleware rejections (e.g. the body limit) answer in plain text.
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub async fn create_w3c_session(app: &TestApp) -> String {
    let (status, body) = send(
        &app.router,
        Method::POST,
        "/session",
        Some(json!({
            "capabilities": { "alwaysMatch": { "platformName": "iOS" } }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "session creation failed: {body}");
    body["value"]["sessionId"].as_str().unwrap().to_string()
}

pub async fn create_legacy_session(app: &TestApp) -> String {
    let (status, body) = send(
        &app.router,
        Method::POST,
        "/session",
        Some(json!({
            "desiredCapabilities": { "platformName": "Android" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "session creation failed: {body}");
    body["sessionId"].as_str().unwrap().to_string()
}
