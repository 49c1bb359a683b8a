// Standalone bridge binary with a stub driver

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use autobridge::capabilities::{CapabilityKind, CapabilityMap, Constraint, ConstraintSchema};
use autobridge::config::Config;
use autobridge::core::errors::BridgeError;
use autobridge::dispatch::client::HttpProxyClient;
use autobridge::driver::Driver;
use autobridge::routing::{base_method_map, build_routes};
use autobridge::server::{build_router, start_server, AppState};
use autobridge::session::SessionRegistry;

/// Driver used when the bridge runs standalone. Real deployments link the
/// bridge as a library and supply their own `Driver` implementation; this
/// one accepts sessions and echoes commands so the wire surface can be
/// exercised end to end.
struct StubDriver {
    schema: ConstraintSchema,
}

impl StubDriver {
    fn new() -> Self {
        let schema = ConstraintSchema::new()
            .constrain(
                "platformName",
                Constraint::new(CapabilityKind::String).required(),
            )
            .constrain("automationName", Constraint::new(CapabilityKind::String))
            .constrain("newCommandTimeout", Constraint::new(CapabilityKind::Number));
        Self { schema }
    }
}

#[async_trait]
impl Driver for StubDriver {
    fn constraint_schema(&self) -> &ConstraintSchema {
        &self.schema
    }

    async fn on_session_created(
        &self,
        session_id: &str,
        capabilities: &CapabilityMap,
    ) -> Result<(), BridgeError> {
        info!(
            session_id = %session_id,
            platform = capabilities.get("platformName").and_then(serde_json::Value::as_str),
            "stub driver session started"
        );
        Ok(())
    }

    async fn execute(
        &self,
        session_id: Option<&str>,
        command: &str,
        params: Value,
    ) -> Result<Value, BridgeError> {
        Ok(json!({
            "command": command,
            "sessionId": session_id,
            "params": params,
        }))
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        base_path = %config.base_path,
        "starting autobridge"
    );

    let driver: Arc<dyn Driver> = Arc::new(StubDriver::new());

    let route_table = build_routes(
        base_method_map(),
        &driver.extension_method_map(),
        &config.base_path,
    )
    .context("failed to build route table")?;
    info!(routes = route_table.len(), "route table compiled");

    let proxy_client =
        HttpProxyClient::new(config.proxy_timeout_secs).context("failed to build proxy client")?;

    let state = Arc::new(AppState {
        driver,
        sessions: SessionRegistry::new(),
        proxy_client: Arc::new(proxy_client),
    });

    let router = build_router(state, &route_table, &config).context("failed to build router")?;
    start_server(router, &config).await?;

    info!("autobridge stopped");
    Ok(())
}
