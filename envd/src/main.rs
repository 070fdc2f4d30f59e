use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use envd::api::{self, ApiState};
use envd::config::Config;
use envd::std_actions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting environment daemon");

    // Registration happens here, before any invocation traffic; the
    // registry is append-only once it is behind the Arc.
    let registry = Arc::new(std_actions::demo_registry());
    tracing::info!(
        actions = registry.action_ids().len(),
        consts = registry.consts().len(),
        "Action registry ready"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router()
        .with_state(ApiState { registry })
        .layer(cors);

    let addr = format!("{}:{}", config.bind_addr, config.port);
    tracing::info!(%addr, "Serving action registry");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
