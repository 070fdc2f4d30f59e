use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use agentd::api::{self, ApiState};
use agentd::callbacks::LoggingCallback;
use agentd::config::Config;
use agentd::orchestrator::StepOrchestrator;
use agentd::runner::CommandRunner;
use envd::client::EnvClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting agent daemon");

    let clients: Vec<EnvClient> = config
        .env_urls
        .iter()
        .map(|url| EnvClient::new(url.as_str()))
        .collect();
    let runner = CommandRunner::discover(&clients).await;
    tracing::info!(
        actions = runner.action_names().len(),
        environments = clients.len(),
        "Task runner assembled"
    );

    let orchestrator = Arc::new(
        StepOrchestrator::new(Box::new(runner)).with_callback(Arc::new(LoggingCallback)),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router()
        .with_state(ApiState { orchestrator })
        .layer(cors);

    let addr = format!("{}:{}", config.bind_addr, config.port);
    tracing::info!(%addr, "Serving agent API");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
