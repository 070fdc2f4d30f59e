//! End-to-end discovery and invocation against a live registry.
//!
//! Serves the router on an ephemeral port and drives it with the real
//! client, the way an agent process would.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::net::TcpListener;

use envd::api::{self, ApiState};
use envd::client::{ClientError, EnvClient};
use envd::registry::{ActionDef, ActionRegistry};
use wire_types::Value;

async fn serve_registry(registry: ActionRegistry) -> String {
    let app = api::router().with_state(ApiState {
        registry: Arc::new(registry),
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn scenario_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register_const("limit", Value::Int(10), "Max objects per scan.");
    registry
        .register_action(
            ActionDef::new("add", "Adds two integers.", "(x: int, y: int) -> int"),
            |args, kwargs| {
                let x = args
                    .first()
                    .and_then(Value::as_int)
                    .ok_or_else(|| anyhow::anyhow!("missing x"))?;
                let y = args
                    .get(1)
                    .and_then(Value::as_int)
                    .or_else(|| kwargs.get("y").and_then(Value::as_int))
                    .ok_or_else(|| anyhow::anyhow!("missing y"))?;
                Ok(Value::Int(x + y))
            },
        )
        .unwrap();
    registry
}

#[tokio::test]
async fn discover_and_invoke_through_proxy() {
    let base_url = serve_registry(scenario_registry()).await;
    let client = EnvClient::new(&base_url);

    assert!(client.health_check().await);

    let ids = client.action_ids().await.unwrap();
    assert_eq!(ids.len(), 1);

    let infos = client.action_infos().await.unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].name, "add");
    assert_eq!(infos[0].signature, "(x: int, y: int) -> int");

    let add = client.action_to_callable(&infos[0]);
    let sum = add
        .call(vec![Value::Int(2), Value::Int(3)], BTreeMap::new())
        .await
        .unwrap();
    assert_eq!(sum, Value::Int(5));

    // Keyword form dispatches to the same implementation.
    let mut kwargs = BTreeMap::new();
    kwargs.insert("y".to_string(), Value::Int(40));
    let sum = add.call(vec![Value::Int(2)], kwargs).await.unwrap();
    assert_eq!(sum, Value::Int(42));

    let consts = client.consts().await.unwrap();
    assert_eq!(consts.len(), 1);
    assert_eq!(consts[0].name, "limit");
    assert_eq!(consts[0].value, Value::Int(10));
}

#[tokio::test]
async fn discovery_results_are_cached_per_client() {
    let app = api::router().with_state(ApiState {
        registry: Arc::new(scenario_registry()),
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let client = EnvClient::new(format!("http://{addr}"));

    let ids = client.action_ids().await.unwrap();
    let infos = client.action_infos().await.unwrap();
    let consts = client.consts().await.unwrap();

    // Descriptors are immutable for the registry's lifetime; once
    // fetched they must not require the registry to stay reachable.
    server.abort();
    let _ = server.await;

    assert_eq!(client.action_ids().await.unwrap(), ids);
    assert_eq!(client.action_infos().await.unwrap(), infos);
    assert_eq!(client.consts().await.unwrap(), consts);
}

#[tokio::test]
async fn lookup_by_name() {
    let base_url = serve_registry(scenario_registry()).await;
    let client = EnvClient::new(&base_url);

    let info = client.action_info_from_name("add").await.unwrap();
    assert_eq!(info.name, "add");

    let missing = client.action_info_from_name("subtract").await;
    assert!(matches!(missing, Err(ClientError::UnknownName(_))));
}

#[tokio::test]
async fn remote_execution_failure_is_not_swallowed() {
    let mut registry = ActionRegistry::new();
    let failing_id = registry
        .register_action(ActionDef::new("boom", "Always fails.", "() -> null"), |_, _| {
            anyhow::bail!("camera offline")
        })
        .unwrap();
    let base_url = serve_registry(registry).await;
    let client = EnvClient::new(&base_url);

    let infos = client.action_infos().await.unwrap();
    assert_eq!(infos[0].action_id, failing_id);

    let err = client
        .take_action(&infos[0], vec![], BTreeMap::new())
        .await
        .unwrap_err();
    match err {
        ClientError::Remote { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("camera offline"));
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_registry_is_unhealthy_not_fatal() {
    // Nothing listens here; bind-then-drop guarantees the port is dead.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = EnvClient::new(format!("http://{addr}"));
    assert!(!client.health_check().await);

    let err = client.action_ids().await.unwrap_err();
    assert!(matches!(err, ClientError::Connectivity(_)));
}
