#![allow(dead_code)]

use axum::http::StatusCode;
use axum::routing::{get, head};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ans_resolver::config::{Config, ResolverConfig};
use ans_resolver::storage::InMemoryAgentStore;
use ans_resolver::types::AgentRecord;
use ans_resolver::AgentNameService;

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Well-known document for every organization path segment.
pub fn wellknown_router(document: Value) -> Router {
    Router::new().route(
        "/:organization/agent.json",
        get(move || {
            let document = document.clone();
            async move { Json(document) }
        }),
    )
}

/// Like `wellknown_router`, bumping `hits` on every request.
pub fn counting_wellknown_router(document: Value, hits: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        "/:organization/agent.json",
        get(move || {
            let document = document.clone();
            hits.fetch_add(1, Ordering::SeqCst);
            async move { Json(document) }
        }),
    )
}

pub fn failing_router(status: StatusCode) -> Router {
    Router::new().route("/:organization/agent.json", get(move || async move { status }))
}

pub fn slow_router(delay: Duration) -> Router {
    Router::new().route(
        "/:organization/agent.json",
        get(move || async move {
            tokio::time::sleep(delay).await;
            Json(json!({ "agents": [] }))
        }),
    )
}

pub fn health_router(health: StatusCode, status: StatusCode, root: StatusCode) -> Router {
    Router::new()
        .route("/health", get(move || async move { health }))
        .route("/status", get(move || async move { status }))
        .route("/", head(move || async move { root }))
}

pub fn wellknown_template(base: &str) -> String {
    format!("{}/{{organization}}/agent.json", base)
}

/// Resolver config pointing public well-known lookups at a local server.
pub fn resolver_config(base: &str) -> ResolverConfig {
    ResolverConfig {
        wellknown_url_template: wellknown_template(base),
        request_timeout_ms: 1000,
        ..ResolverConfig::default()
    }
}

pub fn create_test_service(config: Config, records: Vec<AgentRecord>) -> AgentNameService {
    AgentNameService::new(config, Arc::new(InMemoryAgentStore::with_records(records))).unwrap()
}

/// Public well-known lookups go to a closed local port, so they fail fast.
pub fn offline_config() -> Config {
    Config {
        resolver: resolver_config("http://127.0.0.1:9"),
        ..Config::default()
    }
}
