use crate::probe_engine::ProbeEngine;
use crate::probe_result::CheckResult;
use crate::store::{AddOutcome, ProxyConfig, Site, Store};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::{path::Path, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info};

type ApiError = (StatusCode, String);

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub engine: Arc<ProbeEngine>,
}

impl AppState {
    pub fn new(store: Arc<Store>, engine: ProbeEngine) -> Self {
        Self {
            store,
            engine: Arc::new(engine),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    id: Option<String>,
}

pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route(
            "/api/sites",
            get(list_sites)
                .post(add_site)
                .put(update_site)
                .delete(remove_site),
        )
        .route("/api/proxy", get(get_proxy).post(update_proxy))
        .route("/api/test", post(run_test))
        .fallback_service(ServeDir::new(static_dir))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

/// Serves until the listener fails.
pub async fn start_web_server(addr: &str, state: AppState, static_dir: &Path) -> Result<()> {
    let app = router(state, static_dir);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Web server starting on http://{}", addr);
    axum::serve(listener, app).await.context("Web server error")
}

fn internal(e: anyhow::Error) -> ApiError {
    error!("Store update failed: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
}

async fn list_sites(State(state): State<AppState>) -> Json<Vec<Site>> {
    Json(state.store.sites().await)
}

async fn add_site(
    State(state): State<AppState>,
    Json(mut site): Json<Site>,
) -> Result<Json<Site>, ApiError> {
    if site.id.is_empty() {
        site.id = generate_id();
    }
    let outcome = state.store.add_site(site.clone()).await.map_err(internal)?;
    if outcome == AddOutcome::DuplicateId {
        return Err((StatusCode::CONFLICT, format!("Site id {} already exists", site.id)));
    }
    info!("Added site {} ({} {})", site.id, site.method, site.target);
    Ok(Json(site))
}

async fn update_site(
    State(state): State<AppState>,
    Json(site): Json<Site>,
) -> Result<Json<Site>, ApiError> {
    let found = state
        .store
        .update_site(site.clone())
        .await
        .map_err(internal)?;
    if !found {
        return Err((StatusCode::NOT_FOUND, format!("No site with id {}", site.id)));
    }
    Ok(Json(site))
}

async fn remove_site(
    State(state): State<AppState>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, ApiError> {
    let id = match params.id {
        Some(id) if !id.is_empty() => id,
        _ => return Err((StatusCode::BAD_REQUEST, "Missing id".to_string())),
    };
    state.store.remove_site(&id).await.map_err(internal)?;
    info!("Removed site {}", id);
    Ok(StatusCode::OK)
}

async fn get_proxy(State(state): State<AppState>) -> Json<ProxyConfig> {
    Json(state.store.proxy().await)
}

async fn update_proxy(
    State(state): State<AppState>,
    Json(proxy): Json<ProxyConfig>,
) -> Result<Json<ProxyConfig>, ApiError> {
    state
        .store
        .update_proxy(proxy.clone())
        .await
        .map_err(internal)?;
    let state_name = if proxy.enabled { "enabled" } else { "disabled" };
    info!("Proxy {} ({})", state_name, proxy.url);
    Ok(Json(proxy))
}

async fn run_test(State(state): State<AppState>) -> Json<Vec<CheckResult>> {
    let (sites, proxy) = state.store.snapshot().await;
    Json(state.engine.run(&sites, &proxy).await)
}

fn generate_id() -> String {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros() * 1_000)
        .to_string()
}
