//! API Handlers
//!
//! HTTP request handlers for each endpoint. Cache calls are blocking, so each
//! one runs on tokio's blocking pool.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::Cache;
use crate::error::{CacheError, Result};
use crate::models::{
    ContainsResponse, GetResponse, HealthResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The served cache
    pub cache: Arc<dyn Cache>,
    /// Provider the cache was built with
    pub provider: String,
    /// Metrics group, empty when uninstrumented
    pub group: String,
}

impl AppState {
    pub fn new(cache: Arc<dyn Cache>, provider: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            cache,
            provider: provider.into(),
            group: group.into(),
        }
    }
}

/// Runs a blocking cache call off the async executor.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CacheError::Internal(e.to_string()))
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let SetRequest { key, value } = req;
    let cache = state.cache.clone();
    let stored = key.clone();
    blocking(move || cache.set(&stored, value.into_bytes())).await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /get/:key
///
/// A miss, whatever its cause, is a 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let cache = state.cache.clone();
    let lookup = key.clone();
    let value = blocking(move || cache.get(&lookup)).await?;

    match value {
        Some(value) => Ok(Json(GetResponse::new(key, &value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /contains/:key
pub async fn contains_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ContainsResponse>> {
    let cache = state.cache.clone();
    let lookup = key.clone();
    let present = blocking(move || cache.contains(&lookup)).await?;

    Ok(Json(ContainsResponse { key, present }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let cache = state.cache.clone();
    let entries = blocking(move || cache.len()).await?;

    Ok(Json(StatsResponse {
        provider: state.provider,
        group: state.group,
        entries,
    }))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
