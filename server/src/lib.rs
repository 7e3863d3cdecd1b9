use anyhow::Result;
use axum::{extract::{Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sift_core::{QueryEngine, SearchOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { sift_core::query::DEFAULT_TOP_K }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub missing_terms: Vec<String>,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: f64,
}

#[derive(Clone)]
pub struct AppState {
    pub index_root: PathBuf,
    /// Current snapshot. Queries clone the inner `Arc` and never hold the lock while ranking.
    pub engine: Arc<RwLock<Arc<QueryEngine>>>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn snapshot(&self) -> Arc<QueryEngine> { self.engine.read().clone() }
}

pub fn build_app(index_dir: impl Into<PathBuf>) -> Result<Router> {
    build_app_with(index_dir, std::env::var("ADMIN_TOKEN").ok())
}

pub fn build_app_with(index_dir: impl Into<PathBuf>, admin_token: Option<String>) -> Result<Router> {
    let index_root = index_dir.into();
    let engine = QueryEngine::open(&index_root)?;
    let app_state = AppState { index_root, engine: Arc::new(RwLock::new(Arc::new(engine))), admin_token };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let engine = state.snapshot();
    let k = params.k.clamp(1, 100);
    let results = engine.search_text(&params.q, &SearchOptions { top_k: k });

    let missing_terms = results.missing_terms().map(str::to_string).collect();
    let hits = results
        .hits
        .into_iter()
        .map(|h| SearchHit { doc_id: h.doc_id, score: h.score })
        .collect();
    let elapsed = start.elapsed();
    Json(SearchResponse {
        query: params.q,
        took_s: elapsed.as_secs_f64(),
        total_hits: results.total_matches,
        missing_terms,
        results: hits,
    })
}

/// Reload the index from disk and swap it in. Queries already running keep the old snapshot.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let root = state.index_root.clone();
    let loaded = tokio::task::spawn_blocking(move || QueryEngine::open(root))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let engine = match loaded {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!(error = %err, "index reload failed, keeping current snapshot");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()));
        }
    };
    let terms = engine.index().num_terms();
    *state.engine.write() = Arc::new(engine);
    tracing::info!(terms, "index reloaded");
    Ok(Json(serde_json::json!({ "reloaded": true, "terms": terms })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
