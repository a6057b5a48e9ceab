use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use docsearch_core::ingest::{read_extracted_archive, read_markdown_dir};
use docsearch_core::{IndexConfig, IndexHandle, IndexStats, QuerySpec, ScoredResult, SearchError};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod tools;

use tools::{ToolError, ToolRegistry};

type ApiError = (StatusCode, String);
type HmacSha256 = Hmac<Sha256>;

/// Header carrying the admin token for `POST /index/rebuild`.
pub const ADMIN_TOKEN_HEADER: &str = "X-ADMIN-TOKEN";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory scanned for .md / .mdx files on every (re)build
    pub docs_dir: PathBuf,
    /// Drop the first path component of every file (extracted archive layout)
    pub strip_root: bool,
    pub index: IndexConfig,
    pub admin_token: Option<String>,
    pub cors_allow_origin: Option<String>,
}

impl Settings {
    /// Settings with `ADMIN_TOKEN` and `CORS_ALLOW_ORIGIN` taken from the environment.
    pub fn from_env(docs_dir: PathBuf, strip_root: bool, index: IndexConfig) -> Self {
        Self {
            docs_dir,
            strip_root,
            index,
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").ok(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub index: IndexHandle,
    pub tools: Arc<ToolRegistry>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self> {
        let tools = ToolRegistry::with_builtin_tools()?;
        Ok(Self { settings: Arc::new(settings), index: IndexHandle::new(), tools: Arc::new(tools) })
    }

    /// Re-read the docs directory and publish a fresh index. The live index
    /// is untouched if reading or building fails.
    pub fn reload(&self) -> Result<IndexStats> {
        let dir = &self.settings.docs_dir;
        let raws = if self.settings.strip_root { read_extracted_archive(dir)? } else { read_markdown_dir(dir)? };
        let index = self.index.rebuild(raws, &self.settings.index)?;
        Ok(index.stats())
    }
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub count: usize,
    pub results: Vec<ScoredResult>,
}

/// Origins from a comma-separated allow list. Unparseable entries are
/// dropped; an unset or fully invalid list allows any origin.
fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allow_origin
        .into_iter()
        .flat_map(|list| list.split(','))
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(state.settings.cors_allow_origin.as_deref());

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/stats", get(stats_handler))
        .route("/tools", get(list_tools))
        .route("/tools/:name", post(call_tool))
        .route("/index/rebuild", post(rebuild_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn search_status(e: &SearchError) -> StatusCode {
    match e {
        SearchError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        SearchError::IndexNotReady => StatusCode::SERVICE_UNAVAILABLE,
        SearchError::EmptyCorpus => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn search_error(e: SearchError) -> ApiError {
    (search_status(&e), e.to_string())
}

fn bad_request(msg: String) -> ApiError {
    search_error(SearchError::InvalidQuery(msg))
}

/// Turn `q`, `k`, `snippet`, `boost.<field>` and `filter.<key>` parameters into a query.
fn parse_query(params: &HashMap<String, String>) -> Result<QuerySpec, ApiError> {
    let q = params.get("q").cloned().unwrap_or_default();
    let mut spec = QuerySpec::new(q);
    if let Some(k) = params.get("k") {
        let k: i64 = k.parse().map_err(|_| bad_request(format!("k must be an integer, got '{k}'")))?;
        if k <= 0 {
            return Err(bad_request("top_k must be positive".into()));
        }
        spec = spec.with_top_k(k as usize);
    }
    if let Some(len) = params.get("snippet") {
        let len: usize = len.parse().map_err(|_| bad_request(format!("snippet must be a non-negative integer, got '{len}'")))?;
        spec = spec.with_snippet_length(len);
    }
    for (key, value) in params {
        if let Some(field) = key.strip_prefix("boost.") {
            let w: f32 = value.parse().map_err(|_| bad_request(format!("boost for '{field}' must be a number, got '{value}'")))?;
            spec = spec.with_boost(field, w);
        } else if let Some(name) = key.strip_prefix("filter.") {
            spec = spec.with_filter(name, value.clone());
        }
    }
    Ok(spec)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let spec = parse_query(&params)?;
    let results = state.index.search(&spec).map_err(search_error)?;
    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: spec.text, took_s: elapsed.as_secs_f64(), count: results.len(), results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<u32>) -> Result<Json<Value>, ApiError> {
    let index = state.index.snapshot().ok_or_else(|| search_error(SearchError::IndexNotReady))?;
    let doc = index.document(doc_id).ok_or_else(|| (StatusCode::NOT_FOUND, format!("document {doc_id} not found")))?;
    Ok(Json(serde_json::json!({
        "doc_id": doc.id,
        "filename": doc.filename,
        "fields": doc.fields,
        "keywords": doc.keywords,
    })))
}

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<IndexStats>, ApiError> {
    let index = state.index.snapshot().ok_or_else(|| search_error(SearchError::IndexNotReady))?;
    Ok(Json(index.stats()))
}

pub async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({ "tools": state.tools.list() }))
}

pub async fn call_tool(State(state): State<AppState>, Path(name): Path<String>, Json(args): Json<Value>) -> Result<Json<Value>, ApiError> {
    let index = state.index.snapshot().ok_or_else(|| search_error(SearchError::IndexNotReady))?;
    match state.tools.call(&name, &index, args) {
        Ok(out) => Ok(Json(out)),
        Err(ToolError::Search(e)) => Err(search_error(e)),
        Err(e @ ToolError::UnknownTool(_)) => Err((StatusCode::NOT_FOUND, e.to_string())),
        Err(e @ ToolError::InvalidArguments(_)) => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e @ ToolError::Registration(_)) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

async fn rebuild_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<IndexStats>, ApiError> {
    authorize(&state, &headers)?;
    let worker = state.clone();
    let outcome = tokio::task::spawn_blocking(move || worker.reload())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    match outcome {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => match e.downcast_ref::<SearchError>() {
            Some(se) => Err((search_status(se), e.to_string())),
            None => Err((StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))),
        },
    }
}

/// Compare tokens through HMAC tags so the check takes the same time
/// whichever byte differs first.
fn token_matches(provided: &[u8], required: &[u8]) -> bool {
    const DOMAIN: &[u8] = b"docsearch admin token";
    let (Ok(mut expected), Ok(mut actual)) = (HmacSha256::new_from_slice(required), HmacSha256::new_from_slice(provided)) else {
        return false;
    };
    expected.update(DOMAIN);
    actual.update(DOMAIN);
    actual.verify_slice(&expected.finalize().into_bytes()).is_ok()
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(required) = state.settings.admin_token.as_deref() else {
        return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into()));
    };
    let provided = headers.get(ADMIN_TOKEN_HEADER).map(HeaderValue::as_bytes).unwrap_or_default();
    if token_matches(provided, required.as_bytes()) {
        Ok(())
    } else {
        tracing::warn!("rejected rebuild with invalid admin token");
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_comparison() {
        assert!(token_matches(b"secret", b"secret"));
        assert!(!token_matches(b"secre", b"secret"));
        assert!(!token_matches(b"secret-and-more", b"secret"));
        assert!(!token_matches(b"Secret", b"secret"));
        assert!(!token_matches(b"", b"secret"));
    }
}
