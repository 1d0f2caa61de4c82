//! HTTP request handlers for the web adapter.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

use crate::adapters::csv_cache::{CacheStats, cache_stats};
use crate::domain::error::FetchError;
use crate::domain::presentation::{
    TechnicalRecord, daily_quotes_view, has_close, search_stocks, technical_records,
};
use crate::domain::quote::{DailyQuote, RawDailyBar, RawFinancialStatement, StockInfo};

use super::{AppState, WebError};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub api_key_configured: bool,
    pub cache: CacheStats,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, WebError> {
    let cache = cache_stats(&state.cache_dir)?;
    Ok(Json(HealthResponse {
        status: "ok",
        api_key_configured: state.api_key_configured,
        cache,
    }))
}

pub async fn list_stocks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<StockInfo>>, WebError> {
    let quotes = Arc::clone(&state.quotes);
    let master = tokio::task::spawn_blocking(move || quotes.stock_master(""))
        .await
        .map_err(|e| WebError::internal(format!("master lookup task failed: {}", e)))??;
    Ok(Json(search_stocks(&master, &query.q)))
}

/// Daily bars for `code`, logging and swallowing upstream failures.
async fn fetch_daily(state: &AppState, code: String, range: RangeQuery) -> Vec<RawDailyBar> {
    let quotes = Arc::clone(&state.quotes);
    let task_code = code.clone();
    let result: Result<Result<Vec<RawDailyBar>, FetchError>, _> =
        tokio::task::spawn_blocking(move || quotes.daily_quotes(&task_code, &range.from, &range.to))
            .await;
    match result {
        Ok(Ok(bars)) => bars,
        Ok(Err(e)) => {
            warn!(%code, error = %e, "upstream daily quotes failed");
            Vec::new()
        }
        Err(e) => {
            error!(%code, error = %e, "daily quotes task failed");
            Vec::new()
        }
    }
}

pub async fn daily_quotes(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Json<Vec<DailyQuote>> {
    let bars = fetch_daily(&state, code, range).await;
    Json(daily_quotes_view(&bars))
}

pub async fn technical_indicators(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Json<Vec<TechnicalRecord>> {
    let bars = fetch_daily(&state, code, range).await;
    if !has_close(&bars) {
        return Json(Vec::new());
    }
    Json(technical_records(&bars))
}

/// Financial summaries for `code`; upstream failures yield an empty list.
pub async fn financials(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Json<Vec<RawFinancialStatement>> {
    let quotes = Arc::clone(&state.quotes);
    let task_code = code.clone();
    match tokio::task::spawn_blocking(move || quotes.financials(&task_code)).await {
        Ok(Ok(rows)) => Json(rows),
        Ok(Err(e)) => {
            warn!(%code, error = %e, "upstream financials failed");
            Json(Vec::new())
        }
        Err(e) => {
            error!(%code, error = %e, "financials task failed");
            Json(Vec::new())
        }
    }
}

pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" }))).into_response()
}
