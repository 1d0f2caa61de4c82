//! JSON HTTP API over the quote port.
//!
//! Upstream calls are blocking, so handlers run them on the blocking pool.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::get,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domain::error::StockStudyError;
use crate::ports::quote_port::QuotePort;

pub struct AppState {
    pub quotes: Arc<dyn QuotePort>,
    pub api_key_configured: bool,
    pub cache_dir: PathBuf,
}

/// CORS for the given browser origins, mirroring requested methods and
/// headers so credentials can be allowed.
pub fn cors_layer(origins: &[String], allow_credentials: bool) -> Result<CorsLayer, StockStudyError> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| StockStudyError::ConfigInvalid {
                section: "web".to_string(),
                key: "cors_origins".to_string(),
                reason: format!("'{}': {}", origin, e),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let layer = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(allow_credentials);
    Ok(if allow_credentials {
        layer
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
    } else {
        layer
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(tower_http::cors::Any)
    })
}

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/stocks/master", get(handlers::list_stocks))
        .route("/api/stocks/{code}/daily", get(handlers::daily_quotes))
        .route("/api/stocks/{code}/financials", get(handlers::financials))
        .route("/api/analysis/{code}/technical", get(handlers::technical_indicators))
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(Arc::new(state))
}
