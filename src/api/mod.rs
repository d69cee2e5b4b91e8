//! HTTP 接口层
//!
//! 路由、请求体限制、CORS 与请求追踪

pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use response::{ErrorResponse, QuestionsResponse};

/// 构建路由
///
/// 请求体上限由 `DefaultBodyLimit` 在读取 multipart 时生效，超限错误仍走统一的 JSON 响应。
pub fn router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/generate-questions", post(routes::generate_questions))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
