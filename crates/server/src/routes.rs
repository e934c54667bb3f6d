use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::{Health, IndexStatus};

use crate::openapi::ApiDoc;
use crate::state::AppState;

pub mod notes;
pub mod users;

#[utoipa::path(get, path = "/", tag = "health", responses((status = 200, description = "Alive", body = crate::openapi::IndexResponseDoc)))]
pub async fn index() -> Json<IndexStatus> {
    Json(IndexStatus::alive())
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let upload_limit = state.upload_body_limit();

    let api = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/check/:user_id", get(users::check))
        .route("/register", post(users::register))
        .route("/upload", post(notes::upload).layer(DefaultBodyLimit::max(upload_limit)))
        .route("/list/:user_id", get(notes::list))
        .route("/delete", post(notes::delete))
        .with_state(state);

    api.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，日志级别为 INFO
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // 响应返回时打点，包含状态码与耗时
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 失败（5xx 等）时以 ERROR 记录
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
