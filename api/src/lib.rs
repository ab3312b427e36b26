//! The console's backend-for-frontend: browser-facing `/api` routes proxied
//! to the orchestration API, or answered from fixtures in mock mode.

pub mod app_state;
pub mod backend;
pub mod config;
pub mod connections;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod utils;

use axum::{
    routing::{get, post},
    Router,
};
use hyper::StatusCode;

use app_state::AppState;
use routes::api;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { StatusCode::OK }))
        .route(
            "/api/pipeline",
            get(api::pipelines::list)
                .post(api::pipelines::create)
                .delete(api::pipelines::terminate_all),
        )
        .route(
            "/api/pipeline/status/stream",
            get(api::events::status_stream),
        )
        .route(
            "/api/pipeline/:id",
            get(api::pipeline::get)
                .patch(api::pipeline::rename)
                .delete(api::pipeline::delete),
        )
        .route("/api/pipeline/:id/pause", post(api::pipeline::pause))
        .route("/api/pipeline/:id/resume", post(api::pipeline::resume))
        .route("/api/pipeline/:id/stop", post(api::pipeline::stop))
        .route("/api/pipeline/:id/terminate", post(api::pipeline::terminate))
        .route("/api/pipeline/:id/edit", post(api::pipeline::edit))
        .route("/api/pipeline/:id/health", get(api::pipeline::health))
        .route("/api/pipeline/:id/dlq/state", get(api::dlq::state))
        .route("/api/pipeline/:id/dlq/consume", get(api::dlq::consume))
        .route("/api/pipeline/:id/dlq/purge", post(api::dlq::purge))
        .route("/api/platform", get(api::platform::get))
        .route("/api/filter/validate", post(api::validation::validate_filter))
        .route(
            "/api/transform/expression/evaluate",
            post(api::validation::evaluate_transform),
        )
        .route(
            "/api/clickhouse/test-connection",
            post(api::clickhouse::test_connection),
        )
        .route("/api/clickhouse/databases", post(api::clickhouse::databases))
        .route("/api/clickhouse/tables", post(api::clickhouse::tables))
        .route("/api/clickhouse/schema", post(api::clickhouse::schema))
        .route("/api/kafka/test-connection", post(api::kafka::test_connection))
        .route("/api/kafka/topics", post(api::kafka::topics))
        .route("/api/notifications", get(api::notifications::list))
        .route(
            "/api/notifications/mark-read",
            post(api::notifications::mark_read),
        )
        .route(
            "/api/notifications/:id",
            get(api::notifications::get).delete(api::notifications::delete),
        )
        .with_state(state)
}
