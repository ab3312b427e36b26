use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use chrono::Utc;
use domain::dtos::{
    ApiErrorBody, PipelineHealth, PipelineStatus, StatusChange, StatusStreamEvent,
};
use domain::LifecycleAction;
use futures::Stream;
use serde_json::json;
use status_sync::{
    HttpHealthSource, StatusNotification, StatusSync, SyncConfig, TransportMode,
};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;

#[derive(Clone)]
struct Console {
    stream_enabled: bool,
    status: Arc<Mutex<PipelineStatus>>,
}

async fn health(State(console): State<Console>, Path(id): Path<String>) -> Json<PipelineHealth> {
    let status = *console.status.lock().unwrap();

    Json(PipelineHealth {
        pipeline_id: id.clone(),
        pipeline_name: id,
        overall_status: status,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    })
}

async fn stream(
    State(console): State<Console>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !console.stream_enabled {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "code": 503, "message": "backend unavailable" })),
        )
            .into_response();
    }

    let status = *console.status.lock().unwrap();
    let ids: Vec<String> = query
        .get("pipeline_ids")
        .map(|ids| ids.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    let events = async_stream::stream! {
        let changes = ids
            .into_iter()
            .map(|pipeline_id| StatusChange { pipeline_id, status, previous_status: None })
            .collect();

        if let Some(event) = StatusStreamEvent::from_changes(changes, Utc::now()) {
            yield Ok::<_, Infallible>(Event::default().event(event.event_name()).data(event.data().unwrap()));
        }

        futures::future::pending::<()>().await;
    };

    sse_response(events).into_response()
}

fn sse_response(
    events: impl Stream<Item = Result<Event, Infallible>> + Send + 'static,
) -> impl IntoResponse {
    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

async fn spawn_console(console: Console) -> String {
    let app = Router::new()
        .route("/api/pipeline/status/stream", get(stream))
        .route("/api/pipeline/:id/health", get(health))
        .with_state(console);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn fast_config() -> SyncConfig {
    SyncConfig::default()
        .with_reconnect_delay(Duration::from_millis(10))
        .with_poll_interval(Duration::from_millis(50))
}

async fn next_status(
    notifications: &mut tokio::sync::broadcast::Receiver<StatusNotification>,
) -> (Option<PipelineStatus>, bool) {
    loop {
        let notification = timeout(Duration::from_secs(5), notifications.recv())
            .await
            .unwrap()
            .unwrap();

        if let StatusNotification::Changed {
            status, optimistic, ..
        } = notification
        {
            return (status, optimistic);
        }
    }
}

#[tokio::test]
async fn given_stream_when_watching_then_statuses_arrive_over_sse() {
    let base = spawn_console(Console {
        stream_enabled: true,
        status: Arc::new(Mutex::new(PipelineStatus::Running)),
    })
    .await;

    let sync = StatusSync::start(
        Arc::new(HttpHealthSource::new(base)),
        fast_config(),
        ["orders".to_string(), "payments".to_string()],
    );
    let mut notifications = sync.subscribe();

    next_status(&mut notifications).await;
    next_status(&mut notifications).await;

    assert_eq!(sync.status("orders"), Some(PipelineStatus::Running));
    assert_eq!(sync.status("payments"), Some(PipelineStatus::Running));
    assert_eq!(sync.mode(), TransportMode::Streaming);
}

#[tokio::test]
async fn given_broken_stream_when_watching_then_polling_takes_over() {
    let base = spawn_console(Console {
        stream_enabled: false,
        status: Arc::new(Mutex::new(PipelineStatus::Paused)),
    })
    .await;

    let sync = StatusSync::start(
        Arc::new(HttpHealthSource::new(base)),
        fast_config(),
        ["orders".to_string()],
    );
    let mut notifications = sync.subscribe();

    assert_eq!(
        next_status(&mut notifications).await,
        (Some(PipelineStatus::Paused), false)
    );
    assert_eq!(sync.mode(), TransportMode::Polling);
}

#[tokio::test]
async fn given_user_action_when_backend_confirms_then_override_is_replaced() {
    let status = Arc::new(Mutex::new(PipelineStatus::Running));
    let base = spawn_console(Console {
        stream_enabled: false,
        status: status.clone(),
    })
    .await;

    let sync = StatusSync::start(
        Arc::new(HttpHealthSource::new(base)),
        fast_config(),
        ["orders".to_string()],
    );
    let mut notifications = sync.subscribe();
    assert_eq!(
        next_status(&mut notifications).await,
        (Some(PipelineStatus::Running), false)
    );

    // The user pauses; the UI shows Pausing before the backend knows.
    sync.report_action("orders", LifecycleAction::Pause);
    assert_eq!(
        next_status(&mut notifications).await,
        (Some(PipelineStatus::Pausing), true)
    );
    assert_eq!(sync.status("orders"), Some(PipelineStatus::Pausing));

    *status.lock().unwrap() = PipelineStatus::Paused;
    assert_eq!(
        next_status(&mut notifications).await,
        (Some(PipelineStatus::Paused), false)
    );
    assert!(!sync.entry("orders").unwrap().is_optimistic());
}

#[tokio::test]
async fn given_error_body_when_fetching_health_then_code_and_message_are_kept() {
    let app = Router::new().route(
        "/api/pipeline/:id/health",
        get(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "code": 404, "message": "pipeline not found" })),
            )
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let source = HttpHealthSource::new(format!("http://{addr}"));
    let error = status_sync::HealthSource::fetch_health(&source, "orders")
        .await
        .unwrap_err();

    assert_eq!(
        error.to_api_error(),
        ApiErrorBody::new(404, "pipeline not found")
    );
}
