use mock_backend::{server, MockPipelineService, TransitionDelays};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn spawn_server(service: MockPipelineService) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, server::router(service)).await.unwrap();
    });

    format!("http://{addr}")
}

fn pipeline_config(id: &str) -> Value {
    json!({
        "pipeline_id": id,
        "name": "User events",
        "source": { "type": "kafka", "topics": [{ "name": "user_events" }] },
        "sink": { "type": "clickhouse", "table": "events" },
        "metadata": { "tags": ["demo"] }
    })
}

#[tokio::test]
async fn given_valid_config_when_creating_then_pipeline_is_listed() {
    // Given
    let base = spawn_server(MockPipelineService::default()).await;
    let client = reqwest::Client::new();

    // When
    let response = client
        .post(format!("{base}/api/v1/pipeline"))
        .json(&pipeline_config("user-events"))
        .send()
        .await
        .unwrap();

    // Then
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["pipeline_id"], "user-events");
    assert_eq!(created["status"], "Created");

    let listed: Value = client
        .get(format!("{base}/api/v1/pipeline"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn given_active_pipeline_when_creating_another_then_forbidden() {
    // Given
    let base = spawn_server(MockPipelineService::default()).await;
    let client = reqwest::Client::new();
    client
        .post(format!("{base}/api/v1/pipeline"))
        .json(&pipeline_config("first"))
        .send()
        .await
        .unwrap();

    // When
    let response = client
        .post(format!("{base}/api/v1/pipeline"))
        .json(&pipeline_config("second"))
        .send()
        .await
        .unwrap();

    // Then
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "forbidden");
    assert!(body["message"].as_str().unwrap().contains("already running"));
}

#[tokio::test]
async fn given_created_pipeline_when_pausing_then_transition_is_rejected() {
    // Given
    let base = spawn_server(MockPipelineService::default()).await;
    let client = reqwest::Client::new();
    client
        .post(format!("{base}/api/v1/pipeline"))
        .json(&pipeline_config("orders"))
        .send()
        .await
        .unwrap();

    // When
    let response = client
        .post(format!("{base}/api/v1/pipeline/orders/pause"))
        .send()
        .await
        .unwrap();

    // Then
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "invalid_status_transition");
    assert_eq!(body["details"]["current_status"], "Created");
}

#[tokio::test]
async fn given_running_pipeline_when_stopping_then_stopping_is_reported() {
    // Given
    let service = MockPipelineService::new(TransitionDelays::immediate());
    let base = spawn_server(service.clone()).await;
    let client = reqwest::Client::new();
    client
        .post(format!("{base}/api/v1/pipeline"))
        .json(&pipeline_config("orders"))
        .send()
        .await
        .unwrap();
    service
        .simulator()
        .simulate_transition(
            "orders",
            domain::dtos::PipelineStatus::Created,
            domain::dtos::PipelineStatus::Running,
            std::time::Duration::ZERO,
        )
        .await
        .unwrap();

    // When
    let response = client
        .post(format!("{base}/api/v1/pipeline/orders/stop"))
        .send()
        .await
        .unwrap();

    // Then
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "Stopping");
}

#[tokio::test]
async fn given_missing_pipeline_when_fetching_health_then_not_found() {
    let base = spawn_server(MockPipelineService::default()).await;

    let response = reqwest::get(format!("{base}/api/v1/pipeline/nope/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn given_seeded_notifications_when_marking_read_then_unread_list_is_empty() {
    let base = spawn_server(MockPipelineService::default()).await;
    let client = reqwest::Client::new();

    let unread: Vec<Value> = client
        .get(format!("{base}/notifications?unread_only=true"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unread.len(), 1);

    let marked: Value = client
        .post(format!("{base}/notifications/mark-read"))
        .json(&json!({ "notification_ids": [unread[0]["notification_id"]] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(marked["updated"], 1);

    let unread: Vec<Value> = client
        .get(format!("{base}/notifications?unread_only=true"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(unread.is_empty());
}
