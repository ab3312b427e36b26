use chrono::{Duration, Utc};
use domain::dtos::{ColumnSchema, DlqMessage, Notification, NotificationSeverity};

pub fn notifications() -> Vec<Notification> {
    let now = Utc::now();

    vec![
        Notification {
            notification_id: "9f1c2a7e-6a51-4c38-9d5f-2f3b8e0c1a01".to_string(),
            pipeline_id: None,
            severity: NotificationSeverity::Info,
            title: "Welcome".to_string(),
            message: "Mock mode is enabled, no real pipelines are deployed".to_string(),
            created_at: now - Duration::hours(2),
            read: false,
        },
        Notification {
            notification_id: "4b0d7c11-2e8f-4f6a-a1c4-7d9e3b2f5a02".to_string(),
            pipeline_id: Some("demo-dedup".to_string()),
            severity: NotificationSeverity::Warning,
            title: "Consumer lag".to_string(),
            message: "Ingestor lag exceeded 10000 messages on topic user_events".to_string(),
            created_at: now - Duration::minutes(30),
            read: true,
        },
    ]
}

pub fn dlq_messages(pipeline_id: &str) -> Vec<DlqMessage> {
    vec![
        DlqMessage {
            component: "ingestor".to_string(),
            error: "failed to parse message: unexpected end of JSON input".to_string(),
            original_message: r#"{"event_id":"e-1","user_id":"#.to_string(),
        },
        DlqMessage {
            component: "sink".to_string(),
            error: format!("pipeline {pipeline_id}: column user_id expects String, got Int64"),
            original_message: r#"{"event_id":"e-2","user_id":42}"#.to_string(),
        },
        DlqMessage {
            component: "join".to_string(),
            error: "join key field order_id missing".to_string(),
            original_message: r#"{"event_id":"e-3"}"#.to_string(),
        },
    ]
}

pub fn clickhouse_databases() -> Vec<String> {
    ["default", "analytics", "system"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn clickhouse_tables(database: &str) -> Vec<String> {
    let tables: &[&str] = match database {
        "default" => &["events", "users"],
        "analytics" => &["orders_enriched", "sessions"],
        "system" => &["tables", "columns", "parts"],
        _ => &[],
    };

    tables.iter().map(|table| table.to_string()).collect()
}

pub fn clickhouse_schema(database: &str, table: &str) -> Option<Vec<ColumnSchema>> {
    let columns: &[(&str, &str)] = match (database, table) {
        ("default", "events") => &[
            ("event_id", "String"),
            ("user_id", "String"),
            ("event_type", "LowCardinality(String)"),
            ("created_at", "DateTime64(3)"),
        ],
        ("default", "users") => &[
            ("user_id", "String"),
            ("name", "String"),
            ("email", "String"),
            ("signed_up_at", "DateTime"),
        ],
        ("analytics", "orders_enriched") => &[
            ("order_id", "UUID"),
            ("user_id", "String"),
            ("amount", "Float64"),
            ("currency", "FixedString(3)"),
            ("ordered_at", "DateTime"),
        ],
        ("analytics", "sessions") => &[
            ("session_id", "String"),
            ("user_id", "String"),
            ("duration_ms", "UInt64"),
        ],
        _ => return None,
    };

    Some(
        columns
            .iter()
            .map(|(name, column_type)| ColumnSchema {
                name: name.to_string(),
                column_type: column_type.to_string(),
                default_expression: None,
            })
            .collect(),
    )
}

pub fn kafka_topics() -> Vec<String> {
    ["user_events", "orders", "payments", "sessions"]
        .into_iter()
        .map(str::to_string)
        .collect()
}
