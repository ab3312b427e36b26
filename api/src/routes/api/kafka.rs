use axum::Json;
use domain::dtos::{ConnectionTestResponse, KafkaConnectionParams, TopicsResponse};

use crate::{app_state::Connections, error::Result};

pub async fn test_connection(
    Connections(connections): Connections,
    Json(params): Json<KafkaConnectionParams>,
) -> Json<ConnectionTestResponse> {
    Json(match connections.kafka_ping(&params).await {
        Ok(()) => ConnectionTestResponse {
            success: true,
            message: "Successfully connected to Kafka".to_string(),
        },
        Err(error) => ConnectionTestResponse {
            success: false,
            message: error.message,
        },
    })
}

pub async fn topics(
    Connections(connections): Connections,
    Json(params): Json<KafkaConnectionParams>,
) -> Result<Json<TopicsResponse>> {
    Ok(Json(TopicsResponse {
        success: true,
        topics: connections.kafka_topics(&params).await?,
    }))
}
