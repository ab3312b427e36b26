mod clickhouse;
mod kafka;
mod mock;

pub use clickhouse::ClickhouseClient;
pub use kafka::KafkaProbe;

use axum::async_trait;
use domain::dtos::{ClickhouseConnectionParams, ColumnSchema, KafkaConnectionParams};
use std::time::Duration;

use crate::error::{ApiError, Result};

/// Reaches the sources and sinks a pipeline will be wired to, so the
/// wizard can check credentials and offer databases, tables and topics.
#[async_trait]
pub trait ConnectionProbe: Send + Sync {
    async fn clickhouse_ping(&self, params: &ClickhouseConnectionParams) -> Result<()>;

    async fn clickhouse_databases(&self, params: &ClickhouseConnectionParams)
        -> Result<Vec<String>>;

    async fn clickhouse_tables(&self, params: &ClickhouseConnectionParams) -> Result<Vec<String>>;

    async fn clickhouse_schema(
        &self,
        params: &ClickhouseConnectionParams,
    ) -> Result<Vec<ColumnSchema>>;

    async fn kafka_ping(&self, params: &KafkaConnectionParams) -> Result<()>;

    async fn kafka_topics(&self, params: &KafkaConnectionParams) -> Result<Vec<String>>;
}

/// Talks to the real ClickHouse and Kafka endpoints.
#[derive(Debug, Clone)]
pub struct LiveProbe {
    clickhouse: ClickhouseClient,
    kafka: KafkaProbe,
}

impl LiveProbe {
    pub fn new(timeout: Duration) -> std::result::Result<Self, reqwest::Error> {
        Ok(Self {
            clickhouse: ClickhouseClient::new(timeout)?,
            kafka: KafkaProbe::new(timeout),
        })
    }
}

#[async_trait]
impl ConnectionProbe for LiveProbe {
    async fn clickhouse_ping(&self, params: &ClickhouseConnectionParams) -> Result<()> {
        self.clickhouse.ping(params).await
    }

    async fn clickhouse_databases(
        &self,
        params: &ClickhouseConnectionParams,
    ) -> Result<Vec<String>> {
        self.clickhouse.databases(params).await
    }

    async fn clickhouse_tables(&self, params: &ClickhouseConnectionParams) -> Result<Vec<String>> {
        self.clickhouse
            .tables(params, required(&params.database, "database")?)
            .await
    }

    async fn clickhouse_schema(
        &self,
        params: &ClickhouseConnectionParams,
    ) -> Result<Vec<ColumnSchema>> {
        self.clickhouse
            .schema(
                params,
                required(&params.database, "database")?,
                required(&params.table, "table")?,
            )
            .await
    }

    async fn kafka_ping(&self, params: &KafkaConnectionParams) -> Result<()> {
        self.kafka.topics(params).await.map(|_| ())
    }

    async fn kafka_topics(&self, params: &KafkaConnectionParams) -> Result<Vec<String>> {
        self.kafka.topics(params).await
    }
}

pub(crate) fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ApiError::bad_request(format!("{name} is required"))),
    }
}
