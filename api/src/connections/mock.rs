use axum::async_trait;
use domain::dtos::{ClickhouseConnectionParams, ColumnSchema, KafkaConnectionParams};
use mock_backend::MockPipelineService;

use super::{required, ConnectionProbe};
use crate::error::{ApiError, Result};

#[async_trait]
impl ConnectionProbe for MockPipelineService {
    async fn clickhouse_ping(&self, params: &ClickhouseConnectionParams) -> Result<()> {
        if params.host.trim().is_empty() {
            return Err(ApiError::bad_request("host is required"));
        }
        Ok(())
    }

    async fn clickhouse_databases(
        &self,
        params: &ClickhouseConnectionParams,
    ) -> Result<Vec<String>> {
        self.clickhouse_ping(params).await?;
        Ok(MockPipelineService::clickhouse_databases(self))
    }

    async fn clickhouse_tables(&self, params: &ClickhouseConnectionParams) -> Result<Vec<String>> {
        let database = required(&params.database, "database")?;
        Ok(MockPipelineService::clickhouse_tables(self, database))
    }

    async fn clickhouse_schema(
        &self,
        params: &ClickhouseConnectionParams,
    ) -> Result<Vec<ColumnSchema>> {
        let database = required(&params.database, "database")?;
        let table = required(&params.table, "table")?;

        Ok(MockPipelineService::clickhouse_schema(self, database, table)?)
    }

    async fn kafka_ping(&self, params: &KafkaConnectionParams) -> Result<()> {
        if params.brokers.iter().all(|broker| broker.trim().is_empty()) {
            return Err(ApiError::bad_request("at least one broker is required"));
        }
        Ok(())
    }

    async fn kafka_topics(&self, params: &KafkaConnectionParams) -> Result<Vec<String>> {
        self.kafka_ping(params).await?;
        Ok(MockPipelineService::kafka_topics(self))
    }
}
