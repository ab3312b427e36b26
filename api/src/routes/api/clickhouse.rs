use axum::Json;
use domain::dtos::{
    ClickhouseConnectionParams, ConnectionTestResponse, DatabasesResponse, TableSchemaResponse,
    TablesResponse,
};

use crate::{app_state::Connections, error::Result};

/// Connection failures are part of the answer, not an error status.
pub async fn test_connection(
    Connections(connections): Connections,
    Json(params): Json<ClickhouseConnectionParams>,
) -> Json<ConnectionTestResponse> {
    Json(match connections.clickhouse_ping(&params).await {
        Ok(()) => ConnectionTestResponse {
            success: true,
            message: "Successfully connected to ClickHouse".to_string(),
        },
        Err(error) => ConnectionTestResponse {
            success: false,
            message: error.message,
        },
    })
}

pub async fn databases(
    Connections(connections): Connections,
    Json(params): Json<ClickhouseConnectionParams>,
) -> Result<Json<DatabasesResponse>> {
    Ok(Json(DatabasesResponse {
        success: true,
        databases: connections.clickhouse_databases(&params).await?,
    }))
}

pub async fn tables(
    Connections(connections): Connections,
    Json(params): Json<ClickhouseConnectionParams>,
) -> Result<Json<TablesResponse>> {
    Ok(Json(TablesResponse {
        success: true,
        tables: connections.clickhouse_tables(&params).await?,
    }))
}

pub async fn schema(
    Connections(connections): Connections,
    Json(params): Json<ClickhouseConnectionParams>,
) -> Result<Json<TableSchemaResponse>> {
    Ok(Json(TableSchemaResponse {
        success: true,
        columns: connections.clickhouse_schema(&params).await?,
    }))
}
