//! ClickHouse over its HTTP interface: every query is a POST body and
//! results come back as `FORMAT JSON`.

use domain::dtos::{ClickhouseConnectionParams, ColumnSchema};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ApiError, Result};

#[derive(Deserialize)]
struct JsonRows<T> {
    data: Vec<T>,
}

#[derive(Deserialize)]
struct NameRow {
    name: String,
}

#[derive(Deserialize)]
struct DescribeRow {
    name: String,
    #[serde(rename = "type")]
    column_type: String,
    #[serde(default)]
    default_expression: String,
}

#[derive(Debug, Clone)]
pub struct ClickhouseClient {
    client: reqwest::Client,
}

fn endpoint(params: &ClickhouseConnectionParams) -> String {
    let host = params
        .host
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    let scheme = if params.use_ssl { "https" } else { "http" };

    format!("{scheme}://{host}:{}/", params.http_port)
}

/// Backtick-quotes an identifier.
fn quote(identifier: &str) -> String {
    format!("`{}`", identifier.replace('\\', "\\\\").replace('`', "\\`"))
}

impl ClickhouseClient {
    pub fn new(timeout: Duration) -> std::result::Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    async fn query(&self, params: &ClickhouseConnectionParams, sql: String) -> Result<String> {
        if params.host.trim().is_empty() {
            return Err(ApiError::bad_request("host is required"));
        }

        debug!("ClickHouse query on {}: {sql}", params.host);

        let response = self
            .client
            .post(endpoint(params))
            .header("X-ClickHouse-User", &params.username)
            .header("X-ClickHouse-Key", &params.password)
            .body(sql)
            .send()
            .await
            .map_err(|error| {
                warn!("ClickHouse unreachable: {error}");
                ApiError::bad_request(format!("failed to connect to ClickHouse: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            ApiError::bad_request(format!("failed to read ClickHouse response: {error}"))
        })?;

        if !status.is_success() {
            return Err(ApiError::bad_request(format!(
                "ClickHouse answered {status}: {}",
                body.trim()
            )));
        }

        Ok(body)
    }

    async fn rows<T: DeserializeOwned>(
        &self,
        params: &ClickhouseConnectionParams,
        sql: String,
    ) -> Result<Vec<T>> {
        let body = self.query(params, format!("{sql} FORMAT JSON")).await?;

        serde_json::from_str::<JsonRows<T>>(&body)
            .map(|rows| rows.data)
            .map_err(|error| {
                ApiError::bad_request(format!("unexpected ClickHouse response: {error}"))
            })
    }

    pub async fn ping(&self, params: &ClickhouseConnectionParams) -> Result<()> {
        self.query(params, "SELECT 1".to_string()).await.map(|_| ())
    }

    pub async fn databases(&self, params: &ClickhouseConnectionParams) -> Result<Vec<String>> {
        let rows: Vec<NameRow> = self.rows(params, "SHOW DATABASES".to_string()).await?;
        Ok(rows.into_iter().map(|row| row.name).collect())
    }

    pub async fn tables(
        &self,
        params: &ClickhouseConnectionParams,
        database: &str,
    ) -> Result<Vec<String>> {
        let rows: Vec<NameRow> = self
            .rows(params, format!("SHOW TABLES FROM {}", quote(database)))
            .await?;
        Ok(rows.into_iter().map(|row| row.name).collect())
    }

    pub async fn schema(
        &self,
        params: &ClickhouseConnectionParams,
        database: &str,
        table: &str,
    ) -> Result<Vec<ColumnSchema>> {
        let rows: Vec<DescribeRow> = self
            .rows(
                params,
                format!("DESCRIBE TABLE {}.{}", quote(database), quote(table)),
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ColumnSchema {
                name: row.name,
                column_type: row.column_type,
                default_expression: Some(row.default_expression)
                    .filter(|expression| !expression.is_empty()),
            })
            .collect())
    }
}
