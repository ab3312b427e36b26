use axum::async_trait;
use domain::dtos::{
    BackendErrorDetail, DlqMessage, DlqState, FilterValidationRequest, MarkNotificationsReadParams,
    MarkNotificationsReadResponse, Notification, NotificationQuery, Pipeline, PipelineActionResponse,
    PipelineConfig, PipelineHealth, PipelineListItem, PipelineStatus, PlatformInfo,
    TransformEvaluationRequest, UpdatePipelineNameParams,
};
use domain::LifecycleAction;
use hyper::StatusCode;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::PipelineBackend;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::utils::internal_error;

/// Forwards calls to the orchestration API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
    notification_url: Option<String>,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &Config) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            notification_url: config.notification_service_url.clone(),
            token: None,
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{method} {url}");
        let request = self.client.request(method, url);

        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn api(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = endpoint(&format!("{}/api/v1", self.api_url), segments)?;
        Ok(self.request(method, url))
    }

    fn notifications(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let Some(base) = &self.notification_url else {
            return Err(ApiError::unavailable("notification service is not configured"));
        };

        let url = endpoint(&format!("{base}/notifications"), segments)?;
        Ok(self.request(method, url))
    }
}

/// Appends `segments` to `base`, percent-encoding each one so ids cannot
/// reshape the path.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(internal_error)?;
    url.path_segments_mut()
        .map_err(|()| internal_error(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

/// Maps a request that never got an answer.
pub fn transport_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        warn!("Backend request timed out: {error}");
        ApiError::unavailable("backend request timed out")
    } else if error.is_connect() {
        warn!("Backend unreachable: {error}");
        ApiError::unavailable("backend unavailable")
    } else {
        internal_error(error)
    }
}

/// Maps a non-2xx answer, keeping the backend's message unless it is a 500.
pub async fn backend_error(response: Response) -> ApiError {
    let status = response.status();
    let detail = response
        .json::<BackendErrorDetail>()
        .await
        .unwrap_or_default();

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Backend failed: {detail:?}");
    } else {
        debug!("Backend answered {status}: {detail:?}");
    }

    detail.into_api_error(status.as_u16()).into()
}

async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await.map_err(transport_error)?;

    if response.status().is_success() {
        Ok(response)
    } else {
        Err(backend_error(response).await)
    }
}

async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    send(request).await?.json().await.map_err(internal_error)
}

#[async_trait]
impl PipelineBackend for HttpBackend {
    fn authorized(&self, token: Option<String>) -> Arc<dyn PipelineBackend> {
        Arc::new(Self {
            token,
            ..self.clone()
        })
    }

    async fn create_pipeline(&self, config: PipelineConfig) -> Result<String> {
        let requested_id = config.pipeline_id.clone();
        let response = send(self.api(Method::POST, &["pipeline"])?.json(&config)).await?;

        // Older backends answer with an empty body.
        let created: Value = response.json().await.unwrap_or(Value::Null);
        let pipeline_id = created
            .get("pipeline_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(requested_id);

        if pipeline_id.is_empty() {
            return Err(internal_error("backend did not return a pipeline id"));
        }

        Ok(pipeline_id)
    }

    async fn list_pipelines(&self) -> Result<Vec<PipelineListItem>> {
        json(self.api(Method::GET, &["pipeline"])?).await
    }

    async fn get_pipeline(&self, pipeline_id: &str) -> Result<Pipeline> {
        json(self.api(Method::GET, &["pipeline", pipeline_id])?).await
    }

    async fn update_pipeline_name(&self, pipeline_id: &str, name: &str) -> Result<()> {
        let params = UpdatePipelineNameParams {
            name: name.to_string(),
        };
        send(
            self.api(Method::PATCH, &["pipeline", pipeline_id])?
                .json(&params),
        )
        .await?;

        Ok(())
    }

    async fn edit_pipeline(&self, pipeline_id: &str, config: PipelineConfig) -> Result<()> {
        send(
            self.api(Method::POST, &["pipeline", pipeline_id, "edit"])?
                .json(&config),
        )
        .await?;

        Ok(())
    }

    async fn delete_pipeline(&self, pipeline_id: &str) -> Result<()> {
        send(self.api(Method::DELETE, &["pipeline", pipeline_id])?).await?;
        Ok(())
    }

    async fn apply_action(
        &self,
        pipeline_id: &str,
        action: LifecycleAction,
    ) -> Result<PipelineStatus> {
        let response = send(self.api(
            Method::POST,
            &["pipeline", pipeline_id, action.as_str()],
        )?)
        .await?;

        Ok(response
            .json::<PipelineActionResponse>()
            .await
            .map(|answer| answer.status)
            .unwrap_or_else(|_| action.optimistic_status()))
    }

    async fn pipeline_health(&self, pipeline_id: &str) -> Result<PipelineHealth> {
        json(self.api(Method::GET, &["pipeline", pipeline_id, "health"])?).await
    }

    async fn dlq_state(&self, pipeline_id: &str) -> Result<DlqState> {
        json(self.api(Method::GET, &["pipeline", pipeline_id, "dlq", "state"])?).await
    }

    async fn dlq_consume(
        &self,
        pipeline_id: &str,
        batch_size: Option<usize>,
    ) -> Result<Vec<DlqMessage>> {
        let mut request = self.api(Method::GET, &["pipeline", pipeline_id, "dlq", "consume"])?;
        if let Some(batch_size) = batch_size {
            request = request.query(&[("batch_size", batch_size)]);
        }

        let response = send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        response.json().await.map_err(internal_error)
    }

    async fn dlq_purge(&self, pipeline_id: &str) -> Result<()> {
        send(self.api(Method::POST, &["pipeline", pipeline_id, "dlq", "purge"])?).await?;
        Ok(())
    }

    async fn platform(&self) -> Result<PlatformInfo> {
        json(self.api(Method::GET, &["platform"])?).await
    }

    async fn validate_filter(&self, request: &FilterValidationRequest) -> Result<()> {
        send(self.api(Method::POST, &["filter", "validate"])?.json(request)).await?;
        Ok(())
    }

    async fn evaluate_transform(&self, request: &TransformEvaluationRequest) -> Result<Value> {
        json(
            self.api(Method::POST, &["transform", "expression", "evaluate"])?
                .json(request),
        )
        .await
    }

    async fn list_notifications(&self, query: &NotificationQuery) -> Result<Vec<Notification>> {
        json(self.notifications(Method::GET, &[])?.query(&query.to_pairs())).await
    }

    async fn get_notification(&self, notification_id: &str) -> Result<Notification> {
        json(self.notifications(Method::GET, &[notification_id])?).await
    }

    async fn delete_notification(&self, notification_id: &str) -> Result<()> {
        send(self.notifications(Method::DELETE, &[notification_id])?).await?;
        Ok(())
    }

    async fn mark_notifications_read(&self, notification_ids: &[String]) -> Result<usize> {
        let params = MarkNotificationsReadParams {
            notification_ids: notification_ids.to_vec(),
        };
        let response: MarkNotificationsReadResponse =
            json(self.notifications(Method::POST, &["mark-read"])?.json(&params)).await?;

        Ok(response.updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unreachable_backend() -> HttpBackend {
        HttpBackend::new(&Config {
            // Nothing listens on the discard port.
            api_url: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(2),
            ..Config::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn unreachable_backend_is_unavailable() {
        let error = unreachable_backend().list_pipelines().await.unwrap_err();

        assert_eq!(error.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.message, "backend unavailable");
    }

    #[tokio::test]
    async fn notifications_need_a_service_url() {
        let error = unreachable_backend()
            .list_notifications(&NotificationQuery::default())
            .await
            .unwrap_err();

        assert_eq!(error.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn ids_are_encoded_as_single_segments() {
        let url = endpoint(
            "http://backend:8081/api/v1",
            &["pipeline", "a/b?c#d", "health"],
        )
        .unwrap();

        assert_eq!(
            url.as_str(),
            "http://backend:8081/api/v1/pipeline/a%2Fb%3Fc%23d/health"
        );
    }

    #[test]
    fn trailing_slash_on_base_is_not_doubled() {
        let url = endpoint("http://notifications:8082/notifications/", &["n-1"]).unwrap();
        assert_eq!(url.as_str(), "http://notifications:8082/notifications/n-1");
    }

    #[test]
    fn action_answer_carries_transitional_status() {
        let body = serde_json::json!({ "success": true, "pipeline_id": "p", "status": "Pausing" });
        let parsed: PipelineActionResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.status, PipelineStatus::Pausing);
    }
}
