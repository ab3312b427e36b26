use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use mock_backend::MockPipelineService;
use std::sync::Arc;
use tracing::info;

use crate::{
    backend::{HttpBackend, PipelineBackend},
    config::Config,
    connections::{ConnectionProbe, LiveProbe},
    error::ApiError,
    extractors::auth::BearerToken,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn PipelineBackend>,
    pub connections: Arc<dyn ConnectionProbe>,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, reqwest::Error> {
        if config.mock_mode {
            info!("Mock mode: serving pipelines from in-process fixtures");
            return Ok(Self::mock(config, MockPipelineService::default()));
        }

        info!("Proxying pipeline requests to {}", config.api_url);

        Ok(Self {
            backend: Arc::new(HttpBackend::new(&config)?),
            connections: Arc::new(LiveProbe::new(config.request_timeout)?),
            config: Arc::new(config),
        })
    }

    pub fn mock(config: Config, service: MockPipelineService) -> Self {
        Self {
            backend: Arc::new(service.clone()),
            connections: Arc::new(service),
            config: Arc::new(config),
        }
    }
}

/// The backend acting for the caller, with its bearer token attached.
pub struct Backend(pub Arc<dyn PipelineBackend>);

#[async_trait]
impl<S> FromRequestParts<S> for Backend
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let state = AppState::from_ref(state);

        Ok(Self(state.backend.authorized(token)))
    }
}

pub struct Connections(pub Arc<dyn ConnectionProbe>);

#[async_trait]
impl<S> FromRequestParts<S> for Connections
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        BearerToken::from_request_parts(parts, state).await?;
        let state = AppState::from_ref(state);

        Ok(Self(state.connections.clone()))
    }
}
