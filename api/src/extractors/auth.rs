use axum::extract::FromRef;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{app_state::AppState, error::ApiError};

/// The caller's bearer token. Required when auth is enabled, passed along
/// untouched otherwise.
pub struct BearerToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string());

        let state = AppState::from_ref(state);

        match header {
            Some(token) => Ok(Self(Some(token))),
            None if state.config.auth_enabled => Err(ApiError::unauthorized(
                "Missing or invalid Authorization header",
            )),
            None => Ok(Self(None)),
        }
    }
}
