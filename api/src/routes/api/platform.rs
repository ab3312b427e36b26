use axum::Json;
use domain::dtos::PlatformInfo;

use crate::{app_state::Backend, error::Result};

pub async fn get(Backend(backend): Backend) -> Result<Json<PlatformInfo>> {
    Ok(Json(backend.platform().await?))
}
