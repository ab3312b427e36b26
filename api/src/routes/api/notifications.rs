use axum::{
    extract::{Path, Query},
    Json,
};
use domain::dtos::{
    MarkNotificationsReadParams, MarkNotificationsReadResponse, Notification, NotificationQuery,
};
use hyper::StatusCode;

use crate::{app_state::Backend, error::Result};

pub async fn list(
    Query(query): Query<NotificationQuery>,
    Backend(backend): Backend,
) -> Result<Json<Vec<Notification>>> {
    Ok(Json(backend.list_notifications(&query).await?))
}

pub async fn get(
    Path(notification_id): Path<String>,
    Backend(backend): Backend,
) -> Result<Json<Notification>> {
    Ok(Json(backend.get_notification(&notification_id).await?))
}

pub async fn delete(
    Path(notification_id): Path<String>,
    Backend(backend): Backend,
) -> Result<StatusCode> {
    backend.delete_notification(&notification_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_read(
    Backend(backend): Backend,
    Json(params): Json<MarkNotificationsReadParams>,
) -> Result<Json<MarkNotificationsReadResponse>> {
    let updated = backend
        .mark_notifications_read(&params.notification_ids)
        .await?;

    Ok(Json(MarkNotificationsReadResponse {
        success: true,
        updated,
    }))
}
