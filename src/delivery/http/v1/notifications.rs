use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::delivery::http::v1::middleware::AuthenticatedUser;
use crate::domain::enquiry::PageRequest;
use crate::usecase::error::UsecaseError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<NotificationListParams>,
) -> Result<impl IntoResponse, UsecaseError> {
    let request = PageRequest::new(params.page, params.limit);
    tracing::debug!(page = request.page, limit = request.limit, "listing notifications");

    let page = state
        .notifications_usecase
        .list_notifications(&user.actor(), request)
        .await?;

    tracing::debug!(count = page.items.len(), "notifications listed");
    Ok((StatusCode::OK, Json(page)))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn get_unread_count(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, UsecaseError> {
    let unread_count = state.notifications_usecase.count_unread(&user.actor()).await?;

    tracing::debug!(unread_count, "unread count retrieved");
    Ok((StatusCode::OK, Json(UnreadCountResponse { unread_count })))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn notification_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, UsecaseError> {
    let stats = state.notifications_usecase.stats(&user.actor()).await?;
    Ok((StatusCode::OK, Json(stats)))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id, notification_id = %id))]
pub async fn mark_as_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    state.notifications_usecase.mark_as_read(&user.actor(), id).await?;

    tracing::debug!(notification_id = %id, "notification marked as read");
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn mark_all_as_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, UsecaseError> {
    let updated = state.notifications_usecase.mark_all_as_read(&user.actor()).await?;

    tracing::debug!(updated, "all notifications marked as read");
    Ok((StatusCode::OK, Json(MarkAllReadResponse { updated })))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id, notification_id = %id))]
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    state.notifications_usecase.delete(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
