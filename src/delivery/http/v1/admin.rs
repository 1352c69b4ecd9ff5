use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::delivery::http::v1::middleware::AuthenticatedUser;
use crate::domain::enquiry::{EnquiryPriority, EnquiryStatus, PageRequest};
use crate::domain::notification::NotificationType;
use crate::domain::user::Audience;
use crate::usecase::enquiries::EnquiryQuery;
use crate::usecase::error::UsecaseError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AdminEnquiryListParams {
    pub status: Option<EnquiryStatus>,
    pub priority: Option<EnquiryPriority>,
    pub property_id: Option<Uuid>,
    pub guest_id: Option<Uuid>,
    pub host_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BroadcastRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    #[serde(alias = "message")]
    pub body: String,
    #[validate(custom(function = "validate_broadcast_channel"))]
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default = "default_audience", alias = "targetUsers")]
    pub target_users: Audience,
}

fn default_audience() -> Audience {
    Audience::All
}

fn validate_broadcast_channel(channel: &NotificationType) -> Result<(), ValidationError> {
    match channel {
        NotificationType::Email | NotificationType::Push => Ok(()),
        NotificationType::InApp => Err(ValidationError::new("broadcast_channel")
            .with_message("broadcasts go out by EMAIL or PUSH".into())),
    }
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn list_all_enquiries(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<AdminEnquiryListParams>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("listing all enquiries for admin");

    let query = EnquiryQuery {
        status: params.status,
        priority: params.priority,
        property_id: params.property_id,
        page: PageRequest::new(params.page, params.limit),
    };
    let page = state
        .enquiries_usecase
        .list_all(&user.actor(), query, params.guest_id, params.host_id)
        .await?;

    Ok((StatusCode::OK, Json(page)))
}

#[tracing::instrument(skip(state, payload), fields(user_id = %user.user_id))]
pub async fn broadcast_notification(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<BroadcastRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling broadcast request");

    if let Err(validation_errors) = payload.validate() {
        tracing::warn!(user_id = %user.user_id, ?validation_errors, "validation failed");
        return Err(UsecaseError::Validation(validation_errors.to_string()));
    }

    let report = state
        .broadcast_coordinator
        .broadcast(
            &user.actor(),
            payload.title,
            payload.body,
            payload.notification_type,
            payload.target_users,
        )
        .await?;

    Ok((StatusCode::OK, Json(report)))
}
