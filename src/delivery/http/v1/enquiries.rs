use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::delivery::http::v1::middleware::AuthenticatedUser;
use crate::domain::enquiry::{EnquiryPriority, EnquiryStatus, NewEnquiry, PageRequest};
use crate::usecase::enquiries::{EnquiryQuery, MAX_RESPONSE_LENGTH};
use crate::usecase::error::UsecaseError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EnquiryListParams {
    pub status: Option<EnquiryStatus>,
    pub priority: Option<EnquiryPriority>,
    pub property_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl From<&EnquiryListParams> for EnquiryQuery {
    fn from(params: &EnquiryListParams) -> Self {
        EnquiryQuery {
            status: params.status,
            priority: params.priority,
            property_id: params.property_id,
            page: PageRequest::new(params.page, params.limit),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RespondRequest {
    #[validate(length(min = 1, max = 2000))]
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: EnquiryStatus,
}

#[tracing::instrument(skip(state, payload), fields(user_id = %user.user_id, property_id = %payload.property_id))]
pub async fn create_enquiry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<NewEnquiry>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling create enquiry request");

    if let Err(validation_errors) = payload.validate() {
        tracing::warn!(user_id = %user.user_id, ?validation_errors, "validation failed");
        return Err(UsecaseError::Validation(validation_errors.to_string()));
    }

    let details = state.enquiries_usecase.create(&user.actor(), payload).await?;

    tracing::debug!(enquiry_id = %details.enquiry.id, "enquiry created successfully");
    Ok((StatusCode::CREATED, Json(details)))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn list_enquiries(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<EnquiryListParams>,
) -> Result<impl IntoResponse, UsecaseError> {
    let page = state
        .enquiries_usecase
        .list_for_user(&user.actor(), EnquiryQuery::from(&params))
        .await?;

    tracing::debug!(count = page.items.len(), total = page.total, "enquiries listed");
    Ok((StatusCode::OK, Json(page)))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn enquiry_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, UsecaseError> {
    let stats = state.enquiries_usecase.stats(&user.actor()).await?;
    Ok((StatusCode::OK, Json(stats)))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id, enquiry_id = %id))]
pub async fn get_enquiry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    let details = state.enquiries_usecase.get_by_id(&user.actor(), id).await?;
    Ok((StatusCode::OK, Json(details)))
}

#[tracing::instrument(skip(state, payload), fields(user_id = %user.user_id, enquiry_id = %id))]
pub async fn respond_to_enquiry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RespondRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling respond request");

    if let Err(validation_errors) = payload.validate() {
        tracing::warn!(user_id = %user.user_id, ?validation_errors, "validation failed");
        return Err(UsecaseError::Validation(format!(
            "response must be between 1 and {MAX_RESPONSE_LENGTH} characters"
        )));
    }

    let enquiry = state
        .enquiries_usecase
        .respond(&user.actor(), id, payload.response)
        .await?;

    tracing::debug!(enquiry_id = %enquiry.id, "enquiry responded");
    Ok((StatusCode::OK, Json(enquiry)))
}

#[tracing::instrument(skip(state, payload), fields(user_id = %user.user_id, enquiry_id = %id))]
pub async fn update_enquiry_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    let enquiry = state
        .enquiries_usecase
        .update_status(&user.actor(), id, payload.status)
        .await?;

    Ok((StatusCode::OK, Json(enquiry)))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id, %property_id))]
pub async fn list_property_enquiries(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(property_id): Path<Uuid>,
    Query(params): Query<EnquiryListParams>,
) -> Result<impl IntoResponse, UsecaseError> {
    let page = state
        .enquiries_usecase
        .list_for_property(&user.actor(), property_id, EnquiryQuery::from(&params))
        .await?;

    tracing::debug!(count = page.items.len(), total = page.total, "property enquiries listed");
    Ok((StatusCode::OK, Json(page)))
}
