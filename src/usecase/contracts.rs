use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::enquiry::{Enquiry, EnquiryFilter, EnquiryStatus};
use crate::domain::notification::{Notification, NotificationStatus, NotificationType};
use crate::domain::property::Property;
use crate::domain::user::{Audience, User};
use crate::repository::errors::RepositoryError;
use crate::usecase::error::UsecaseError;

#[cfg_attr(test, mockall::automock)]
pub trait EnquiryRepository: Send + Sync {
    /// Inserts `enquiry` unless the same guest already enquired about the
    /// same property at or after `since`. Check and insert are atomic.
    /// Returns `false` when the insert was skipped.
    async fn create_unless_recent(&self, enquiry: &Enquiry, since: DateTime<Utc>) -> Result<bool, RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Enquiry>, RepositoryError>;
    async fn find_latest_for_pair(&self, guest_id: Uuid, property_id: Uuid) -> Result<Option<Enquiry>, RepositoryError>;
    async fn find_many(&self, filter: &EnquiryFilter, limit: i64, offset: i64) -> Result<Vec<Enquiry>, RepositoryError>;
    async fn count(&self, filter: &EnquiryFilter) -> Result<i64, RepositoryError>;
    async fn count_by_status(&self, filter: &EnquiryFilter) -> Result<Vec<(EnquiryStatus, i64)>, RepositoryError>;
    /// Conditional update: applies only while the enquiry is PENDING.
    async fn respond_if_pending(
        &self,
        id: Uuid,
        response: &str,
        responded_at: DateTime<Utc>,
    ) -> Result<Option<Enquiry>, RepositoryError>;
    async fn update_status(&self, id: Uuid, status: EnquiryStatus) -> Result<Option<Enquiry>, RepositoryError>;
    /// Returns `true` if the flag flipped from unread to read.
    async fn mark_read(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait PropertyRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Property>, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
    async fn find_ids_by_audience(&self, audience: Audience) -> Result<Vec<Uuid>, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, RepositoryError>;
    async fn find_by_user_id(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Notification>, RepositoryError>;
    async fn count_unread(&self, user_id: Uuid) -> Result<i64, RepositoryError>;
    async fn count_by_status(&self, user_id: Uuid) -> Result<Vec<(NotificationStatus, i64)>, RepositoryError>;
    /// Moves a readable notification to READ. Returns `false` if it was
    /// already read or failed.
    async fn mark_as_read(&self, id: Uuid, read_at: DateTime<Utc>) -> Result<bool, RepositoryError>;
    async fn mark_all_as_read(&self, user_id: Uuid, read_at: DateTime<Utc>) -> Result<u64, RepositoryError>;
    async fn set_status(&self, id: Uuid, status: NotificationStatus) -> Result<(), RepositoryError>;
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}

/// Single-recipient notification delivery.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    async fn dispatch(
        &self,
        recipient_id: Uuid,
        title: String,
        body: String,
        channel: NotificationType,
        data: serde_json::Value,
    ) -> Result<Notification, UsecaseError>;
}

impl<T: Notifier> Notifier for std::sync::Arc<T> {
    async fn dispatch(
        &self,
        recipient_id: Uuid,
        title: String,
        body: String,
        channel: NotificationType,
        data: serde_json::Value,
    ) -> Result<Notification, UsecaseError> {
        (**self).dispatch(recipient_id, title, body, channel, data).await
    }
}
