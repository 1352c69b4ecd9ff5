use chrono::Utc;
use uuid::Uuid;

use crate::domain::enquiry::{Page, PageRequest};
use crate::domain::notification::{Notification, NotificationStats};
use crate::usecase::access::{authorize, Action, Actor, Resource};
use crate::usecase::contracts::NotificationRepository;
use crate::usecase::error::UsecaseError;

pub struct NotificationsUseCase<N>
where
    N: NotificationRepository,
{
    notification_repository: N,
}

impl<N> NotificationsUseCase<N>
where
    N: NotificationRepository,
{
    pub fn new(notification_repository: N) -> Self {
        Self { notification_repository }
    }

    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id, page = request.page, limit = request.limit))]
    pub async fn list_notifications(
        &self,
        actor: &Actor,
        request: PageRequest,
    ) -> Result<Page<Notification>, UsecaseError> {
        tracing::debug!("listing notifications");

        let notifications = self
            .notification_repository
            .find_by_user_id(actor.user_id, request.limit, request.offset())
            .await?;
        let stats = NotificationStats::from_counts(&self.notification_repository.count_by_status(actor.user_id).await?);

        tracing::debug!(count = notifications.len(), total = stats.total, "retrieved notifications");
        Ok(Page::new(notifications, request, stats.total))
    }

    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn count_unread(&self, actor: &Actor) -> Result<i64, UsecaseError> {
        tracing::debug!("counting unread notifications");

        let count = self.notification_repository.count_unread(actor.user_id).await?;

        tracing::debug!(count, "unread count retrieved");
        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn stats(&self, actor: &Actor) -> Result<NotificationStats, UsecaseError> {
        let counts = self.notification_repository.count_by_status(actor.user_id).await?;
        Ok(NotificationStats::from_counts(&counts))
    }

    /// UNREAD and SENT move to READ. Reading an already read notification is
    /// a no-op.
    #[tracing::instrument(skip(self), fields(notification_id = %id, user_id = %actor.user_id))]
    pub async fn mark_as_read(&self, actor: &Actor, id: Uuid) -> Result<(), UsecaseError> {
        tracing::debug!("marking notification as read");

        let notification = self
            .notification_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Notification".to_string()))?;

        authorize(actor, Resource::Notification(&notification), Action::ManageNotification)?;

        if !notification.status.is_readable() {
            tracing::debug!(status = ?notification.status, "notification not in a readable state");
            return Ok(());
        }

        let updated = self.notification_repository.mark_as_read(id, Utc::now()).await?;

        tracing::debug!(notification_id = %id, updated, "notification marked as read");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn mark_all_as_read(&self, actor: &Actor) -> Result<u64, UsecaseError> {
        tracing::debug!("marking all notifications as read");

        let updated = self
            .notification_repository
            .mark_all_as_read(actor.user_id, Utc::now())
            .await?;

        tracing::debug!(updated, "all notifications marked as read");
        Ok(updated)
    }

    #[tracing::instrument(skip(self), fields(notification_id = %id, user_id = %actor.user_id))]
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), UsecaseError> {
        let notification = self
            .notification_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Notification".to_string()))?;

        authorize(actor, Resource::Notification(&notification), Action::ManageNotification)?;

        self.notification_repository.delete(id).await?;

        tracing::info!(notification_id = %id, "notification deleted");
        Ok(())
    }
}
