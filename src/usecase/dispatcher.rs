use std::time::Duration;

use uuid::Uuid;

use crate::domain::notification::{Notification, NotificationStatus, NotificationType};
use crate::transport::email::render_html;
use crate::transport::queue::{EmailJob, EmailQueue};
use crate::transport::{DeliveryError, PushTransport};
use crate::usecase::contracts::{NotificationRepository, Notifier, UserRepository};
use crate::usecase::error::UsecaseError;

/// Persists a notification row, then hands it to its channel.
///
/// Email is queued for the background worker and its failures never reach
/// the caller. Push is awaited under `push_timeout`; a failure marks the row
/// FAILED and is returned. In-app needs nothing beyond the row.
pub struct NotificationDispatcher<N, U, P>
where
    N: NotificationRepository,
    U: UserRepository,
    P: PushTransport,
{
    notification_repository: N,
    user_repository: U,
    push_transport: P,
    email_queue: EmailQueue,
    push_timeout: Duration,
}

impl<N, U, P> NotificationDispatcher<N, U, P>
where
    N: NotificationRepository,
    U: UserRepository,
    P: PushTransport,
{
    pub fn new(
        notification_repository: N,
        user_repository: U,
        push_transport: P,
        email_queue: EmailQueue,
        push_timeout: Duration,
    ) -> Self {
        Self {
            notification_repository,
            user_repository,
            push_transport,
            email_queue,
            push_timeout,
        }
    }

    async fn deliver_push(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let send = self
            .push_transport
            .send(notification.user_id, &notification.title, &notification.body);

        match tokio::time::timeout(self.push_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(self.push_timeout)),
        }
    }
}

impl<N, U, P> Notifier for NotificationDispatcher<N, U, P>
where
    N: NotificationRepository,
    U: UserRepository,
    P: PushTransport,
{
    #[tracing::instrument(skip(self, title, body, data), fields(%recipient_id, %channel))]
    async fn dispatch(
        &self,
        recipient_id: Uuid,
        title: String,
        body: String,
        channel: NotificationType,
        data: serde_json::Value,
    ) -> Result<Notification, UsecaseError> {
        tracing::debug!("dispatching notification");

        match channel {
            NotificationType::Email => {
                let recipient = self
                    .user_repository
                    .find_by_id(recipient_id)
                    .await?
                    .ok_or_else(|| UsecaseError::NotFound("Recipient".to_string()))?;

                let notification = Notification::new(recipient_id, title, body, channel, data);
                self.notification_repository.create(&notification).await?;

                let queued = self.email_queue.submit(EmailJob {
                    notification_id: notification.id,
                    to: recipient.email,
                    subject: notification.title.clone(),
                    html: render_html(&notification.title, &notification.body),
                });

                metrics::counter!("notifications_dispatched_total", "channel" => channel.as_str(), "outcome" => "sent")
                    .increment(1);
                tracing::info!(notification_id = %notification.id, queued, "email notification recorded");
                Ok(notification)
            }
            NotificationType::Push => {
                let notification = Notification::new(recipient_id, title, body, channel, data);
                self.notification_repository.create(&notification).await?;

                if let Err(e) = self.deliver_push(&notification).await {
                    metrics::counter!("notifications_dispatched_total", "channel" => channel.as_str(), "outcome" => "failed")
                        .increment(1);
                    tracing::warn!(notification_id = %notification.id, error = %e, "push delivery failed");

                    if let Err(status_err) = self
                        .notification_repository
                        .set_status(notification.id, NotificationStatus::Failed)
                        .await
                    {
                        tracing::error!(
                            notification_id = %notification.id,
                            error = %status_err,
                            "failed to mark notification as failed"
                        );
                    }
                    return Err(e.into());
                }

                metrics::counter!("notifications_dispatched_total", "channel" => channel.as_str(), "outcome" => "sent")
                    .increment(1);
                tracing::info!(notification_id = %notification.id, "push notification delivered");
                Ok(notification)
            }
            NotificationType::InApp => {
                let notification = Notification::new(recipient_id, title, body, channel, data);
                self.notification_repository.create(&notification).await?;

                metrics::counter!("notifications_dispatched_total", "channel" => channel.as_str(), "outcome" => "sent")
                    .increment(1);
                tracing::info!(notification_id = %notification.id, "in-app notification recorded");
                Ok(notification)
            }
        }
    }
}
