use futures::stream::{self, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::notification::{events, NotificationType};
use crate::domain::user::Audience;
use crate::usecase::access::{authorize, Action, Actor, Resource};
use crate::usecase::contracts::{Notifier, UserRepository};
use crate::usecase::error::UsecaseError;

pub const DEFAULT_BROADCAST_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipientResult {
    pub user_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BroadcastReport {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<RecipientResult>,
}

impl BroadcastReport {
    fn from_results(results: Vec<RecipientResult>) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            success_count,
            failure_count: results.len() - success_count,
            results,
        }
    }
}

/// Fans one admin message out to every member of an audience.
///
/// Each recipient is dispatched on its own; a failure is recorded in the
/// report and never stops the rest. At most `concurrency` dispatches run at
/// once and results come back in completion order.
pub struct BroadcastCoordinator<U, D>
where
    U: UserRepository,
    D: Notifier,
{
    user_repository: U,
    notifier: D,
    concurrency: usize,
}

impl<U, D> BroadcastCoordinator<U, D>
where
    U: UserRepository,
    D: Notifier,
{
    pub fn new(user_repository: U, notifier: D, concurrency: usize) -> Self {
        Self {
            user_repository,
            notifier,
            concurrency: concurrency.max(1),
        }
    }

    #[tracing::instrument(skip(self, title, body), fields(admin_id = %actor.user_id, %channel, ?audience))]
    pub async fn broadcast(
        &self,
        actor: &Actor,
        title: String,
        body: String,
        channel: NotificationType,
        audience: Audience,
    ) -> Result<BroadcastReport, UsecaseError> {
        authorize(actor, Resource::Platform, Action::Broadcast)?;

        let recipients = self.user_repository.find_ids_by_audience(audience).await?;
        tracing::info!(recipients = recipients.len(), "starting broadcast");

        let data = serde_json::json!({
            "event": events::BROADCAST,
            "audience": audience,
            "sent_by": actor.user_id,
        });

        let results: Vec<RecipientResult> = stream::iter(recipients)
            .map(|user_id| {
                let title = title.clone();
                let body = body.clone();
                let data = data.clone();
                async move {
                    match self.notifier.dispatch(user_id, title, body, channel, data).await {
                        Ok(_) => RecipientResult {
                            user_id,
                            success: true,
                            error: None,
                        },
                        Err(e) => {
                            tracing::warn!(%user_id, error = %e, "broadcast delivery failed for recipient");
                            RecipientResult {
                                user_id,
                                success: false,
                                error: Some(e.to_string()),
                            }
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let report = BroadcastReport::from_results(results);
        metrics::counter!("broadcasts_total").increment(1);
        tracing::info!(
            total = report.total,
            success_count = report.success_count,
            failure_count = report.failure_count,
            "broadcast finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::notification::Notification;
    use crate::domain::user::Role;
    use crate::transport::DeliveryError;
    use crate::usecase::contracts::{MockNotifier, MockUserRepository};

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Admin)
    }

    fn notification(user_id: Uuid, channel: NotificationType) -> Notification {
        Notification::new(user_id, "t".to_string(), "b".to_string(), channel, serde_json::json!({}))
    }

    #[tokio::test]
    async fn test_broadcast_isolates_failures() {
        let recipients: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let failing: HashSet<Uuid> = [recipients[0], recipients[3]].into_iter().collect();

        let mut mock_users = MockUserRepository::new();
        let ids = recipients.clone();
        mock_users
            .expect_find_ids_by_audience()
            .with(mockall::predicate::eq(Audience::Hosts))
            .times(1)
            .returning(move |_| Ok(ids.clone()));

        let mut mock_notifier = MockNotifier::new();
        let fail_set = failing.clone();
        mock_notifier
            .expect_dispatch()
            .times(5)
            .returning(move |user_id, _, _, channel, _| {
                if fail_set.contains(&user_id) {
                    Err(UsecaseError::Delivery(DeliveryError::HttpStatus(503)))
                } else {
                    Ok(notification(user_id, channel))
                }
            });

        let coordinator = BroadcastCoordinator::new(mock_users, mock_notifier, 2);
        let report = coordinator
            .broadcast(&admin(), "Maintenance".into(), "Tonight".into(), NotificationType::Push, Audience::Hosts)
            .await
            .unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.results.len(), 5);
        assert_eq!(report.success_count, 3);
        assert_eq!(report.failure_count, 2);
        assert_eq!(report.success_count + report.failure_count, report.total);

        let attempted: HashSet<Uuid> = report.results.iter().map(|r| r.user_id).collect();
        assert_eq!(attempted, recipients.iter().copied().collect());

        for result in &report.results {
            assert_eq!(result.success, !failing.contains(&result.user_id));
            assert_eq!(result.error.is_some(), failing.contains(&result.user_id));
        }
    }

    #[tokio::test]
    async fn test_broadcast_all_fail_still_reports_everyone() {
        let recipients: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        let mut mock_users = MockUserRepository::new();
        let ids = recipients.clone();
        mock_users.expect_find_ids_by_audience().returning(move |_| Ok(ids.clone()));

        let mut mock_notifier = MockNotifier::new();
        mock_notifier
            .expect_dispatch()
            .times(3)
            .returning(|_, _, _, _, _| Err(UsecaseError::NotFound("Recipient".to_string())));

        let coordinator = BroadcastCoordinator::new(mock_users, mock_notifier, 1);
        let report = coordinator
            .broadcast(&admin(), "t".into(), "b".into(), NotificationType::Email, Audience::All)
            .await
            .unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.failure_count, 3);
        assert_eq!(report.results[0].error.as_deref(), Some("Recipient not found"));
    }

    #[tokio::test]
    async fn test_broadcast_empty_audience() {
        let mut mock_users = MockUserRepository::new();
        mock_users.expect_find_ids_by_audience().returning(|_| Ok(vec![]));
        let mut mock_notifier = MockNotifier::new();
        mock_notifier.expect_dispatch().never();

        let coordinator = BroadcastCoordinator::new(mock_users, mock_notifier, DEFAULT_BROADCAST_CONCURRENCY);
        let report = coordinator
            .broadcast(&admin(), "t".into(), "b".into(), NotificationType::Email, Audience::Guests)
            .await
            .unwrap();

        assert_eq!(report.total, 0);
        assert!(report.results.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_requires_admin() {
        let mut mock_users = MockUserRepository::new();
        mock_users.expect_find_ids_by_audience().never();

        let coordinator = BroadcastCoordinator::new(mock_users, MockNotifier::new(), 4);
        let host = Actor::new(Uuid::new_v4(), Role::Host);
        let result = coordinator
            .broadcast(&host, "t".into(), "b".into(), NotificationType::Email, Audience::All)
            .await;

        assert!(matches!(result, Err(UsecaseError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_broadcast_audience_lookup_failure_is_fatal() {
        let mut mock_users = MockUserRepository::new();
        mock_users.expect_find_ids_by_audience().returning(|_| {
            Err(crate::repository::errors::RepositoryError::DatabaseError("timeout".to_string()))
        });

        let coordinator = BroadcastCoordinator::new(mock_users, MockNotifier::new(), 4);
        let result = coordinator
            .broadcast(&admin(), "t".into(), "b".into(), NotificationType::Email, Audience::All)
            .await;

        assert!(matches!(result, Err(UsecaseError::Internal(_))));
    }
}
