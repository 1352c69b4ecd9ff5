use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::repository::errors::RepositoryError;
use crate::usecase::contracts::EnquiryRepository;

pub const DEFAULT_DEDUP_WINDOW_HOURS: i64 = 24;

/// Advisory "one enquiry per guest and property per window" check.
///
/// This is a pure read. Two concurrent callers can both be allowed; the
/// insert itself is guarded by [`EnquiryRepository::create_unless_recent`].
pub struct RateLimiter<E>
where
    E: EnquiryRepository,
{
    enquiry_repository: E,
    window: Duration,
}

impl<E> RateLimiter<E>
where
    E: EnquiryRepository,
{
    pub fn new(enquiry_repository: E, window: Duration) -> Self {
        Self { enquiry_repository, window }
    }

    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }

    #[tracing::instrument(skip(self), fields(%guest_id, %property_id))]
    pub async fn allow(
        &self,
        guest_id: Uuid,
        property_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let latest = self
            .enquiry_repository
            .find_latest_for_pair(guest_id, property_id)
            .await?;

        let allowed = match latest {
            Some(enquiry) => enquiry.created_at < self.window_start(now),
            None => true,
        };

        tracing::debug!(allowed, "rate limit checked");
        Ok(allowed)
    }
}
