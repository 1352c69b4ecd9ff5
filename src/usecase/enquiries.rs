use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::enquiry::{
    Enquiry, EnquiryDetails, EnquiryFilter, EnquiryPriority, EnquiryStats, EnquiryStatus, NewEnquiry, Page,
    PageRequest, StatusBreakdown,
};
use crate::domain::notification::{events, NotificationType};
use crate::domain::user::Role;
use crate::usecase::access::{authorize, Action, Actor, Resource};
use crate::usecase::contracts::{EnquiryRepository, Notifier, PropertyRepository, UserRepository};
use crate::usecase::error::UsecaseError;
use crate::usecase::rate_limiter::RateLimiter;

pub const MAX_RESPONSE_LENGTH: usize = 2000;

const DUPLICATE_ENQUIRY_MESSAGE: &str =
    "You have already sent an enquiry for this property in the last 24 hours";

/// Optional equality filters plus paging for enquiry listings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnquiryQuery {
    pub status: Option<EnquiryStatus>,
    pub priority: Option<EnquiryPriority>,
    pub property_id: Option<Uuid>,
    pub page: PageRequest,
}

impl Default for EnquiryQuery {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            property_id: None,
            page: PageRequest::new(None, None),
        }
    }
}

impl EnquiryQuery {
    fn apply(&self, filter: &mut EnquiryFilter) {
        filter.status = self.status;
        filter.priority = self.priority;
        if self.property_id.is_some() {
            filter.property_id = self.property_id;
        }
    }
}

/// Hosts (and admins) see enquiries addressed to them, guests their own.
fn scope_for(actor: &Actor) -> EnquiryFilter {
    match actor.role {
        Role::Guest => EnquiryFilter {
            guest_id: Some(actor.user_id),
            ..Default::default()
        },
        Role::Host | Role::Admin => EnquiryFilter {
            host_id: Some(actor.user_id),
            ..Default::default()
        },
    }
}

pub struct EnquiriesUseCase<E, R, U, D>
where
    E: EnquiryRepository,
    R: PropertyRepository,
    U: UserRepository,
    D: Notifier,
{
    enquiry_repository: E,
    property_repository: R,
    user_repository: U,
    notifier: D,
    rate_limiter: RateLimiter<E>,
    event_channel: NotificationType,
}

impl<E, R, U, D> EnquiriesUseCase<E, R, U, D>
where
    E: EnquiryRepository,
    R: PropertyRepository,
    U: UserRepository,
    D: Notifier,
{
    pub fn new(
        enquiry_repository: E,
        property_repository: R,
        user_repository: U,
        notifier: D,
        rate_limiter: RateLimiter<E>,
    ) -> Self {
        Self {
            enquiry_repository,
            property_repository,
            user_repository,
            notifier,
            rate_limiter,
            event_channel: NotificationType::Email,
        }
    }

    /// Channel used for new-enquiry and response notifications.
    pub fn with_event_channel(mut self, channel: NotificationType) -> Self {
        self.event_channel = channel;
        self
    }

    #[tracing::instrument(skip(self, input), fields(guest_id = %actor.user_id, property_id = %input.property_id))]
    pub async fn create(&self, actor: &Actor, input: NewEnquiry) -> Result<EnquiryDetails, UsecaseError> {
        tracing::debug!("creating enquiry");

        input.validate()?;

        let property = self
            .property_repository
            .find_by_id(input.property_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Property".to_string()))?;

        if !property.is_available {
            tracing::debug!(property_id = %property.id, "property is not available");
            return Err(UsecaseError::PropertyUnavailable(
                "Property is not available for enquiries".to_string(),
            ));
        }

        let guest = self
            .user_repository
            .find_by_id(actor.user_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Guest".to_string()))?;

        authorize(actor, Resource::Property(&property), Action::CreateEnquiry)?;

        let now = Utc::now();
        if !self.rate_limiter.allow(guest.id, property.id, now).await? {
            metrics::counter!("enquiries_rate_limited_total").increment(1);
            tracing::info!("duplicate enquiry inside dedup window");
            return Err(UsecaseError::RateLimited(DUPLICATE_ENQUIRY_MESSAGE.to_string()));
        }

        let host = self
            .user_repository
            .find_by_id(property.host_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Host".to_string()))?;

        let enquiry = Enquiry::new(guest.id, &property, input);
        let created = self
            .enquiry_repository
            .create_unless_recent(&enquiry, self.rate_limiter.window_start(now))
            .await?;

        // A concurrent create for the same pair won the race.
        if !created {
            metrics::counter!("enquiries_rate_limited_total").increment(1);
            tracing::info!("duplicate enquiry rejected by storage guard");
            return Err(UsecaseError::RateLimited(DUPLICATE_ENQUIRY_MESSAGE.to_string()));
        }

        metrics::counter!("enquiries_created_total").increment(1);
        tracing::info!(enquiry_id = %enquiry.id, host_id = %enquiry.host_id, "enquiry created");

        self.notifier
            .dispatch(
                host.id,
                "New Enquiry".to_string(),
                format!(
                    "{} sent you an enquiry about \"{}\": {}",
                    guest.full_name(),
                    property.title,
                    enquiry.subject
                ),
                self.event_channel,
                serde_json::json!({
                    "event": events::NEW_ENQUIRY,
                    "enquiry_id": enquiry.id,
                    "property_id": property.id,
                    "guest_id": guest.id,
                }),
            )
            .await?;

        Ok(EnquiryDetails {
            enquiry,
            property: Some(property.summary()),
            guest: Some(guest.summary()),
            host: Some(host.summary()),
        })
    }

    #[tracing::instrument(skip(self, response), fields(%enquiry_id, host_id = %actor.user_id))]
    pub async fn respond(&self, actor: &Actor, enquiry_id: Uuid, response: String) -> Result<Enquiry, UsecaseError> {
        tracing::debug!("responding to enquiry");

        let response = response.trim().to_string();
        if response.is_empty() || response.chars().count() > MAX_RESPONSE_LENGTH {
            return Err(UsecaseError::Validation(format!(
                "response must be between 1 and {MAX_RESPONSE_LENGTH} characters"
            )));
        }

        let enquiry = self
            .enquiry_repository
            .find_by_id(enquiry_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Enquiry".to_string()))?;

        authorize(actor, Resource::Enquiry(&enquiry), Action::RespondToEnquiry)?;

        match enquiry.status {
            EnquiryStatus::Pending => {}
            EnquiryStatus::Responded => {
                return Err(UsecaseError::Conflict("Enquiry has already been responded to".to_string()));
            }
            closed => {
                return Err(UsecaseError::Conflict(format!(
                    "Enquiry is {closed} and can no longer be responded to"
                )));
            }
        }

        let updated = self
            .enquiry_repository
            .respond_if_pending(enquiry_id, &response, Utc::now())
            .await?
            .ok_or_else(|| {
                tracing::info!("enquiry left PENDING before the conditional update");
                UsecaseError::Conflict("Enquiry is no longer pending".to_string())
            })?;

        metrics::counter!("enquiries_responded_total").increment(1);
        tracing::info!(%enquiry_id, "enquiry responded");

        self.notifier
            .dispatch(
                updated.guest_id,
                "Enquiry Response".to_string(),
                format!("The host has responded to your enquiry \"{}\"", updated.subject),
                self.event_channel,
                serde_json::json!({
                    "event": events::ENQUIRY_RESPONDED,
                    "enquiry_id": updated.id,
                    "property_id": updated.property_id,
                }),
            )
            .await?;

        Ok(updated)
    }

    /// Unguarded overwrite. Unlike [`Self::respond`], this may move a
    /// RESPONDED enquiry back to PENDING.
    #[tracing::instrument(skip(self), fields(%enquiry_id, actor_id = %actor.user_id, %status))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        enquiry_id: Uuid,
        status: EnquiryStatus,
    ) -> Result<Enquiry, UsecaseError> {
        tracing::debug!("updating enquiry status");

        let enquiry = self
            .enquiry_repository
            .find_by_id(enquiry_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Enquiry".to_string()))?;

        authorize(actor, Resource::Enquiry(&enquiry), Action::UpdateEnquiryStatus)?;

        if enquiry.is_responded() && status == EnquiryStatus::Pending {
            tracing::info!(%enquiry_id, "re-opening a responded enquiry");
        }

        let updated = self
            .enquiry_repository
            .update_status(enquiry_id, status)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Enquiry".to_string()))?;

        tracing::info!(%enquiry_id, from = %enquiry.status, to = %updated.status, "enquiry status updated");
        Ok(updated)
    }

    /// Reading as the assigned host marks the enquiry read. Repeat reads are
    /// no-ops.
    #[tracing::instrument(skip(self), fields(%enquiry_id, actor_id = %actor.user_id))]
    pub async fn get_by_id(&self, actor: &Actor, enquiry_id: Uuid) -> Result<EnquiryDetails, UsecaseError> {
        tracing::debug!("getting enquiry");

        let mut enquiry = self
            .enquiry_repository
            .find_by_id(enquiry_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Enquiry".to_string()))?;

        authorize(actor, Resource::Enquiry(&enquiry), Action::ViewEnquiry)?;

        if enquiry.host_id == actor.user_id && !enquiry.is_read {
            let flipped = self.enquiry_repository.mark_read(enquiry_id).await?;
            tracing::debug!(%enquiry_id, flipped, "enquiry marked as read by host");
            enquiry.is_read = true;
        }

        let property = self.property_repository.find_by_id(enquiry.property_id).await?;
        let guest = self.user_repository.find_by_id(enquiry.guest_id).await?;
        let host = self.user_repository.find_by_id(enquiry.host_id).await?;

        Ok(EnquiryDetails {
            enquiry,
            property: property.map(|p| p.summary()),
            guest: guest.map(|u| u.summary()),
            host: host.map(|u| u.summary()),
        })
    }

    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id, role = %actor.role))]
    pub async fn list_for_user(&self, actor: &Actor, query: EnquiryQuery) -> Result<Page<Enquiry>, UsecaseError> {
        tracing::debug!("listing enquiries for user");

        let mut filter = scope_for(actor);
        query.apply(&mut filter);
        self.page(&filter, query.page).await
    }

    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id, %property_id))]
    pub async fn list_for_property(
        &self,
        actor: &Actor,
        property_id: Uuid,
        query: EnquiryQuery,
    ) -> Result<Page<Enquiry>, UsecaseError> {
        tracing::debug!("listing enquiries for property");

        let property = self
            .property_repository
            .find_by_id(property_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Property".to_string()))?;

        authorize(actor, Resource::Property(&property), Action::ListPropertyEnquiries)?;

        let mut filter = EnquiryFilter {
            host_id: Some(property.host_id),
            ..Default::default()
        };
        query.apply(&mut filter);
        filter.property_id = Some(property.id);
        self.page(&filter, query.page).await
    }

    #[tracing::instrument(skip(self), fields(admin_id = %actor.user_id, ?guest_id, ?host_id))]
    pub async fn list_all(
        &self,
        actor: &Actor,
        query: EnquiryQuery,
        guest_id: Option<Uuid>,
        host_id: Option<Uuid>,
    ) -> Result<Page<Enquiry>, UsecaseError> {
        authorize(actor, Resource::Platform, Action::ListAllEnquiries)?;

        tracing::debug!("listing all enquiries");

        let mut filter = EnquiryFilter {
            guest_id,
            host_id,
            ..Default::default()
        };
        query.apply(&mut filter);
        self.page(&filter, query.page).await
    }

    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id, role = %actor.role))]
    pub async fn stats(&self, actor: &Actor) -> Result<EnquiryStats, UsecaseError> {
        tracing::debug!("computing enquiry stats");

        let scope = scope_for(actor);
        let total = self.enquiry_repository.count(&scope).await?;
        let unread = self
            .enquiry_repository
            .count(&EnquiryFilter {
                is_read: Some(false),
                ..scope.clone()
            })
            .await?;
        let by_status = self.enquiry_repository.count_by_status(&scope).await?;

        Ok(EnquiryStats {
            total,
            unread,
            by_status: StatusBreakdown::from_counts(&by_status),
        })
    }

    async fn page(&self, filter: &EnquiryFilter, request: PageRequest) -> Result<Page<Enquiry>, UsecaseError> {
        let total = self.enquiry_repository.count(filter).await?;
        let items = self
            .enquiry_repository
            .find_many(filter, request.limit, request.offset())
            .await?;

        tracing::debug!(count = items.len(), total, "enquiries page loaded");
        Ok(Page::new(items, request, total))
    }
}
