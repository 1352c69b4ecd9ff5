//! Capability checks shared by every use case.

use uuid::Uuid;

use crate::domain::enquiry::Enquiry;
use crate::domain::notification::Notification;
use crate::domain::property::Property;
use crate::domain::user::Role;
use crate::usecase::error::UsecaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateEnquiry,
    ViewEnquiry,
    RespondToEnquiry,
    UpdateEnquiryStatus,
    ListPropertyEnquiries,
    ListAllEnquiries,
    Broadcast,
    ManageNotification,
}

#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Enquiry(&'a Enquiry),
    Property(&'a Property),
    Notification(&'a Notification),
    Platform,
}

pub fn authorize(actor: &Actor, resource: Resource<'_>, action: Action) -> Result<(), UsecaseError> {
    let allowed = match (action, resource) {
        (Action::CreateEnquiry, Resource::Property(property)) => {
            actor.role == Role::Guest && property.host_id != actor.user_id
        }
        (Action::ViewEnquiry, Resource::Enquiry(enquiry)) => {
            actor.is_admin() || enquiry.guest_id == actor.user_id || enquiry.host_id == actor.user_id
        }
        (Action::RespondToEnquiry, Resource::Enquiry(enquiry)) => enquiry.host_id == actor.user_id,
        (Action::UpdateEnquiryStatus, Resource::Enquiry(enquiry)) => {
            actor.is_admin() || enquiry.host_id == actor.user_id
        }
        (Action::ListPropertyEnquiries, Resource::Property(property)) => property.host_id == actor.user_id,
        (Action::ListAllEnquiries | Action::Broadcast, Resource::Platform) => actor.is_admin(),
        (Action::ManageNotification, Resource::Notification(notification)) => {
            notification.user_id == actor.user_id
        }
        _ => false,
    };

    if allowed {
        return Ok(());
    }

    tracing::warn!(user_id = %actor.user_id, role = %actor.role, ?action, "capability check failed");
    Err(UsecaseError::Forbidden(denial_message(action).to_string()))
}

fn denial_message(action: Action) -> &'static str {
    match action {
        Action::CreateEnquiry => "Only guests can send enquiries, and not about their own property",
        Action::ViewEnquiry => "Not authorized to view this enquiry",
        Action::RespondToEnquiry => "Only the property host can respond to this enquiry",
        Action::UpdateEnquiryStatus => "Not authorized to update this enquiry",
        Action::ListPropertyEnquiries => "Not authorized to view enquiries for this property",
        Action::ListAllEnquiries | Action::Broadcast => "Admin access required",
        Action::ManageNotification => "Not authorized to access this notification",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enquiry::{EnquiryPriority, NewEnquiry};

    fn property(host_id: Uuid) -> Property {
        Property {
            id: Uuid::new_v4(),
            host_id,
            title: "Loft".to_string(),
            city: "Berlin".to_string(),
            images: vec![],
            is_available: true,
        }
    }

    fn enquiry(guest_id: Uuid, host_id: Uuid) -> Enquiry {
        Enquiry::new(
            guest_id,
            &property(host_id),
            NewEnquiry {
                property_id: Uuid::new_v4(),
                subject: "Check-in time".to_string(),
                message: "What time can we check in?".to_string(),
                priority: EnquiryPriority::Low,
            },
        )
    }

    #[test]
    fn test_view_enquiry_parties_and_admin() {
        let guest = Actor::new(Uuid::new_v4(), Role::Guest);
        let host = Actor::new(Uuid::new_v4(), Role::Host);
        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        let stranger = Actor::new(Uuid::new_v4(), Role::Guest);
        let e = enquiry(guest.user_id, host.user_id);

        assert!(authorize(&guest, Resource::Enquiry(&e), Action::ViewEnquiry).is_ok());
        assert!(authorize(&host, Resource::Enquiry(&e), Action::ViewEnquiry).is_ok());
        assert!(authorize(&admin, Resource::Enquiry(&e), Action::ViewEnquiry).is_ok());
        assert!(matches!(
            authorize(&stranger, Resource::Enquiry(&e), Action::ViewEnquiry),
            Err(UsecaseError::Forbidden(_))
        ));
    }

    #[test]
    fn test_only_assigned_host_responds() {
        let host = Actor::new(Uuid::new_v4(), Role::Host);
        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        let other_host = Actor::new(Uuid::new_v4(), Role::Host);
        let e = enquiry(Uuid::new_v4(), host.user_id);

        assert!(authorize(&host, Resource::Enquiry(&e), Action::RespondToEnquiry).is_ok());
        assert!(authorize(&admin, Resource::Enquiry(&e), Action::RespondToEnquiry).is_err());
        assert!(authorize(&other_host, Resource::Enquiry(&e), Action::RespondToEnquiry).is_err());
    }

    #[test]
    fn test_status_update_by_host_or_admin() {
        let host = Actor::new(Uuid::new_v4(), Role::Host);
        let guest = Actor::new(Uuid::new_v4(), Role::Guest);
        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        let e = enquiry(guest.user_id, host.user_id);

        assert!(authorize(&host, Resource::Enquiry(&e), Action::UpdateEnquiryStatus).is_ok());
        assert!(authorize(&admin, Resource::Enquiry(&e), Action::UpdateEnquiryStatus).is_ok());
        assert!(authorize(&guest, Resource::Enquiry(&e), Action::UpdateEnquiryStatus).is_err());
    }

    #[test]
    fn test_guest_cannot_enquire_about_own_property() {
        let guest = Actor::new(Uuid::new_v4(), Role::Guest);
        let host = Actor::new(Uuid::new_v4(), Role::Host);

        assert!(authorize(&guest, Resource::Property(&property(host.user_id)), Action::CreateEnquiry).is_ok());
        assert!(authorize(&guest, Resource::Property(&property(guest.user_id)), Action::CreateEnquiry).is_err());
        assert!(authorize(&host, Resource::Property(&property(Uuid::new_v4())), Action::CreateEnquiry).is_err());
    }

    #[test]
    fn test_platform_actions_require_admin() {
        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        let host = Actor::new(Uuid::new_v4(), Role::Host);

        assert!(authorize(&admin, Resource::Platform, Action::Broadcast).is_ok());
        assert!(authorize(&admin, Resource::Platform, Action::ListAllEnquiries).is_ok());
        assert!(authorize(&host, Resource::Platform, Action::Broadcast).is_err());
    }

    #[test]
    fn test_mismatched_resource_is_denied() {
        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        assert!(authorize(&admin, Resource::Platform, Action::ViewEnquiry).is_err());
    }
}
