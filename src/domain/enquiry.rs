use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::property::{Property, PropertySummary};
use crate::domain::user::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "enquiry_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnquiryPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "enquiry_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnquiryStatus {
    #[default]
    Pending,
    Responded,
    Closed,
    Spam,
}

impl EnquiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnquiryStatus::Pending => "PENDING",
            EnquiryStatus::Responded => "RESPONDED",
            EnquiryStatus::Closed => "CLOSED",
            EnquiryStatus::Spam => "SPAM",
        }
    }
}

impl std::fmt::Display for EnquiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guest input for a new enquiry. Validated before any lookup or write.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewEnquiry {
    pub property_id: Uuid,
    #[validate(length(min = 5, max = 100, message = "subject must be between 5 and 100 characters"))]
    pub subject: String,
    #[validate(length(min = 10, max = 1000, message = "message must be between 10 and 1000 characters"))]
    pub message: String,
    #[serde(default)]
    pub priority: EnquiryPriority,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Enquiry {
    pub id: Uuid,
    pub subject: String,
    pub message: String,
    pub priority: EnquiryPriority,
    pub status: EnquiryStatus,
    pub property_id: Uuid,
    pub guest_id: Uuid,
    pub host_id: Uuid,
    pub response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Enquiry {
    /// Builds a pending enquiry; the host is taken from the property.
    pub fn new(guest_id: Uuid, property: &Property, input: NewEnquiry) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: input.subject,
            message: input.message,
            priority: input.priority,
            status: EnquiryStatus::Pending,
            property_id: property.id,
            guest_id,
            host_id: property.host_id,
            response: None,
            responded_at: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_responded(&self) -> bool {
        self.status == EnquiryStatus::Responded
    }
}

/// An enquiry expanded with the property and both parties.
#[derive(Debug, Clone, Serialize)]
pub struct EnquiryDetails {
    #[serde(flatten)]
    pub enquiry: Enquiry,
    pub property: Option<PropertySummary>,
    pub guest: Option<UserSummary>,
    pub host: Option<UserSummary>,
}

/// Equality filters over enquiries. `None` fields are not applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnquiryFilter {
    pub guest_id: Option<Uuid>,
    pub host_id: Option<Uuid>,
    pub property_id: Option<Uuid>,
    pub status: Option<EnquiryStatus>,
    pub priority: Option<EnquiryPriority>,
    pub is_read: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusBreakdown {
    pub pending: i64,
    pub responded: i64,
    pub closed: i64,
    pub spam: i64,
}

impl StatusBreakdown {
    pub fn from_counts(counts: &[(EnquiryStatus, i64)]) -> Self {
        let mut breakdown = Self::default();
        for (status, count) in counts {
            match status {
                EnquiryStatus::Pending => breakdown.pending += count,
                EnquiryStatus::Responded => breakdown.responded += count,
                EnquiryStatus::Closed => breakdown.closed += count,
                EnquiryStatus::Spam => breakdown.spam += count,
            }
        }
        breakdown
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnquiryStats {
    pub total: i64,
    pub unread: i64,
    pub by_status: StatusBreakdown,
}

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// One-based page request, clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Saturates so an absurd `page` reads past the end instead of overflowing.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        let total_pages = (total + request.limit - 1) / request.limit;
        Self {
            items,
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property() -> Property {
        Property {
            id: Uuid::new_v4(),
            host_id: Uuid::new_v4(),
            title: "Sea view apartment".to_string(),
            city: "Lisbon".to_string(),
            images: vec![],
            is_available: true,
        }
    }

    fn input(subject: &str, message: &str) -> NewEnquiry {
        NewEnquiry {
            property_id: Uuid::new_v4(),
            subject: subject.to_string(),
            message: message.to_string(),
            priority: EnquiryPriority::default(),
        }
    }

    #[test]
    fn test_enquiry_creation_takes_host_from_property() {
        let property = property();
        let guest_id = Uuid::new_v4();

        let enquiry = Enquiry::new(
            guest_id,
            &property,
            input("Is it available?", "Is the apartment available next weekend?"),
        );

        assert_eq!(enquiry.status, EnquiryStatus::Pending);
        assert_eq!(enquiry.priority, EnquiryPriority::Normal);
        assert_eq!(enquiry.host_id, property.host_id);
        assert_eq!(enquiry.property_id, property.id);
        assert_eq!(enquiry.guest_id, guest_id);
        assert!(enquiry.response.is_none());
        assert!(enquiry.responded_at.is_none());
        assert!(!enquiry.is_read);
        assert!(!enquiry.is_responded());
    }

    #[test]
    fn test_subject_too_short_fails_validation() {
        let result = input("Hey?", "This message is long enough").validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().field_errors().contains_key("subject"));
    }

    #[test]
    fn test_subject_minimum_length_passes() {
        assert!(input("Hello", "This message is long enough").validate().is_ok());
    }

    #[test]
    fn test_message_length_boundaries() {
        let max = "a".repeat(1000);
        assert!(input("Availability", &max).validate().is_ok());

        let too_long = "a".repeat(1001);
        let result = input("Availability", &too_long).validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().field_errors().contains_key("message"));

        assert!(input("Availability", "too short").validate().is_err());
    }

    #[test]
    fn test_new_enquiry_priority_defaults_to_normal() {
        let json = format!(
            r#"{{"property_id":"{}","subject":"Parking","message":"Is there parking nearby?"}}"#,
            Uuid::new_v4()
        );
        let parsed: NewEnquiry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.priority, EnquiryPriority::Normal);

        let json = format!(
            r#"{{"property_id":"{}","subject":"Parking","message":"Is there parking nearby?","priority":"URGENT"}}"#,
            Uuid::new_v4()
        );
        let parsed: NewEnquiry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.priority, EnquiryPriority::Urgent);
    }

    #[test]
    fn test_status_breakdown_from_counts() {
        let breakdown = StatusBreakdown::from_counts(&[
            (EnquiryStatus::Pending, 3),
            (EnquiryStatus::Spam, 1),
            (EnquiryStatus::Responded, 2),
        ]);

        assert_eq!(breakdown.pending, 3);
        assert_eq!(breakdown.responded, 2);
        assert_eq!(breakdown.closed, 0);
        assert_eq!(breakdown.spam, 1);
    }

    #[test]
    fn test_page_request_clamps() {
        let request = PageRequest::new(None, None);
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(request.offset(), 0);

        let request = PageRequest::new(Some(0), Some(500));
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, MAX_PAGE_SIZE);

        let request = PageRequest::new(Some(3), Some(20));
        assert_eq!(request.offset(), 40);
    }

    #[test]
    fn test_page_request_offset_saturates_on_huge_page() {
        let request = PageRequest::new(Some(i64::MAX / 10), Some(100));
        assert_eq!(request.offset(), i64::MAX);

        let request = PageRequest::new(Some(i64::MAX), Some(MAX_PAGE_SIZE));
        assert!(request.offset() > 0);
    }

    #[test]
    fn test_page_total_pages() {
        let page: Page<u8> = Page::new(vec![], PageRequest::new(Some(1), Some(10)), 21);
        assert_eq!(page.total_pages, 3);

        let empty: Page<u8> = Page::new(vec![], PageRequest::new(None, None), 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&EnquiryStatus::Responded).unwrap();
        assert_eq!(json, "\"RESPONDED\"");
        assert_eq!(EnquiryStatus::Spam.to_string(), "SPAM");
    }
}
