use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Email,
    Push,
    InApp,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Email => "EMAIL",
            NotificationType::Push => "PUSH",
            NotificationType::InApp => "IN_APP",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Unread,
    Read,
    Sent,
    Failed,
}

impl NotificationStatus {
    /// Statuses a read action may move to `Read`.
    pub const READABLE: [NotificationStatus; 2] = [NotificationStatus::Unread, NotificationStatus::Sent];

    pub fn is_readable(&self) -> bool {
        Self::READABLE.contains(self)
    }
}

/// Event names carried in the notification payload.
pub mod events {
    pub const NEW_ENQUIRY: &str = "new_enquiry";
    pub const ENQUIRY_RESPONDED: &str = "enquiry_responded";
    pub const BROADCAST: &str = "broadcast";
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub notification_type: NotificationType,
    pub status: NotificationStatus,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// In-app rows wait to be read; outbound channels start as sent.
    pub fn new(
        user_id: Uuid,
        title: String,
        body: String,
        notification_type: NotificationType,
        data: serde_json::Value,
    ) -> Self {
        let status = match notification_type {
            NotificationType::InApp => NotificationStatus::Unread,
            NotificationType::Email | NotificationType::Push => NotificationStatus::Sent,
        };

        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            body,
            notification_type,
            status,
            data,
            created_at: Utc::now(),
            read_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationStats {
    pub total: i64,
    pub unread: i64,
    pub read: i64,
    pub sent: i64,
    pub failed: i64,
}

impl NotificationStats {
    pub fn from_counts(counts: &[(NotificationStatus, i64)]) -> Self {
        let mut stats = Self::default();
        for (status, count) in counts {
            stats.total += count;
            match status {
                NotificationStatus::Unread => stats.unread += count,
                NotificationStatus::Read => stats.read += count,
                NotificationStatus::Sent => stats.sent += count,
                NotificationStatus::Failed => stats.failed += count,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_app_notification_starts_unread() {
        let n = Notification::new(
            Uuid::new_v4(),
            "Hello".to_string(),
            "Body".to_string(),
            NotificationType::InApp,
            serde_json::json!({}),
        );

        assert_eq!(n.status, NotificationStatus::Unread);
        assert!(n.read_at.is_none());
    }

    #[test]
    fn test_outbound_notifications_start_sent() {
        for channel in [NotificationType::Email, NotificationType::Push] {
            let n = Notification::new(
                Uuid::new_v4(),
                "Hello".to_string(),
                "Body".to_string(),
                channel,
                serde_json::json!({"enquiry_id": Uuid::new_v4()}),
            );
            assert_eq!(n.status, NotificationStatus::Sent);
            assert!(n.read_at.is_none());
        }
    }

    #[test]
    fn test_readable_statuses() {
        assert!(NotificationStatus::Unread.is_readable());
        assert!(NotificationStatus::Sent.is_readable());
        assert!(!NotificationStatus::Read.is_readable());
        assert!(!NotificationStatus::Failed.is_readable());
    }

    #[test]
    fn test_stats_from_counts() {
        let stats = NotificationStats::from_counts(&[
            (NotificationStatus::Unread, 2),
            (NotificationStatus::Sent, 5),
            (NotificationStatus::Failed, 1),
        ]);

        assert_eq!(stats.total, 8);
        assert_eq!(stats.unread, 2);
        assert_eq!(stats.read, 0);
        assert_eq!(stats.sent, 5);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn test_type_serialization() {
        assert_eq!(serde_json::to_string(&NotificationType::InApp).unwrap(), "\"IN_APP\"");
        let parsed: NotificationType = serde_json::from_str("\"PUSH\"").unwrap();
        assert_eq!(parsed, NotificationType::Push);
    }
}
