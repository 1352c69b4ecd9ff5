use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgArguments, PgPoolOptions},
    query::QueryAs,
    PgPool, Postgres,
};
use uuid::Uuid;

use crate::{
    domain::enquiry::{Enquiry, EnquiryFilter, EnquiryStatus},
    domain::notification::{Notification, NotificationStatus},
    domain::property::Property,
    domain::user::{Audience, User},
    repository::errors::RepositoryError,
    usecase::contracts::{EnquiryRepository, NotificationRepository, PropertyRepository, UserRepository},
};

const ENQUIRY_COLUMNS: &str = "id, subject, message, priority, status, property_id, guest_id, host_id, \
                               response, responded_at, is_read, created_at";

// Every filter field is optional; binds $1..$6 in `bind_filter` order.
const ENQUIRY_FILTER: &str = r#"
    ($1::uuid IS NULL OR guest_id = $1)
    AND ($2::uuid IS NULL OR host_id = $2)
    AND ($3::uuid IS NULL OR property_id = $3)
    AND ($4::enquiry_status IS NULL OR status = $4)
    AND ($5::enquiry_priority IS NULL OR priority = $5)
    AND ($6::boolean IS NULL OR is_read = $6)
"#;

fn bind_filter<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    filter: &EnquiryFilter,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    query
        .bind(filter.guest_id)
        .bind(filter.host_id)
        .bind(filter.property_id)
        .bind(filter.status)
        .bind(filter.priority)
        .bind(filter.is_read)
}

#[derive(Clone)]
pub struct PostgresEnquiryRepository {
    pool: PgPool,
}

impl PostgresEnquiryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EnquiryRepository for PostgresEnquiryRepository {
    #[tracing::instrument(skip(self, enquiry), fields(enquiry_id = %enquiry.id, guest_id = %enquiry.guest_id, property_id = %enquiry.property_id))]
    async fn create_unless_recent(&self, enquiry: &Enquiry, since: DateTime<Utc>) -> Result<bool, RepositoryError> {
        tracing::debug!("creating enquiry");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        // Serializes creates for one (guest, property) pair until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text), hashtext($2::text))")
            .bind(enquiry.guest_id)
            .bind(enquiry.property_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM enquiries
                WHERE guest_id = $1 AND property_id = $2 AND created_at >= $3
            )
            "#,
        )
        .bind(enquiry.guest_id)
        .bind(enquiry.property_id)
        .bind(since)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if exists {
            tx.rollback()
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
            tracing::debug!("recent enquiry exists, insert skipped");
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO enquiries (id, subject, message, priority, status, property_id, guest_id, host_id,
                                   response, responded_at, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(enquiry.id)
        .bind(&enquiry.subject)
        .bind(&enquiry.message)
        .bind(enquiry.priority)
        .bind(enquiry.status)
        .bind(enquiry.property_id)
        .bind(enquiry.guest_id)
        .bind(enquiry.host_id)
        .bind(&enquiry.response)
        .bind(enquiry.responded_at)
        .bind(enquiry.is_read)
        .bind(enquiry.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(enquiry_id = %enquiry.id, "enquiry created successfully");
        Ok(true)
    }

    #[tracing::instrument(skip(self), fields(enquiry_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Enquiry>, RepositoryError> {
        tracing::debug!("finding enquiry by id");

        let query = format!("SELECT {ENQUIRY_COLUMNS} FROM enquiries WHERE id = $1");
        let enquiry = sqlx::query_as::<_, Enquiry>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(enquiry)
    }

    #[tracing::instrument(skip(self), fields(%guest_id, %property_id))]
    async fn find_latest_for_pair(&self, guest_id: Uuid, property_id: Uuid) -> Result<Option<Enquiry>, RepositoryError> {
        tracing::debug!("finding latest enquiry for guest and property");

        let query = format!(
            r#"
            SELECT {ENQUIRY_COLUMNS} FROM enquiries
            WHERE guest_id = $1 AND property_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );
        let enquiry = sqlx::query_as::<_, Enquiry>(&query)
            .bind(guest_id)
            .bind(property_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(enquiry)
    }

    #[tracing::instrument(skip(self), fields(?filter, %limit, %offset))]
    async fn find_many(&self, filter: &EnquiryFilter, limit: i64, offset: i64) -> Result<Vec<Enquiry>, RepositoryError> {
        tracing::debug!("listing enquiries");

        let query = format!(
            r#"
            SELECT {ENQUIRY_COLUMNS} FROM enquiries
            WHERE {ENQUIRY_FILTER}
            ORDER BY created_at DESC
            LIMIT $7 OFFSET $8
            "#
        );
        let enquiries = bind_filter(sqlx::query_as::<_, Enquiry>(&query), filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = enquiries.len(), "found enquiries");
        Ok(enquiries)
    }

    #[tracing::instrument(skip(self), fields(?filter))]
    async fn count(&self, filter: &EnquiryFilter) -> Result<i64, RepositoryError> {
        let query = format!("SELECT COUNT(*) FROM enquiries WHERE {ENQUIRY_FILTER}");
        let count: (i64,) = bind_filter(sqlx::query_as(&query), filter)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = count.0, "counted enquiries");
        Ok(count.0)
    }

    #[tracing::instrument(skip(self), fields(?filter))]
    async fn count_by_status(&self, filter: &EnquiryFilter) -> Result<Vec<(EnquiryStatus, i64)>, RepositoryError> {
        let query = format!("SELECT status, COUNT(*) FROM enquiries WHERE {ENQUIRY_FILTER} GROUP BY status");
        let counts = bind_filter(sqlx::query_as::<_, (EnquiryStatus, i64)>(&query), filter)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(counts)
    }

    #[tracing::instrument(skip(self, response), fields(enquiry_id = %id))]
    async fn respond_if_pending(
        &self,
        id: Uuid,
        response: &str,
        responded_at: DateTime<Utc>,
    ) -> Result<Option<Enquiry>, RepositoryError> {
        tracing::debug!("responding to enquiry");

        let query = format!(
            r#"
            UPDATE enquiries
            SET response = $2, responded_at = $3, status = 'RESPONDED'
            WHERE id = $1 AND status = 'PENDING'
            RETURNING {ENQUIRY_COLUMNS}
            "#
        );
        let enquiry = sqlx::query_as::<_, Enquiry>(&query)
            .bind(id)
            .bind(response)
            .bind(responded_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(applied = enquiry.is_some(), "conditional response update finished");
        Ok(enquiry)
    }

    #[tracing::instrument(skip(self), fields(enquiry_id = %id, %status))]
    async fn update_status(&self, id: Uuid, status: EnquiryStatus) -> Result<Option<Enquiry>, RepositoryError> {
        tracing::debug!("updating enquiry status");

        let query = format!("UPDATE enquiries SET status = $2 WHERE id = $1 RETURNING {ENQUIRY_COLUMNS}");
        let enquiry = sqlx::query_as::<_, Enquiry>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(enquiry)
    }

    #[tracing::instrument(skip(self), fields(enquiry_id = %id))]
    async fn mark_read(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE enquiries SET is_read = TRUE WHERE id = $1 AND is_read = FALSE")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PostgresPropertyRepository {
    pool: PgPool,
}

impl PostgresPropertyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl PropertyRepository for PostgresPropertyRepository {
    #[tracing::instrument(skip(self), fields(property_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Property>, RepositoryError> {
        tracing::debug!("finding property by id");

        let property = sqlx::query_as::<_, Property>(
            r#"
            SELECT id, host_id, title, city, images, is_available
            FROM properties
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(property)
    }
}

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for PostgresUserRepository {
    #[tracing::instrument(skip(self), fields(user_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        tracing::debug!("finding user by id");

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, phone, role
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(?audience))]
    async fn find_ids_by_audience(&self, audience: Audience) -> Result<Vec<Uuid>, RepositoryError> {
        tracing::debug!("resolving broadcast audience");

        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
            ORDER BY id
            "#,
        )
        .bind(audience.role())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = rows.len(), "audience resolved");
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[derive(Clone)]
pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl NotificationRepository for PostgresNotificationRepository {
    #[tracing::instrument(skip(self, notification), fields(notification_id = %notification.id, user_id = %notification.user_id))]
    async fn create(&self, notification: &Notification) -> Result<(), RepositoryError> {
        tracing::debug!("creating notification");

        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, body, notification_type, status, data, created_at, read_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(notification.notification_type)
        .bind(notification.status)
        .bind(&notification.data)
        .bind(notification.created_at)
        .bind(notification.read_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(notification_id = %notification.id, "notification created successfully");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(notification_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, RepositoryError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, title, body, notification_type, status, data, created_at, read_at
            FROM notifications
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(notification)
    }

    #[tracing::instrument(skip(self), fields(%user_id, %limit, %offset))]
    async fn find_by_user_id(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Notification>, RepositoryError> {
        tracing::debug!("finding notifications by user_id");

        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, title, body, notification_type, status, data, created_at, read_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(%user_id, count = notifications.len(), "found notifications");
        Ok(notifications)
    }

    #[tracing::instrument(skip(self), fields(%user_id))]
    async fn count_unread(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND status = 'UNREAD'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(count.0)
    }

    #[tracing::instrument(skip(self), fields(%user_id))]
    async fn count_by_status(&self, user_id: Uuid) -> Result<Vec<(NotificationStatus, i64)>, RepositoryError> {
        let counts = sqlx::query_as::<_, (NotificationStatus, i64)>(
            r#"
            SELECT status, COUNT(*) FROM notifications WHERE user_id = $1 GROUP BY status
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(counts)
    }

    #[tracing::instrument(skip(self), fields(notification_id = %id))]
    async fn mark_as_read(&self, id: Uuid, read_at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        tracing::debug!("marking notification as read");

        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET status = 'READ', read_at = $2
            WHERE id = $1 AND status IN ('UNREAD', 'SENT')
            "#,
        )
        .bind(id)
        .bind(read_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(%user_id))]
    async fn mark_all_as_read(&self, user_id: Uuid, read_at: DateTime<Utc>) -> Result<u64, RepositoryError> {
        tracing::debug!("marking all notifications as read");

        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET status = 'READ', read_at = $2
            WHERE user_id = $1 AND status IN ('UNREAD', 'SENT')
            "#,
        )
        .bind(user_id)
        .bind(read_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(updated = result.rows_affected(), "notifications marked as read");
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self), fields(notification_id = %id, ?status))]
    async fn set_status(&self, id: Uuid, status: NotificationStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE notifications SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(notification_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        tracing::debug!("deleting notification");

        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tracing::debug!(notification_id = %id, "notification deleted successfully");
        Ok(())
    }
}

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
