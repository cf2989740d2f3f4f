//! Notification service
//!
//! Notifications are broadcast rows with a recipient predicate; reads
//! resolve the predicate for the requesting user and filter out expired
//! entries. New notifications are fanned out live over a broadcast channel
//! for the SSE stream.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::db::{parse_db_timestamp, parse_db_uuid, parse_json_column, parse_opt_timestamp, parse_opt_uuid};
use crate::models::{
    CreateNotificationRequest, Notification, NotificationPriority, NotificationQuery,
    NotificationType, ReadReceipt, RecipientType, Role,
};
use crate::utils::AppError;

/// Notification event for broadcasting
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    New(Notification),
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: String,
    sent_by: String,
    sender_role: Option<String>,
    recipient_type: String,
    recipient_roles: String,
    recipient_ids: String,
    dealer_id: Option<String>,
    title: String,
    message: String,
    notification_type: String,
    priority: String,
    action_url: Option<String>,
    action_label: Option<String>,
    sent_at: String,
    read_by: String,
    is_active: i64,
    expires_at: Option<String>,
}

/// Notification service
#[derive(Clone)]
pub struct NotificationService {
    db: Pool<Sqlite>,
    broadcast: Arc<broadcast::Sender<NotificationEvent>>,
}

impl NotificationService {
    pub fn new(db: Pool<Sqlite>) -> Self {
        let (tx, _) = broadcast::channel(1000);
        Self {
            db,
            broadcast: Arc::new(tx),
        }
    }

    /// Subscribe to notification events
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.broadcast.subscribe()
    }

    /// Create and broadcast a notification
    pub async fn create(
        &self,
        req: CreateNotificationRequest,
        sent_by: Uuid,
        sender_role: Role,
        dealer_id: Option<Uuid>,
    ) -> Result<Notification, AppError> {
        let id = Uuid::new_v4();
        let sent_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, sent_by, sender_role, recipient_type, recipient_roles,
                recipient_ids, dealer_id, title, message, notification_type,
                priority, action_url, action_label, sent_at, read_by, is_active,
                expires_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '[]', 1, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(sent_by.to_string())
        .bind(sender_role.as_str())
        .bind(req.recipient_type.as_str())
        .bind(serde_json::to_string(&req.recipient_roles)?)
        .bind(serde_json::to_string(&req.recipient_ids)?)
        .bind(dealer_id.map(|d| d.to_string()))
        .bind(&req.title)
        .bind(&req.message)
        .bind(req.notification_type.as_str())
        .bind(req.priority.as_str())
        .bind(&req.action_url)
        .bind(&req.action_label)
        .bind(sent_at.to_rfc3339())
        .bind(req.expires_at.map(|e| e.to_rfc3339()))
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let notification = self
            .get(id)
            .await?
            .ok_or_else(|| AppError::Internal("Notification missing after creation".to_string()))?;

        let _ = self
            .broadcast
            .send(NotificationEvent::New(notification.clone()));

        Ok(notification)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Notification>, AppError> {
        let row = sqlx::query_as::<_, NotificationRow>("SELECT * FROM notifications WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map(row_to_notification))
    }

    /// Notifications addressed to a user, newest first, excluding expired
    /// and inactive ones.
    pub async fn for_user(
        &self,
        user_id: Uuid,
        role: Role,
        dealer_id: Option<Uuid>,
        query: &NotificationQuery,
    ) -> Result<Vec<Notification>, AppError> {
        let candidates = self.active_candidates().await?;

        let limit = query.limit.unwrap_or(50).clamp(1, 200) as usize;
        let offset = query.offset.unwrap_or(0).max(0) as usize;

        Ok(candidates
            .into_iter()
            .filter(|n| n.is_recipient(user_id, role, dealer_id))
            .filter(|n| query.unread_only != Some(true) || !n.is_read_by(user_id))
            .skip(offset)
            .take(limit)
            .collect())
    }

    /// Count of unread notifications addressed to a user
    pub async fn unread_count(
        &self,
        user_id: Uuid,
        role: Role,
        dealer_id: Option<Uuid>,
    ) -> Result<i64, AppError> {
        let candidates = self.active_candidates().await?;

        Ok(candidates
            .iter()
            .filter(|n| n.is_recipient(user_id, role, dealer_id))
            .filter(|n| !n.is_read_by(user_id))
            .count() as i64)
    }

    /// Append a read receipt for the user. A second read is a no-op.
    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
        role: Role,
        dealer_id: Option<Uuid>,
    ) -> Result<Notification, AppError> {
        let notification = self
            .get(notification_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

        if !notification.is_recipient(user_id, role, dealer_id) {
            return Err(AppError::Forbidden(
                "You are not a recipient of this notification".to_string(),
            ));
        }

        if notification.is_read_by(user_id) {
            return Ok(notification);
        }

        let mut receipts = notification.read_by.clone();
        receipts.push(ReadReceipt {
            user_id,
            read_at: Utc::now(),
        });

        sqlx::query("UPDATE notifications SET read_by = ? WHERE id = ?")
            .bind(serde_json::to_string(&receipts)?)
            .bind(notification_id.to_string())
            .execute(&self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get(notification_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
    }

    /// Mark every unread notification addressed to the user as read.
    /// Returns how many were marked.
    pub async fn mark_all_read(
        &self,
        user_id: Uuid,
        role: Role,
        dealer_id: Option<Uuid>,
    ) -> Result<i64, AppError> {
        let candidates = self.active_candidates().await?;
        let mut count = 0i64;

        for notification in candidates {
            if notification.is_recipient(user_id, role, dealer_id)
                && !notification.is_read_by(user_id)
            {
                self.mark_read(notification.id, user_id, role, dealer_id)
                    .await?;
                count += 1;
            }
        }

        Ok(count)
    }

    /// Delete expired notifications. Returns the number removed.
    pub async fn cleanup_expired(&self) -> Result<i64, AppError> {
        let result = sqlx::query(
            "DELETE FROM notifications \
             WHERE expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() as i64)
    }

    /// Active, unexpired notifications, newest first
    async fn active_candidates(&self) -> Result<Vec<Notification>, AppError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT * FROM notifications \
             WHERE is_active = 1 AND (expires_at IS NULL OR expires_at > ?) \
             ORDER BY sent_at DESC",
        )
        .bind(Utc::now().to_rfc3339())
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(row_to_notification).collect())
    }
}

fn row_to_notification(row: NotificationRow) -> Notification {
    Notification {
        id: parse_db_uuid(&row.id),
        sent_by: parse_db_uuid(&row.sent_by),
        sender_role: row.sender_role.as_deref().and_then(|r| r.parse().ok()),
        recipient_type: row.recipient_type.parse().unwrap_or(RecipientType::All),
        recipient_roles: parse_json_column::<Vec<Role>>(Some(&row.recipient_roles)),
        recipient_ids: parse_json_column::<Vec<Uuid>>(Some(&row.recipient_ids)),
        dealer_id: parse_opt_uuid(row.dealer_id.as_deref()),
        title: row.title,
        message: row.message,
        notification_type: row
            .notification_type
            .parse()
            .unwrap_or(NotificationType::Info),
        priority: row
            .priority
            .parse()
            .unwrap_or(NotificationPriority::Medium),
        action_url: row.action_url,
        action_label: row.action_label,
        sent_at: parse_db_timestamp(&row.sent_at),
        read_by: parse_json_column::<Vec<ReadReceipt>>(Some(&row.read_by)),
        is_active: row.is_active != 0,
        expires_at: parse_opt_timestamp(row.expires_at.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::init_pool;

    async fn test_service() -> NotificationService {
        let pool = init_pool(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 60,
        })
        .await
        .unwrap();
        NotificationService::new(pool)
    }

    fn broadcast_request(recipient_type: RecipientType) -> CreateNotificationRequest {
        CreateNotificationRequest {
            title: "Service camp".to_string(),
            message: "Free checkup this weekend".to_string(),
            recipient_type,
            recipient_roles: vec![],
            recipient_ids: vec![],
            notification_type: NotificationType::Info,
            priority: NotificationPriority::Medium,
            action_url: None,
            action_label: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_role_targeting() {
        let service = test_service().await;
        let admin = Uuid::new_v4();

        let mut req = broadcast_request(RecipientType::Role);
        req.recipient_roles = vec![Role::Dealer];
        service.create(req, admin, Role::Admin, None).await.unwrap();

        let dealer_view = service
            .for_user(Uuid::new_v4(), Role::Dealer, None, &NotificationQuery::default())
            .await
            .unwrap();
        assert_eq!(dealer_view.len(), 1);

        let customer_view = service
            .for_user(
                Uuid::new_v4(),
                Role::Customer,
                None,
                &NotificationQuery::default(),
            )
            .await
            .unwrap();
        assert!(customer_view.is_empty());
    }

    #[tokio::test]
    async fn test_dealer_staff_targeting() {
        let service = test_service().await;
        let dealer = Uuid::new_v4();

        service
            .create(
                broadcast_request(RecipientType::DealerEmployees),
                dealer,
                Role::Dealer,
                Some(dealer),
            )
            .await
            .unwrap();

        let staff_view = service
            .for_user(
                Uuid::new_v4(),
                Role::Employee,
                Some(dealer),
                &NotificationQuery::default(),
            )
            .await
            .unwrap();
        assert_eq!(staff_view.len(), 1);

        let other_staff = service
            .for_user(
                Uuid::new_v4(),
                Role::Employee,
                Some(Uuid::new_v4()),
                &NotificationQuery::default(),
            )
            .await
            .unwrap();
        assert!(other_staff.is_empty());
    }

    #[tokio::test]
    async fn test_read_receipts_and_unread_count() {
        let service = test_service().await;
        let reader = Uuid::new_v4();

        let created = service
            .create(
                broadcast_request(RecipientType::All),
                Uuid::new_v4(),
                Role::Admin,
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            service.unread_count(reader, Role::Customer, None).await.unwrap(),
            1
        );

        let marked = service
            .mark_read(created.id, reader, Role::Customer, None)
            .await
            .unwrap();
        assert!(marked.is_read_by(reader));
        assert_eq!(
            service.unread_count(reader, Role::Customer, None).await.unwrap(),
            0
        );

        // Second read does not duplicate the receipt
        let marked = service
            .mark_read(created.id, reader, Role::Customer, None)
            .await
            .unwrap();
        assert_eq!(marked.read_by.len(), 1);

        // Other readers still see it unread
        assert_eq!(
            service
                .unread_count(Uuid::new_v4(), Role::Customer, None)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let service = test_service().await;
        let reader = Uuid::new_v4();

        for _ in 0..3 {
            service
                .create(
                    broadcast_request(RecipientType::All),
                    Uuid::new_v4(),
                    Role::Admin,
                    None,
                )
                .await
                .unwrap();
        }

        let marked = service
            .mark_all_read(reader, Role::Customer, None)
            .await
            .unwrap();
        assert_eq!(marked, 3);
        assert_eq!(
            service.unread_count(reader, Role::Customer, None).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_expired_notifications_hidden_and_cleaned() {
        let service = test_service().await;

        let mut req = broadcast_request(RecipientType::All);
        req.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        service
            .create(req, Uuid::new_v4(), Role::Admin, None)
            .await
            .unwrap();

        let visible = service
            .for_user(
                Uuid::new_v4(),
                Role::Customer,
                None,
                &NotificationQuery::default(),
            )
            .await
            .unwrap();
        assert!(visible.is_empty());

        assert_eq!(service.cleanup_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_event_on_create() {
        let service = test_service().await;
        let mut rx = service.subscribe();

        service
            .create(
                broadcast_request(RecipientType::All),
                Uuid::new_v4(),
                Role::Admin,
                None,
            )
            .await
            .unwrap();

        let NotificationEvent::New(event) = rx.try_recv().unwrap();
        assert_eq!(event.title, "Service camp");
    }
}
