//! Background task scheduler
//!
//! Two periodic sweeps, both checking every minute:
//! - attendance auto-logout: force-closes records left open past the
//!   configured maximum shift
//! - warranty maintenance: expires lapsed trackers, notifies customers
//!   whose warranty ends within 30 days, and prunes expired notifications

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::AttendanceConfig;
use crate::db::{AttendanceRepository, DbPool, ServiceRepository};
use crate::models::{
    CreateNotificationRequest, NotificationPriority, NotificationType, RecipientType, Role,
};
use crate::services::NotificationService;

/// Scheduler state
#[derive(Clone)]
pub struct SchedulerState {
    running: Arc<RwLock<bool>>,
    pool: DbPool,
    attendance: AttendanceConfig,
    notifications: NotificationService,
}

impl SchedulerState {
    pub fn new(pool: DbPool, attendance: AttendanceConfig, notifications: NotificationService) -> Self {
        Self {
            running: Arc::new(RwLock::new(true)),
            pool,
            attendance,
            notifications,
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        info!("Background scheduler stop requested");
    }
}

/// Start the background scheduler
pub fn start_background_scheduler(
    pool: DbPool,
    attendance: AttendanceConfig,
    notifications: NotificationService,
) -> SchedulerState {
    let state = SchedulerState::new(pool, attendance, notifications);

    let attendance_state = state.clone();
    tokio::spawn(async move {
        attendance_sweep_task(attendance_state).await;
    });

    let warranty_state = state.clone();
    tokio::spawn(async move {
        warranty_sweep_task(warranty_state).await;
    });

    info!("Background scheduler started");
    state
}

/// Attendance auto-logout sweep
async fn attendance_sweep_task(state: SchedulerState) {
    let mut interval_timer = interval(Duration::from_secs(60));
    info!("Attendance auto-logout task started (check interval: 60s)");

    loop {
        interval_timer.tick().await;

        if !*state.running.read().await {
            info!("Attendance auto-logout task stopping");
            break;
        }

        if let Err(e) = run_attendance_sweep(&state).await {
            error!("Error in attendance auto-logout sweep: {}", e);
        }
    }
}

async fn run_attendance_sweep(state: &SchedulerState) -> anyhow::Result<()> {
    let repo = AttendanceRepository::new(&state.pool);
    let cutoff = Utc::now() - chrono::Duration::hours(state.attendance.auto_logout_hours as i64);

    let open = repo.open_records_before(cutoff).await?;
    if open.is_empty() {
        debug!("No attendance records to auto-close");
        return Ok(());
    }

    for record in &open {
        repo.auto_logout(
            record,
            state.attendance.auto_logout_hours,
            state.attendance.standard_day_hours,
        )
        .await?;
        info!(user_id = %record.user_id, date = %record.date, "Auto-logged out staff member");
    }

    Ok(())
}

/// Warranty expiry and notification cleanup sweep
async fn warranty_sweep_task(state: SchedulerState) {
    let mut interval_timer = interval(Duration::from_secs(60));
    info!("Warranty maintenance task started (check interval: 60s)");

    loop {
        interval_timer.tick().await;

        if !*state.running.read().await {
            info!("Warranty maintenance task stopping");
            break;
        }

        if let Err(e) = run_warranty_sweep(&state).await {
            error!("Error in warranty maintenance sweep: {}", e);
        }
    }
}

async fn run_warranty_sweep(state: &SchedulerState) -> anyhow::Result<()> {
    let repo = ServiceRepository::new(&state.pool);

    let expired = repo.expire_lapsed_trackers().await?;
    if expired > 0 {
        info!(count = expired, "Expired lapsed warranty trackers");
    }

    // Remind customers whose warranty ends within 30 days, once per tracker
    let cutoff = Utc::now() + chrono::Duration::days(30);
    for tracker in repo.trackers_expiring_before(cutoff).await? {
        let expiry = tracker
            .warranty_expiry_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        state
            .notifications
            .create(
                CreateNotificationRequest {
                    title: "Warranty expiring soon".to_string(),
                    message: format!(
                        "Your warranty expires on {}. {} free services remain.",
                        expiry, tracker.services_remaining
                    ),
                    recipient_type: RecipientType::SpecificUsers,
                    recipient_roles: vec![],
                    recipient_ids: vec![tracker.customer_id],
                    notification_type: NotificationType::Warning,
                    priority: NotificationPriority::High,
                    action_url: None,
                    action_label: None,
                    expires_at: tracker.warranty_expiry_date,
                },
                Uuid::nil(),
                Role::Admin,
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        repo.mark_expiry_reminder_sent(tracker.id).await?;
        info!(invoice_id = %tracker.invoice_id, "Sent warranty expiry reminder");
    }

    let pruned = state
        .notifications
        .cleanup_expired()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    if pruned > 0 {
        debug!(count = pruned, "Pruned expired notifications");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::init_pool;

    #[tokio::test]
    async fn test_scheduler_stop_flag() {
        let pool = init_pool(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 60,
        })
        .await
        .unwrap();

        let notifications = NotificationService::new(pool.clone());
        let state = SchedulerState::new(pool, AttendanceConfig::default(), notifications);

        assert!(state.is_running().await);
        state.stop().await;
        assert!(!state.is_running().await);
    }

    #[tokio::test]
    async fn test_warranty_sweep_sends_reminder_once() {
        let pool = init_pool(&crate::config::DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 60,
        })
        .await
        .unwrap();

        let customer_id = Uuid::new_v4();
        let repo = ServiceRepository::new(&pool);
        repo.get_or_create_tracker(
            Uuid::new_v4(),
            customer_id,
            Uuid::new_v4(),
            4,
            Some(Utc::now() + chrono::Duration::days(10)),
        )
        .await
        .unwrap();

        let notifications = NotificationService::new(pool.clone());
        let state = SchedulerState::new(
            pool.clone(),
            AttendanceConfig::default(),
            notifications.clone(),
        );

        run_warranty_sweep(&state).await.unwrap();
        assert_eq!(
            notifications
                .unread_count(customer_id, Role::Customer, None)
                .await
                .unwrap(),
            1
        );

        // The flag stops a second reminder
        run_warranty_sweep(&state).await.unwrap();
        assert_eq!(
            notifications
                .unread_count(customer_id, Role::Customer, None)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_attendance_sweep_closes_stale_records() {
        let pool = init_pool(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 60,
        })
        .await
        .unwrap();

        let user_id = uuid::Uuid::new_v4();
        let login = Utc::now() - chrono::Duration::hours(12);
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO attendance \
             (id, user_id, dealer_id, date, login_time, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 'present', ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(Utc::now().date_naive().to_string())
        .bind(login.to_rfc3339())
        .bind(&now)
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();

        let notifications = NotificationService::new(pool.clone());
        let state = SchedulerState::new(pool.clone(), AttendanceConfig::default(), notifications);
        run_attendance_sweep(&state).await.unwrap();

        let repo = AttendanceRepository::new(&pool);
        let record = repo
            .get_for_day(user_id, Utc::now().date_naive())
            .await
            .unwrap()
            .unwrap();
        assert!(record.auto_logout);
        assert!(record.logout_time.is_some());
    }
}
