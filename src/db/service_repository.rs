//! Service ticket and warranty tracker repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{parse_db_timestamp, parse_db_uuid, parse_json_column, parse_opt_timestamp, parse_opt_uuid};
use crate::models::{
    IssueType, PartUsed, ServiceCustomerInfo, ServicePaymentStatus, ServicePriority,
    ServiceQuery, ServiceRequest, ServiceStatus, StatusHistoryEntry, UpdateServiceStatusRequest,
    WarrantyStatus, WarrantyTracker,
};

#[derive(Debug, sqlx::FromRow)]
struct ServiceRequestRow {
    id: String,
    request_number: String,
    customer_id: String,
    customer: Option<String>,
    product_id: String,
    invoice_id: String,
    service_number: i64,
    is_free_service: i64,
    service_charge: f64,
    display_label: Option<String>,
    issue_type: String,
    issue_description: Option<String>,
    priority: String,
    dealer_id: String,
    assigned_to: Option<String>,
    assigned_date: Option<String>,
    status: String,
    status_history: String,
    parts_used: String,
    service_notes: Option<String>,
    service_time_minutes: i64,
    parts_cost: f64,
    total_cost: f64,
    payment_status: String,
    scheduled_date: Option<String>,
    started_at: Option<String>,
    completed_at: Option<String>,
    rating: Option<i64>,
    feedback: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, sqlx::FromRow)]
struct TrackerRow {
    id: String,
    invoice_id: String,
    customer_id: String,
    product_id: String,
    total_free_services: i64,
    services_completed: i64,
    services_remaining: i64,
    service_request_ids: String,
    warranty_status: String,
    warranty_expiry_date: Option<String>,
    expiry_reminder_sent: i64,
    activated_at: String,
    last_service_date: Option<String>,
}

/// Listing scope resolved from the caller's role
#[derive(Debug, Clone, Copy)]
pub enum ServiceScope {
    All,
    Dealer(Uuid),
    Serviceman(Uuid),
    Customer(Uuid),
}

pub struct ServiceRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ServiceRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the tracker for an invoice, creating it on first booking.
    pub async fn get_or_create_tracker(
        &self,
        invoice_id: Uuid,
        customer_id: Uuid,
        product_id: Uuid,
        total_free_services: i64,
        expiry_date: Option<DateTime<Utc>>,
    ) -> Result<WarrantyTracker> {
        if let Some(existing) = self.get_tracker_by_invoice(invoice_id).await? {
            return Ok(existing);
        }

        sqlx::query(
            r#"
            INSERT INTO warranty_trackers (
                id, invoice_id, customer_id, product_id,
                total_free_services, services_completed, services_remaining,
                warranty_status, warranty_expiry_date, activated_at
            )
            VALUES (?, ?, ?, ?, ?, 0, ?, 'active', ?, ?)
            ON CONFLICT(invoice_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(invoice_id.to_string())
        .bind(customer_id.to_string())
        .bind(product_id.to_string())
        .bind(total_free_services)
        .bind(total_free_services)
        .bind(expiry_date.map(|d| d.to_rfc3339()))
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool)
        .await
        .context("Failed to create warranty tracker")?;

        self.get_tracker_by_invoice(invoice_id)
            .await?
            .context("Warranty tracker missing after creation")
    }

    pub async fn get_tracker_by_invoice(&self, invoice_id: Uuid) -> Result<Option<WarrantyTracker>> {
        let row =
            sqlx::query_as::<_, TrackerRow>("SELECT * FROM warranty_trackers WHERE invoice_id = ?")
                .bind(invoice_id.to_string())
                .fetch_optional(self.pool)
                .await
                .context("Failed to get warranty tracker")?;

        Ok(row.map(row_to_tracker))
    }

    pub async fn insert_request(&self, request: &ServiceRequest) -> Result<ServiceRequest> {
        sqlx::query(
            r#"
            INSERT INTO service_requests (
                id, request_number, customer_id, customer, product_id, invoice_id,
                service_number, is_free_service, service_charge, display_label,
                issue_type, issue_description, priority, dealer_id,
                status, status_history, parts_used, parts_cost, total_cost,
                payment_status, scheduled_date, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.id.to_string())
        .bind(&request.request_number)
        .bind(request.customer_id.to_string())
        .bind(
            request
                .customer
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(request.product_id.to_string())
        .bind(request.invoice_id.to_string())
        .bind(request.service_number)
        .bind(request.is_free_service)
        .bind(request.service_charge)
        .bind(&request.display_label)
        .bind(request.issue_type.as_str())
        .bind(&request.issue_description)
        .bind(request.priority.as_str())
        .bind(request.dealer_id.to_string())
        .bind(request.status.as_str())
        .bind(serde_json::to_string(&request.status_history)?)
        .bind(serde_json::to_string(&request.parts_used)?)
        .bind(request.parts_cost)
        .bind(request.total_cost)
        .bind(request.payment_status.as_str())
        .bind(request.scheduled_date.map(|d| d.to_rfc3339()))
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .execute(self.pool)
        .await
        .context("Failed to create service request")?;

        // Link the request on the tracker
        let tracker = self
            .get_tracker_by_invoice(request.invoice_id)
            .await?
            .context("Warranty tracker missing")?;
        let mut ids = tracker.service_request_ids;
        ids.push(request.id);
        sqlx::query("UPDATE warranty_trackers SET service_request_ids = ? WHERE invoice_id = ?")
            .bind(serde_json::to_string(&ids)?)
            .bind(request.invoice_id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to link service request on tracker")?;

        self.get_request(request.id)
            .await?
            .context("Service request missing after creation")
    }

    pub async fn get_request(&self, id: Uuid) -> Result<Option<ServiceRequest>> {
        let row =
            sqlx::query_as::<_, ServiceRequestRow>("SELECT * FROM service_requests WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(self.pool)
                .await
                .context("Failed to get service request")?;

        Ok(row.map(row_to_request))
    }

    pub async fn list(&self, scope: ServiceScope, query: &ServiceQuery) -> Result<Vec<ServiceRequest>> {
        let mut sql = "SELECT * FROM service_requests WHERE 1=1".to_string();
        match scope {
            ServiceScope::All => {}
            ServiceScope::Dealer(_) => sql.push_str(" AND dealer_id = ?"),
            ServiceScope::Serviceman(_) => sql.push_str(" AND assigned_to = ?"),
            ServiceScope::Customer(_) => sql.push_str(" AND customer_id = ?"),
        }
        if query.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if query.priority.is_some() {
            sql.push_str(" AND priority = ?");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, ServiceRequestRow>(&sql);
        match scope {
            ServiceScope::All => {}
            ServiceScope::Dealer(id)
            | ServiceScope::Serviceman(id)
            | ServiceScope::Customer(id) => {
                q = q.bind(id.to_string());
            }
        }
        if let Some(ref status) = query.status {
            q = q.bind(status);
        }
        if let Some(ref priority) = query.priority {
            q = q.bind(priority);
        }
        q = q
            .bind(query.limit.unwrap_or(20).clamp(1, 100))
            .bind(query.offset.unwrap_or(0).max(0));

        let rows = q
            .fetch_all(self.pool)
            .await
            .context("Failed to list service requests")?;

        Ok(rows.into_iter().map(row_to_request).collect())
    }

    /// Assign a serviceman to a pending request
    pub async fn assign(
        &self,
        request: &ServiceRequest,
        serviceman_id: Uuid,
        serviceman_name: &str,
        dealer_id: Uuid,
    ) -> Result<ServiceRequest> {
        let now = Utc::now();
        let mut history = request.status_history.clone();
        history.push(StatusHistoryEntry {
            status: ServiceStatus::Assigned,
            timestamp: now,
            updated_by: Some(dealer_id),
            notes: Some(format!("Assigned to {}", serviceman_name)),
        });

        sqlx::query(
            r#"
            UPDATE service_requests
            SET assigned_to = ?, assigned_date = ?, status = 'assigned',
                status_history = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(serviceman_id.to_string())
        .bind(now.to_rfc3339())
        .bind(serde_json::to_string(&history)?)
        .bind(now.to_rfc3339())
        .bind(request.id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to assign service request")?;

        self.get_request(request.id)
            .await?
            .context("Service request missing after assignment")
    }

    /// Advance the request's status and record the work done.
    ///
    /// Completion also bumps the warranty tracker's counters and flips it
    /// to completed once the free allowance is exhausted, in the same
    /// transaction.
    pub async fn update_status(
        &self,
        request: &ServiceRequest,
        update: &UpdateServiceStatusRequest,
        updated_by: Uuid,
    ) -> Result<ServiceRequest> {
        let now = Utc::now();

        let mut history = request.status_history.clone();
        history.push(StatusHistoryEntry {
            status: update.status,
            timestamp: now,
            updated_by: Some(updated_by),
            notes: update.notes.clone(),
        });

        let mut parts = request.parts_used.clone();
        let mut parts_cost = request.parts_cost;
        for part in &update.parts_used {
            parts_cost += part.cost;
            parts.push(part.clone());
        }
        let total_cost = request.service_charge + parts_cost;

        let service_notes = match (&request.service_notes, &update.notes) {
            (Some(existing), Some(new)) => Some(format!("{}\n{}", existing, new)),
            (None, Some(new)) => Some(new.clone()),
            (existing, None) => existing.clone(),
        };

        let started_at = if update.status == ServiceStatus::InProgress {
            request.started_at.or(Some(now))
        } else {
            request.started_at
        };
        let completed_at = if update.status == ServiceStatus::Completed {
            Some(now)
        } else {
            request.completed_at
        };

        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        sqlx::query(
            r#"
            UPDATE service_requests
            SET status = ?, status_history = ?, parts_used = ?, parts_cost = ?,
                total_cost = ?, service_notes = ?,
                service_time_minutes = service_time_minutes + ?,
                started_at = ?, completed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.status.as_str())
        .bind(serde_json::to_string(&history)?)
        .bind(serde_json::to_string(&parts)?)
        .bind(parts_cost)
        .bind(total_cost)
        .bind(&service_notes)
        .bind(update.service_time_minutes.max(0))
        .bind(started_at.map(|d| d.to_rfc3339()))
        .bind(completed_at.map(|d| d.to_rfc3339()))
        .bind(now.to_rfc3339())
        .bind(request.id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to update service request")?;

        if update.status == ServiceStatus::Completed {
            sqlx::query(
                r#"
                UPDATE warranty_trackers
                SET services_completed = services_completed + 1,
                    services_remaining = MAX(0, total_free_services - (services_completed + 1)),
                    last_service_date = ?,
                    warranty_status = CASE
                        WHEN services_completed + 1 >= total_free_services THEN 'completed'
                        ELSE warranty_status
                    END
                WHERE invoice_id = ?
                "#,
            )
            .bind(now.to_rfc3339())
            .bind(request.invoice_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to update warranty tracker")?;
        }

        tx.commit().await.context("Failed to commit status update")?;

        self.get_request(request.id)
            .await?
            .context("Service request missing after update")
    }

    pub async fn count_by_status(&self, dealer_id: Option<Uuid>, status: ServiceStatus) -> Result<i64> {
        let sql = if dealer_id.is_some() {
            "SELECT COUNT(*) FROM service_requests WHERE status = ? AND dealer_id = ?"
        } else {
            "SELECT COUNT(*) FROM service_requests WHERE status = ?"
        };
        let mut q = sqlx::query_scalar::<_, i64>(sql).bind(status.as_str());
        if let Some(d) = dealer_id {
            q = q.bind(d.to_string());
        }
        let count = q
            .fetch_one(self.pool)
            .await
            .context("Failed to count service requests")?;
        Ok(count)
    }

    /// Active trackers whose warranty expires before the cutoff and that
    /// have not been reminded yet; fed to the reminder sweep.
    pub async fn trackers_expiring_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<WarrantyTracker>> {
        let rows = sqlx::query_as::<_, TrackerRow>(
            "SELECT * FROM warranty_trackers \
             WHERE warranty_status = 'active' \
               AND expiry_reminder_sent = 0 \
               AND warranty_expiry_date IS NOT NULL \
               AND warranty_expiry_date <= ?",
        )
        .bind(cutoff.to_rfc3339())
        .fetch_all(self.pool)
        .await
        .context("Failed to load expiring trackers")?;

        Ok(rows.into_iter().map(row_to_tracker).collect())
    }

    /// Flag a tracker as reminded so the sweep does not repeat itself
    pub async fn mark_expiry_reminder_sent(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE warranty_trackers SET expiry_reminder_sent = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to mark reminder sent")?;
        Ok(())
    }

    /// Flip active trackers past their expiry date to expired. Returns the
    /// number of trackers touched.
    pub async fn expire_lapsed_trackers(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE warranty_trackers \
             SET warranty_status = 'expired' \
             WHERE warranty_status = 'active' \
               AND warranty_expiry_date IS NOT NULL \
               AND warranty_expiry_date <= ?",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool)
        .await
        .context("Failed to expire trackers")?;

        Ok(result.rows_affected())
    }
}

fn row_to_request(row: ServiceRequestRow) -> ServiceRequest {
    ServiceRequest {
        id: parse_db_uuid(&row.id),
        request_number: row.request_number,
        customer_id: parse_db_uuid(&row.customer_id),
        customer: row
            .customer
            .as_deref()
            .and_then(|c| serde_json::from_str::<ServiceCustomerInfo>(c).ok()),
        product_id: parse_db_uuid(&row.product_id),
        invoice_id: parse_db_uuid(&row.invoice_id),
        service_number: row.service_number,
        is_free_service: row.is_free_service != 0,
        service_charge: row.service_charge,
        display_label: row.display_label,
        issue_type: row.issue_type.parse().unwrap_or(IssueType::Maintenance),
        issue_description: row.issue_description,
        priority: row.priority.parse().unwrap_or(ServicePriority::Medium),
        dealer_id: parse_db_uuid(&row.dealer_id),
        assigned_to: parse_opt_uuid(row.assigned_to.as_deref()),
        assigned_date: parse_opt_timestamp(row.assigned_date.as_deref()),
        status: row.status.parse().unwrap_or(ServiceStatus::Pending),
        status_history: parse_json_column::<Vec<StatusHistoryEntry>>(Some(&row.status_history)),
        parts_used: parse_json_column::<Vec<PartUsed>>(Some(&row.parts_used)),
        service_notes: row.service_notes,
        service_time_minutes: row.service_time_minutes,
        parts_cost: row.parts_cost,
        total_cost: row.total_cost,
        payment_status: row
            .payment_status
            .parse()
            .unwrap_or(ServicePaymentStatus::Free),
        scheduled_date: parse_opt_timestamp(row.scheduled_date.as_deref()),
        started_at: parse_opt_timestamp(row.started_at.as_deref()),
        completed_at: parse_opt_timestamp(row.completed_at.as_deref()),
        rating: row.rating,
        feedback: row.feedback,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}

fn row_to_tracker(row: TrackerRow) -> WarrantyTracker {
    WarrantyTracker {
        id: parse_db_uuid(&row.id),
        invoice_id: parse_db_uuid(&row.invoice_id),
        customer_id: parse_db_uuid(&row.customer_id),
        product_id: parse_db_uuid(&row.product_id),
        total_free_services: row.total_free_services,
        services_completed: row.services_completed,
        services_remaining: row.services_remaining,
        service_request_ids: parse_json_column::<Vec<Uuid>>(Some(&row.service_request_ids)),
        warranty_status: row.warranty_status.parse().unwrap_or(WarrantyStatus::Active),
        warranty_expiry_date: parse_opt_timestamp(row.warranty_expiry_date.as_deref()),
        expiry_reminder_sent: row.expiry_reminder_sent != 0,
        activated_at: parse_db_timestamp(&row.activated_at),
        last_service_date: parse_opt_timestamp(row.last_service_date.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::init_pool;

    async fn test_pool() -> SqlitePool {
        init_pool(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 60,
        })
        .await
        .unwrap()
    }

    fn sample_request(
        invoice_id: Uuid,
        customer_id: Uuid,
        dealer_id: Uuid,
        service_number: i64,
        is_free: bool,
    ) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest {
            id: Uuid::new_v4(),
            request_number: ServiceRequest::generate_request_number(),
            customer_id,
            customer: None,
            product_id: Uuid::new_v4(),
            invoice_id,
            service_number,
            is_free_service: is_free,
            service_charge: if is_free { 0.0 } else { 500.0 },
            display_label: None,
            issue_type: IssueType::Maintenance,
            issue_description: Some("Brake check".to_string()),
            priority: ServicePriority::Medium,
            dealer_id,
            assigned_to: None,
            assigned_date: None,
            status: ServiceStatus::Pending,
            status_history: vec![StatusHistoryEntry {
                status: ServiceStatus::Pending,
                timestamp: now,
                updated_by: None,
                notes: Some("Service request created by customer".to_string()),
            }],
            parts_used: vec![],
            service_notes: None,
            service_time_minutes: 0,
            parts_cost: 0.0,
            total_cost: 0.0,
            payment_status: if is_free {
                ServicePaymentStatus::Free
            } else {
                ServicePaymentStatus::Pending
            },
            scheduled_date: None,
            started_at: None,
            completed_at: None,
            rating: None,
            feedback: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_tracker_get_or_create_is_idempotent() {
        let pool = test_pool().await;
        let repo = ServiceRepository::new(&pool);
        let invoice_id = Uuid::new_v4();

        let first = repo
            .get_or_create_tracker(invoice_id, Uuid::new_v4(), Uuid::new_v4(), 4, None)
            .await
            .unwrap();
        let second = repo
            .get_or_create_tracker(invoice_id, Uuid::new_v4(), Uuid::new_v4(), 4, None)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.services_remaining, 4);
    }

    #[tokio::test]
    async fn test_completion_bumps_warranty_counters() {
        let pool = test_pool().await;
        let repo = ServiceRepository::new(&pool);
        let invoice_id = Uuid::new_v4();
        let customer_id = Uuid::new_v4();
        let dealer_id = Uuid::new_v4();
        let serviceman = Uuid::new_v4();

        repo.get_or_create_tracker(invoice_id, customer_id, Uuid::new_v4(), 2, None)
            .await
            .unwrap();
        let request = repo
            .insert_request(&sample_request(invoice_id, customer_id, dealer_id, 1, true))
            .await
            .unwrap();

        let request = repo
            .assign(&request, serviceman, "Ravi Kumar", dealer_id)
            .await
            .unwrap();
        assert_eq!(request.status, ServiceStatus::Assigned);

        let request = repo
            .update_status(
                &request,
                &UpdateServiceStatusRequest {
                    status: ServiceStatus::InProgress,
                    notes: None,
                    parts_used: vec![],
                    service_time_minutes: 0,
                },
                serviceman,
            )
            .await
            .unwrap();
        assert!(request.started_at.is_some());

        let request = repo
            .update_status(
                &request,
                &UpdateServiceStatusRequest {
                    status: ServiceStatus::Completed,
                    notes: Some("Brakes adjusted".to_string()),
                    parts_used: vec![PartUsed {
                        part_name: "Brake pads".to_string(),
                        quantity: 1,
                        cost: 250.0,
                    }],
                    service_time_minutes: 45,
                },
                serviceman,
            )
            .await
            .unwrap();

        assert_eq!(request.status, ServiceStatus::Completed);
        assert!(request.completed_at.is_some());
        assert_eq!(request.parts_cost, 250.0);
        assert_eq!(request.total_cost, 250.0);
        assert_eq!(request.service_time_minutes, 45);
        // pending + assigned + in_progress + completed
        assert_eq!(request.status_history.len(), 4);

        let tracker = repo.get_tracker_by_invoice(invoice_id).await.unwrap().unwrap();
        assert_eq!(tracker.services_completed, 1);
        assert_eq!(tracker.services_remaining, 1);
        assert_eq!(tracker.warranty_status, WarrantyStatus::Active);
        assert!(tracker.last_service_date.is_some());
        assert_eq!(tracker.service_request_ids, vec![request.id]);
    }

    #[tokio::test]
    async fn test_exhausting_free_allowance_completes_warranty() {
        let pool = test_pool().await;
        let repo = ServiceRepository::new(&pool);
        let invoice_id = Uuid::new_v4();
        let customer_id = Uuid::new_v4();
        let dealer_id = Uuid::new_v4();

        repo.get_or_create_tracker(invoice_id, customer_id, Uuid::new_v4(), 1, None)
            .await
            .unwrap();
        let request = repo
            .insert_request(&sample_request(invoice_id, customer_id, dealer_id, 1, true))
            .await
            .unwrap();

        repo.update_status(
            &request,
            &UpdateServiceStatusRequest {
                status: ServiceStatus::Completed,
                notes: None,
                parts_used: vec![],
                service_time_minutes: 0,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let tracker = repo.get_tracker_by_invoice(invoice_id).await.unwrap().unwrap();
        assert_eq!(tracker.warranty_status, WarrantyStatus::Completed);
        assert_eq!(tracker.services_remaining, 0);
    }

    #[tokio::test]
    async fn test_scoped_listing() {
        let pool = test_pool().await;
        let repo = ServiceRepository::new(&pool);
        let invoice_id = Uuid::new_v4();
        let customer_id = Uuid::new_v4();
        let dealer_id = Uuid::new_v4();

        repo.get_or_create_tracker(invoice_id, customer_id, Uuid::new_v4(), 4, None)
            .await
            .unwrap();
        repo.insert_request(&sample_request(invoice_id, customer_id, dealer_id, 1, true))
            .await
            .unwrap();

        assert_eq!(
            repo.list(ServiceScope::Customer(customer_id), &ServiceQuery::default())
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            repo.list(ServiceScope::Dealer(dealer_id), &ServiceQuery::default())
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            repo.list(
                ServiceScope::Serviceman(Uuid::new_v4()),
                &ServiceQuery::default()
            )
            .await
            .unwrap()
            .len(),
            0
        );
    }

    #[tokio::test]
    async fn test_expire_lapsed_trackers() {
        let pool = test_pool().await;
        let repo = ServiceRepository::new(&pool);
        let expired_invoice = Uuid::new_v4();
        let active_invoice = Uuid::new_v4();

        repo.get_or_create_tracker(
            expired_invoice,
            Uuid::new_v4(),
            Uuid::new_v4(),
            4,
            Some(Utc::now() - chrono::Duration::days(1)),
        )
        .await
        .unwrap();
        repo.get_or_create_tracker(
            active_invoice,
            Uuid::new_v4(),
            Uuid::new_v4(),
            4,
            Some(Utc::now() + chrono::Duration::days(300)),
        )
        .await
        .unwrap();

        assert_eq!(repo.expire_lapsed_trackers().await.unwrap(), 1);

        let expired = repo
            .get_tracker_by_invoice(expired_invoice)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(expired.warranty_status, WarrantyStatus::Expired);

        let active = repo
            .get_tracker_by_invoice(active_invoice)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.warranty_status, WarrantyStatus::Active);
    }
}
