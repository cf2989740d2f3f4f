//! Attendance repository

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{parse_db_timestamp, parse_db_uuid, parse_opt_timestamp, parse_opt_uuid};
use crate::models::{
    Attendance, AttendanceStatus, AttendanceSummary, EditAttendanceRequest,
};

#[derive(Debug, sqlx::FromRow)]
struct AttendanceRow {
    id: String,
    user_id: String,
    dealer_id: String,
    date: String,
    login_time: Option<String>,
    logout_time: Option<String>,
    auto_logout: i64,
    status: String,
    manually_edited: i64,
    edited_by: Option<String>,
    edit_reason: Option<String>,
    total_hours: f64,
    overtime_hours: f64,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

pub struct AttendanceRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AttendanceRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_for_day(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<Attendance>> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            "SELECT * FROM attendance WHERE user_id = ? AND date = ?",
        )
        .bind(user_id.to_string())
        .bind(date.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get attendance record")?;

        Ok(row.map(row_to_attendance))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Attendance>> {
        let row = sqlx::query_as::<_, AttendanceRow>("SELECT * FROM attendance WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await
            .context("Failed to get attendance record")?;

        Ok(row.map(row_to_attendance))
    }

    /// Clock in: create today's record, or stamp the login on an existing
    /// record that has none. Fails if already clocked in.
    pub async fn clock_in(&self, user_id: Uuid, dealer_id: Uuid, date: NaiveDate) -> Result<Attendance> {
        let now = Utc::now();

        if let Some(existing) = self.get_for_day(user_id, date).await? {
            if existing.login_time.is_some() {
                bail!("Already clocked in today");
            }
            sqlx::query(
                "UPDATE attendance SET login_time = ?, status = 'present', updated_at = ? WHERE id = ?",
            )
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .bind(existing.id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to clock in")?;

            return self
                .get_by_id(existing.id)
                .await?
                .context("Attendance record missing after clock in");
        }

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO attendance (
                id, user_id, dealer_id, date, login_time, status, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, 'present', ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(dealer_id.to_string())
        .bind(date.to_string())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(self.pool)
        .await
        .context("Failed to clock in")?;

        self.get_by_id(id)
            .await?
            .context("Attendance record missing after clock in")
    }

    /// Clock out: stamp the logout and derive worked/overtime hours.
    pub async fn clock_out(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        notes: Option<&str>,
        standard_day_hours: f64,
    ) -> Result<Attendance> {
        let Some(mut record) = self.get_for_day(user_id, date).await? else {
            bail!("Not clocked in today");
        };
        if record.login_time.is_none() {
            bail!("Not clocked in today");
        }
        if record.logout_time.is_some() {
            bail!("Already clocked out today");
        }

        let now = Utc::now();
        record.logout_time = Some(now);
        record.derive_hours(standard_day_hours);

        sqlx::query(
            r#"
            UPDATE attendance
            SET logout_time = ?, total_hours = ?, overtime_hours = ?,
                notes = COALESCE(?, notes), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now.to_rfc3339())
        .bind(record.total_hours)
        .bind(record.overtime_hours)
        .bind(notes)
        .bind(now.to_rfc3339())
        .bind(record.id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to clock out")?;

        self.get_by_id(record.id)
            .await?
            .context("Attendance record missing after clock out")
    }

    /// Records for one user inside [start, end)
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Attendance>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            "SELECT * FROM attendance \
             WHERE user_id = ? AND date >= ? AND date < ? \
             ORDER BY date DESC",
        )
        .bind(user_id.to_string())
        .bind(start.to_string())
        .bind(end.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to list attendance")?;

        Ok(rows.into_iter().map(row_to_attendance).collect())
    }

    /// Records for a dealership inside [start, end), optionally filtered
    /// by user and status.
    pub async fn list_for_dealer(
        &self,
        dealer_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        user_id: Option<Uuid>,
        status: Option<&str>,
    ) -> Result<Vec<Attendance>> {
        let mut sql = "SELECT * FROM attendance \
                       WHERE dealer_id = ? AND date >= ? AND date < ?"
            .to_string();
        if user_id.is_some() {
            sql.push_str(" AND user_id = ?");
        }
        if status.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql.push_str(" ORDER BY date DESC");

        let mut q = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(dealer_id.to_string())
            .bind(start.to_string())
            .bind(end.to_string());
        if let Some(user_id) = user_id {
            q = q.bind(user_id.to_string());
        }
        if let Some(status) = status {
            q = q.bind(status);
        }

        let rows = q
            .fetch_all(self.pool)
            .await
            .context("Failed to list staff attendance")?;

        Ok(rows.into_iter().map(row_to_attendance).collect())
    }

    /// Dealer correction: status and/or times, flagged as manually edited.
    pub async fn edit(
        &self,
        record: &Attendance,
        req: &EditAttendanceRequest,
        edited_by: Uuid,
        standard_day_hours: f64,
    ) -> Result<Attendance> {
        let mut updated = record.clone();
        if let Some(status) = req.status {
            updated.status = status;
        }
        if let Some(login) = req.login_time {
            updated.login_time = Some(login);
        }
        if let Some(logout) = req.logout_time {
            updated.logout_time = Some(logout);
        }
        updated.derive_hours(standard_day_hours);

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE attendance
            SET status = ?, login_time = ?, logout_time = ?,
                total_hours = ?, overtime_hours = ?,
                manually_edited = 1, edited_by = ?, edit_reason = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(updated.status.as_str())
        .bind(updated.login_time.map(|d| d.to_rfc3339()))
        .bind(updated.logout_time.map(|d| d.to_rfc3339()))
        .bind(updated.total_hours)
        .bind(updated.overtime_hours)
        .bind(edited_by.to_string())
        .bind(&req.edit_reason)
        .bind(now.to_rfc3339())
        .bind(record.id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to edit attendance")?;

        self.get_by_id(record.id)
            .await?
            .context("Attendance record missing after edit")
    }

    /// Open records (login without logout) whose login is older than the
    /// cutoff; fed to the auto-logout sweep.
    pub async fn open_records_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Attendance>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            "SELECT * FROM attendance \
             WHERE login_time IS NOT NULL AND logout_time IS NULL AND login_time <= ?",
        )
        .bind(cutoff.to_rfc3339())
        .fetch_all(self.pool)
        .await
        .context("Failed to load open attendance records")?;

        Ok(rows.into_iter().map(row_to_attendance).collect())
    }

    /// Force-close an open record at login + max shift length.
    pub async fn auto_logout(
        &self,
        record: &Attendance,
        max_shift_hours: u64,
        standard_day_hours: f64,
    ) -> Result<()> {
        let Some(login) = record.login_time else {
            return Ok(());
        };

        let mut updated = record.clone();
        updated.logout_time = Some(login + chrono::Duration::hours(max_shift_hours as i64));
        updated.derive_hours(standard_day_hours);

        sqlx::query(
            r#"
            UPDATE attendance
            SET logout_time = ?, auto_logout = 1, total_hours = ?, overtime_hours = ?,
                updated_at = ?
            WHERE id = ? AND logout_time IS NULL
            "#,
        )
        .bind(updated.logout_time.map(|d| d.to_rfc3339()))
        .bind(updated.total_hours)
        .bind(updated.overtime_hours)
        .bind(Utc::now().to_rfc3339())
        .bind(record.id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to auto-logout")?;

        Ok(())
    }

    /// Month summary over a set of records
    pub fn summarize(records: &[Attendance]) -> AttendanceSummary {
        let mut summary = AttendanceSummary {
            total_days: records.len() as i64,
            present_days: 0,
            half_days: 0,
            leaves: 0,
            absents: 0,
            total_hours: 0.0,
            overtime_hours: 0.0,
        };

        for record in records {
            match record.status {
                AttendanceStatus::Present => summary.present_days += 1,
                AttendanceStatus::HalfDay => summary.half_days += 1,
                AttendanceStatus::Leave => summary.leaves += 1,
                AttendanceStatus::Absent => summary.absents += 1,
                AttendanceStatus::OffDay => {}
            }
            summary.total_hours += record.total_hours;
            summary.overtime_hours += record.overtime_hours;
        }

        summary
    }
}

fn row_to_attendance(row: AttendanceRow) -> Attendance {
    Attendance {
        id: parse_db_uuid(&row.id),
        user_id: parse_db_uuid(&row.user_id),
        dealer_id: parse_db_uuid(&row.dealer_id),
        date: NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive()),
        login_time: parse_opt_timestamp(row.login_time.as_deref()),
        logout_time: parse_opt_timestamp(row.logout_time.as_deref()),
        auto_logout: row.auto_logout != 0,
        status: row.status.parse().unwrap_or(AttendanceStatus::Present),
        manually_edited: row.manually_edited != 0,
        edited_by: parse_opt_uuid(row.edited_by.as_deref()),
        edit_reason: row.edit_reason,
        total_hours: row.total_hours,
        overtime_hours: row.overtime_hours,
        notes: row.notes,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
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

    #[tokio::test]
    async fn test_clock_in_then_out() {
        let pool = test_pool().await;
        let repo = AttendanceRepository::new(&pool);
        let user_id = Uuid::new_v4();
        let dealer_id = Uuid::new_v4();
        let today = Utc::now().date_naive();

        let record = repo.clock_in(user_id, dealer_id, today).await.unwrap();
        assert!(record.login_time.is_some());
        assert_eq!(record.status, AttendanceStatus::Present);

        // Double clock-in is rejected
        let err = repo.clock_in(user_id, dealer_id, today).await.unwrap_err();
        assert!(err.to_string().contains("Already clocked in"));

        let record = repo
            .clock_out(user_id, today, Some("done for today"), 9.0)
            .await
            .unwrap();
        assert!(record.logout_time.is_some());
        assert_eq!(record.notes.as_deref(), Some("done for today"));

        let err = repo.clock_out(user_id, today, None, 9.0).await.unwrap_err();
        assert!(err.to_string().contains("Already clocked out"));
    }

    #[tokio::test]
    async fn test_clock_out_requires_clock_in() {
        let pool = test_pool().await;
        let repo = AttendanceRepository::new(&pool);

        let err = repo
            .clock_out(Uuid::new_v4(), Utc::now().date_naive(), None, 9.0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Not clocked in"));
    }

    #[tokio::test]
    async fn test_dealer_edit_flags_record() {
        let pool = test_pool().await;
        let repo = AttendanceRepository::new(&pool);
        let user_id = Uuid::new_v4();
        let dealer_id = Uuid::new_v4();
        let today = Utc::now().date_naive();

        let record = repo.clock_in(user_id, dealer_id, today).await.unwrap();
        let editor = Uuid::new_v4();

        let edited = repo
            .edit(
                &record,
                &EditAttendanceRequest {
                    status: Some(AttendanceStatus::HalfDay),
                    login_time: None,
                    logout_time: None,
                    edit_reason: "Left at noon".to_string(),
                },
                editor,
                9.0,
            )
            .await
            .unwrap();

        assert!(edited.manually_edited);
        assert_eq!(edited.edited_by, Some(editor));
        assert_eq!(edited.status, AttendanceStatus::HalfDay);
        assert_eq!(edited.edit_reason.as_deref(), Some("Left at noon"));
    }

    #[tokio::test]
    async fn test_auto_logout_sweep() {
        let pool = test_pool().await;
        let repo = AttendanceRepository::new(&pool);
        let user_id = Uuid::new_v4();
        let today = Utc::now().date_naive();

        // Seed a record opened 12 hours ago
        let login = Utc::now() - chrono::Duration::hours(12);
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO attendance \
             (id, user_id, dealer_id, date, login_time, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 'present', ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(Uuid::new_v4().to_string())
        .bind(today.to_string())
        .bind(login.to_rfc3339())
        .bind(&now)
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();

        let cutoff = Utc::now() - chrono::Duration::hours(9);
        let open = repo.open_records_before(cutoff).await.unwrap();
        assert_eq!(open.len(), 1);

        repo.auto_logout(&open[0], 9, 9.0).await.unwrap();

        let closed = repo.get_for_day(user_id, today).await.unwrap().unwrap();
        assert!(closed.auto_logout);
        assert_eq!(closed.logout_time, Some(login + chrono::Duration::hours(9)));
        assert!((closed.total_hours - 9.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_summary() {
        let records = vec![];
        let summary = AttendanceRepository::summarize(&records);
        assert_eq!(summary.total_days, 0);
        assert_eq!(summary.total_hours, 0.0);
    }
}
