//! Attendance API endpoints
//!
//! Staff clock in and out; dealers review and correct their staff's
//! records; admins get read access.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::AttendanceRepository,
    middleware::AuthUser,
    models::{AttendanceQuery, ClockOutRequest, EditAttendanceRequest, Role},
    utils::{AppError, AppResult},
    AppState,
};

/// Create attendance routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clock-in", post(clock_in))
        .route("/clock-out", post(clock_out))
        .route("/my", get(my_attendance))
        .route("/today", get(today_status))
        .route("/", get(staff_attendance))
        .route("/{id}", put(edit_attendance))
}

fn require_staff(auth_user: &AuthUser, action: &str) -> AppResult<Uuid> {
    if !auth_user.role.is_dealership_staff() {
        return Err(AppError::Forbidden(format!(
            "Only Employees and Servicemen can {}",
            action
        )));
    }
    auth_user.dealer_id.ok_or_else(|| {
        AppError::BadRequest("No dealer associated with your account".to_string())
    })
}

/// Parse a YYYY-MM month into its [start, end) date range
fn month_range(month: Option<&str>) -> AppResult<(NaiveDate, NaiveDate)> {
    let month_str = match month {
        Some(m) => m.to_string(),
        None => Utc::now().format("%Y-%m").to_string(),
    };

    let parts: Vec<&str> = month_str.split('-').collect();
    let parsed = (|| {
        if parts.len() != 2 {
            return None;
        }
        let year: i32 = parts[0].parse().ok()?;
        let month: u32 = parts[1].parse().ok()?;
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some((start, end))
    })();

    parsed.ok_or_else(|| AppError::BadRequest("Invalid month format. Use YYYY-MM".to_string()))
}

/// POST /api/v1/attendance/clock-in
async fn clock_in(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    let dealer_id = require_staff(&auth_user, "clock in")?;

    let repo = AttendanceRepository::new(&state.db);
    let record = repo
        .clock_in(auth_user.id, dealer_id, Utc::now().date_naive())
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("Already clocked in") {
                AppError::BadRequest(message)
            } else {
                AppError::Internal(message)
            }
        })?;

    Ok(Json(json!({
        "message": "Clocked in successfully",
        "attendance": record
    })))
}

/// POST /api/v1/attendance/clock-out
async fn clock_out(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<ClockOutRequest>,
) -> AppResult<Json<serde_json::Value>> {
    require_staff(&auth_user, "clock out")?;

    let repo = AttendanceRepository::new(&state.db);
    let record = repo
        .clock_out(
            auth_user.id,
            Utc::now().date_naive(),
            payload.notes.as_deref(),
            state.config.attendance.standard_day_hours,
        )
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("clocked") {
                AppError::BadRequest(message)
            } else {
                AppError::Internal(message)
            }
        })?;

    Ok(Json(json!({
        "message": "Clocked out successfully",
        "attendance": record
    })))
}

/// GET /api/v1/attendance/my
async fn my_attendance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<AttendanceQuery>,
) -> AppResult<Json<serde_json::Value>> {
    require_staff(&auth_user, "view attendance")?;

    let (start, end) = month_range(query.month.as_deref())?;

    let repo = AttendanceRepository::new(&state.db);
    let records = repo.list_for_user(auth_user.id, start, end).await?;
    let summary = AttendanceRepository::summarize(&records);

    Ok(Json(json!({
        "month": start.format("%Y-%m").to_string(),
        "attendance": records,
        "summary": summary
    })))
}

/// GET /api/v1/attendance/today
async fn today_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    require_staff(&auth_user, "view attendance")?;

    let repo = AttendanceRepository::new(&state.db);
    let record = repo
        .get_for_day(auth_user.id, Utc::now().date_naive())
        .await?;

    match record {
        Some(record) => Ok(Json(json!({
            "clocked_in": record.login_time.is_some(),
            "clocked_out": record.logout_time.is_some(),
            "attendance": record
        }))),
        None => Ok(Json(json!({
            "clocked_in": false,
            "attendance": null
        }))),
    }
}

/// GET /api/v1/attendance
///
/// Dealer view over their staff's records. Admins may read any
/// dealership's records by passing dealer_id.
async fn staff_attendance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<AttendanceQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let dealer_id = match auth_user.role {
        Role::Dealer => auth_user.id,
        Role::Admin => query.dealer_id.ok_or_else(|| {
            AppError::BadRequest("dealer_id is required".to_string())
        })?,
        _ => {
            return Err(AppError::Forbidden(
                "Only Dealers and Admins can view staff attendance".to_string(),
            ))
        }
    };

    let (start, end) = month_range(query.month.as_deref())?;

    let repo = AttendanceRepository::new(&state.db);
    let records = repo
        .list_for_dealer(
            dealer_id,
            start,
            end,
            query.user_id,
            query.status.as_deref(),
        )
        .await?;
    let summary = AttendanceRepository::summarize(&records);

    Ok(Json(json!({
        "month": start.format("%Y-%m").to_string(),
        "count": records.len(),
        "attendance": records,
        "summary": summary
    })))
}

/// PUT /api/v1/attendance/{id}
async fn edit_attendance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditAttendanceRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if auth_user.role != Role::Dealer {
        return Err(AppError::Forbidden(
            "Only Dealers can edit attendance".to_string(),
        ));
    }
    if payload.edit_reason.trim().is_empty() {
        return Err(AppError::BadRequest("Edit reason is required".to_string()));
    }

    let repo = AttendanceRepository::new(&state.db);
    let record = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attendance record not found".to_string()))?;

    if record.dealer_id != auth_user.id {
        return Err(AppError::Forbidden(
            "You can only edit attendance at your dealership".to_string(),
        ));
    }

    let record = repo
        .edit(
            &record,
            &payload,
            auth_user.id,
            state.config.attendance.standard_day_hours,
        )
        .await?;

    Ok(Json(json!({
        "message": "Attendance updated successfully",
        "attendance": record
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_month_range_parsing() {
        let (start, end) = month_range(Some("2025-06")).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());

        // December rolls into the next year
        let (start, end) = month_range(Some("2025-12")).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        assert!(month_range(Some("junk")).is_err());
        assert!(month_range(Some("2025-13")).is_err());
    }

    #[test]
    fn test_month_range_defaults_to_current_month() {
        let (start, _) = month_range(None).unwrap();
        let now = Utc::now().date_naive();
        assert_eq!(start.year(), now.year());
        assert_eq!(start.month(), now.month());
        assert_eq!(start.day(), 1);
    }
}
