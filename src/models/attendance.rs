//! Attendance models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Attendance status for a day
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    HalfDay,
    Leave,
    OffDay,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::HalfDay => "half_day",
            AttendanceStatus::Leave => "leave",
            AttendanceStatus::OffDay => "off_day",
        }
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "half_day" => Ok(AttendanceStatus::HalfDay),
            "leave" => Ok(AttendanceStatus::Leave),
            "off_day" => Ok(AttendanceStatus::OffDay),
            _ => Err(format!("Invalid attendance status: {}", s)),
        }
    }
}

/// One attendance record per staff user per calendar day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub dealer_id: Uuid,
    pub date: NaiveDate,
    pub login_time: Option<DateTime<Utc>>,
    pub logout_time: Option<DateTime<Utc>>,
    pub auto_logout: bool,
    pub status: AttendanceStatus,
    pub manually_edited: bool,
    pub edited_by: Option<Uuid>,
    pub edit_reason: Option<String>,
    pub total_hours: f64,
    pub overtime_hours: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attendance {
    /// Derive worked and overtime hours from the login/logout interval.
    /// Overtime is time beyond the standard working day.
    pub fn derive_hours(&mut self, standard_day_hours: f64) {
        if let (Some(login), Some(logout)) = (self.login_time, self.logout_time) {
            let worked = (logout - login).num_seconds() as f64 / 3600.0;
            self.total_hours = worked.max(0.0);
            self.overtime_hours = (self.total_hours - standard_day_hours).max(0.0);
        }
    }
}

/// Clock-out request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClockOutRequest {
    pub notes: Option<String>,
}

/// Dealer correction of an attendance record
#[derive(Debug, Clone, Deserialize)]
pub struct EditAttendanceRequest {
    pub status: Option<AttendanceStatus>,
    pub login_time: Option<DateTime<Utc>>,
    pub logout_time: Option<DateTime<Utc>>,
    pub edit_reason: String,
}

/// Attendance list query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceQuery {
    /// Month in YYYY-MM form; defaults to the current month
    pub month: Option<String>,
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    /// Dealership selector for admin reads
    pub dealer_id: Option<Uuid>,
}

/// Monthly attendance summary
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSummary {
    pub total_days: i64,
    pub present_days: i64,
    pub half_days: i64,
    pub leaves: i64,
    pub absents: i64,
    pub total_hours: f64,
    pub overtime_hours: f64,
}
