//! User model and authentication DTOs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// User role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Dealer,
    Employee,
    Serviceman,
    #[default]
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Dealer => "dealer",
            Role::Employee => "employee",
            Role::Serviceman => "serviceman",
            Role::Customer => "customer",
        }
    }

    /// Staff roles are bound to a dealership and tracked for attendance
    pub fn is_dealership_staff(&self) -> bool {
        matches!(self, Role::Employee | Role::Serviceman)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "dealer" => Ok(Role::Dealer),
            "employee" => Ok(Role::Employee),
            "serviceman" => Ok(Role::Serviceman),
            "customer" => Ok(Role::Customer),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Employment status for dealership staff
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    #[default]
    Active,
    Inactive,
    Terminated,
    OnLeave,
}

impl EmploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentStatus::Active => "active",
            EmploymentStatus::Inactive => "inactive",
            EmploymentStatus::Terminated => "terminated",
            EmploymentStatus::OnLeave => "on_leave",
        }
    }
}

impl std::str::FromStr for EmploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EmploymentStatus::Active),
            "inactive" => Ok(EmploymentStatus::Inactive),
            "terminated" => Ok(EmploymentStatus::Terminated),
            "on_leave" => Ok(EmploymentStatus::OnLeave),
            _ => Err(format!("Invalid employment status: {}", s)),
        }
    }
}

/// User entity
///
/// A single table backs every role. Dealers are tenant roots; employees and
/// servicemen carry `dealer_id` binding them to a dealership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: Role,
    /// Dealership binding for employees and servicemen
    pub dealer_id: Option<Uuid>,
    /// Admin who registered this dealer
    pub admin_id: Option<Uuid>,
    pub dealership_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub joining_date: Option<NaiveDate>,
    pub salary: Option<f64>,
    pub employment_status: EmploymentStatus,
    pub is_active: bool,
    pub is_approved: bool,
    pub created_by: Option<Uuid>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Display name used on orders and invoices: dealership name for
    /// dealers, full name otherwise.
    pub fn display_name(&self) -> String {
        match (&self.role, &self.dealership_name) {
            (Role::Dealer, Some(name)) if !name.is_empty() => name.clone(),
            _ => self.full_name(),
        }
    }
}

/// User without password hash for safe serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: Role,
    pub dealer_id: Option<Uuid>,
    pub dealership_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub employment_status: EmploymentStatus,
    pub is_active: bool,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role,
            dealer_id: user.dealer_id,
            dealership_name: user.dealership_name,
            city: user.city,
            state: user.state,
            employment_status: user.employment_status,
            is_active: user.is_active,
            is_approved: user.is_approved,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Customer self-registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterCustomerRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(min = 7, max = 15))]
    pub phone: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

/// Staff registration request (admins, dealers, employees, servicemen)
///
/// Which fields apply depends on the role being registered; dealership
/// details for dealers, employment details for dealership staff.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterStaffRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(min = 7, max = 15))]
    pub phone: String,
    pub dealership_name: Option<String>,
    /// Target dealership; required when an admin registers staff
    pub dealer_id: Option<Uuid>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub joining_date: Option<NaiveDate>,
    pub salary: Option<f64>,
}

/// Profile update request (self-service)
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

/// Staff update request (admin/dealer managing accounts)
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStaffRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub dealership_name: Option<String>,
    pub salary: Option<f64>,
    pub employment_status: Option<EmploymentStatus>,
    pub is_active: Option<bool>,
    pub is_approved: Option<bool>,
}

/// Change password request
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Authentication response with tokens
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserPublic,
}

/// Token response for refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}
