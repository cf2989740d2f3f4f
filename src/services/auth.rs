//! Authentication and user management service
//!
//! Provides Argon2id password hashing and the role-gated account lifecycle:
//! customers self-register, super admins register admins, admins register
//! dealers, and admins or dealers register dealership staff.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{NaiveDate, Utc};
use rand::rngs::OsRng;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{parse_db_timestamp, parse_db_uuid, parse_opt_timestamp, parse_opt_uuid};
use crate::models::{
    EmploymentStatus, RegisterStaffRequest, Role, UpdateProfileRequest, UpdateStaffRequest, User,
};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone: String,
    role: String,
    dealer_id: Option<String>,
    admin_id: Option<String>,
    dealership_name: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    pincode: Option<String>,
    joining_date: Option<String>,
    salary: Option<f64>,
    employment_status: String,
    is_active: i64,
    is_approved: i64,
    created_by: Option<String>,
    last_login: Option<String>,
    created_at: String,
    updated_at: String,
}

/// Fields for a new account, assembled by the registration handlers
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: Role,
    pub dealer_id: Option<Uuid>,
    pub admin_id: Option<Uuid>,
    pub dealership_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub joining_date: Option<NaiveDate>,
    pub salary: Option<f64>,
    pub is_approved: bool,
    pub created_by: Option<Uuid>,
}

impl NewUser {
    /// Build a staff account from a registration request
    pub fn from_staff_request(req: &RegisterStaffRequest, role: Role) -> Self {
        Self {
            email: req.email.to_lowercase(),
            password: req.password.clone(),
            first_name: req.first_name.clone(),
            last_name: req.last_name.clone(),
            phone: req.phone.clone(),
            role,
            dealer_id: None,
            admin_id: None,
            dealership_name: req.dealership_name.clone(),
            address: req.address.clone(),
            city: req.city.clone(),
            state: req.state.clone(),
            pincode: req.pincode.clone(),
            joining_date: req.joining_date,
            salary: req.salary,
            is_approved: true,
            created_by: None,
        }
    }
}

/// Authentication service for user management
pub struct AuthService {
    pool: SqlitePool,
}

impl AuthService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Hash a password using Argon2id
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();
        Ok(password_hash)
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Authenticate by email and password
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let user = self.get_user_by_email(email).await?;

        match user {
            Some(user) => {
                if Self::verify_password(password, &user.password_hash)? {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by email")?;

        Ok(row.map(row_to_user))
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by ID")?;

        Ok(row.map(row_to_user))
    }

    /// Create a new account. Fails on a duplicate email.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        if self.get_user_by_email(&new_user.email).await?.is_some() {
            anyhow::bail!("Email already exists");
        }

        let id = Uuid::new_v4();
        let password_hash = Self::hash_password(&new_user.password)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, first_name, last_name, phone, role,
                dealer_id, admin_id, dealership_name, address, city, state, pincode,
                joining_date, salary, employment_status, is_active, is_approved,
                created_by, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'active', 1, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(new_user.email.to_lowercase())
        .bind(&password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.phone)
        .bind(new_user.role.as_str())
        .bind(new_user.dealer_id.map(|d| d.to_string()))
        .bind(new_user.admin_id.map(|a| a.to_string()))
        .bind(&new_user.dealership_name)
        .bind(&new_user.address)
        .bind(&new_user.city)
        .bind(&new_user.state)
        .bind(&new_user.pincode)
        .bind(new_user.joining_date.map(|d| d.to_string()))
        .bind(new_user.salary)
        .bind(new_user.is_approved)
        .bind(new_user.created_by.map(|c| c.to_string()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to create user")?;

        self.get_user_by_id(id)
            .await?
            .context("Failed to retrieve created user")
    }

    /// List accounts by role, optionally scoped to a dealership
    pub async fn list_by_role(&self, role: Role, dealer_id: Option<Uuid>) -> Result<Vec<User>> {
        let mut sql = "SELECT * FROM users WHERE role = ?".to_string();
        if dealer_id.is_some() {
            sql.push_str(" AND dealer_id = ?");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, UserRow>(&sql).bind(role.as_str());
        if let Some(dealer_id) = dealer_id {
            q = q.bind(dealer_id.to_string());
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;

        Ok(rows.into_iter().map(row_to_user).collect())
    }

    pub async fn count_by_role(&self, role: Role) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;
        Ok(count)
    }

    /// Self-service profile update
    pub async fn update_profile(&self, id: Uuid, req: &UpdateProfileRequest) -> Result<User> {
        let existing = self.get_user_by_id(id).await?.context("User not found")?;

        sqlx::query(
            r#"
            UPDATE users
            SET first_name = ?, last_name = ?, phone = ?,
                address = ?, city = ?, state = ?, pincode = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(req.first_name.clone().unwrap_or(existing.first_name))
        .bind(req.last_name.clone().unwrap_or(existing.last_name))
        .bind(req.phone.clone().unwrap_or(existing.phone))
        .bind(req.address.clone().or(existing.address))
        .bind(req.city.clone().or(existing.city))
        .bind(req.state.clone().or(existing.state))
        .bind(req.pincode.clone().or(existing.pincode))
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update profile")?;

        self.get_user_by_id(id)
            .await?
            .context("User not found after update")
    }

    /// Managed account update (admin/dealer managing staff)
    pub async fn update_staff(&self, id: Uuid, req: &UpdateStaffRequest) -> Result<User> {
        let existing = self.get_user_by_id(id).await?.context("User not found")?;

        sqlx::query(
            r#"
            UPDATE users
            SET first_name = ?, last_name = ?, phone = ?, dealership_name = ?,
                salary = ?, employment_status = ?, is_active = ?, is_approved = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(req.first_name.clone().unwrap_or(existing.first_name))
        .bind(req.last_name.clone().unwrap_or(existing.last_name))
        .bind(req.phone.clone().unwrap_or(existing.phone))
        .bind(req.dealership_name.clone().or(existing.dealership_name))
        .bind(req.salary.or(existing.salary))
        .bind(
            req.employment_status
                .unwrap_or(existing.employment_status)
                .as_str(),
        )
        .bind(req.is_active.unwrap_or(existing.is_active))
        .bind(req.is_approved.unwrap_or(existing.is_approved))
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update user")?;

        self.get_user_by_id(id)
            .await?
            .context("User not found after update")
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }

    /// Change password, verifying the current one first. Returns false on
    /// a wrong current password.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<bool> {
        let user = self
            .get_user_by_id(user_id)
            .await?
            .context("User not found")?;

        if !Self::verify_password(current_password, &user.password_hash)? {
            return Ok(false);
        }

        let new_password_hash = Self::hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(&new_password_hash)
            .bind(Utc::now().to_rfc3339())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update password")?;

        Ok(true)
    }

    /// Stamp last_login after a successful authentication
    pub async fn record_login(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to record login")?;
        Ok(())
    }
}

fn row_to_user(row: UserRow) -> User {
    User {
        id: parse_db_uuid(&row.id),
        email: row.email,
        password_hash: row.password_hash,
        first_name: row.first_name,
        last_name: row.last_name,
        phone: row.phone,
        role: row.role.parse().unwrap_or(Role::Customer),
        dealer_id: parse_opt_uuid(row.dealer_id.as_deref()),
        admin_id: parse_opt_uuid(row.admin_id.as_deref()),
        dealership_name: row.dealership_name,
        address: row.address,
        city: row.city,
        state: row.state,
        pincode: row.pincode,
        joining_date: row
            .joining_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        salary: row.salary,
        employment_status: row
            .employment_status
            .parse()
            .unwrap_or(EmploymentStatus::Active),
        is_active: row.is_active != 0,
        is_approved: row.is_approved != 0,
        created_by: parse_opt_uuid(row.created_by.as_deref()),
        last_login: parse_opt_timestamp(row.last_login.as_deref()),
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::init_pool;

    async fn test_service() -> AuthService {
        let pool = init_pool(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 60,
        })
        .await
        .unwrap();
        AuthService::new(pool)
    }

    fn sample_customer() -> NewUser {
        NewUser {
            email: "Rider@Example.com".to_string(),
            password: "secret123".to_string(),
            first_name: "Asha".to_string(),
            last_name: "Verma".to_string(),
            phone: "9876543210".to_string(),
            role: Role::Customer,
            dealer_id: None,
            admin_id: None,
            dealership_name: None,
            address: None,
            city: None,
            state: None,
            pincode: None,
            joining_date: None,
            salary: None,
            is_approved: true,
            created_by: None,
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let password = "my_secure_password";
        let hash = AuthService::hash_password(password).unwrap();

        assert!(AuthService::verify_password(password, &hash).unwrap());
        assert!(!AuthService::verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_hash_produces_different_hashes() {
        let password = "same_password";
        let hash1 = AuthService::hash_password(password).unwrap();
        let hash2 = AuthService::hash_password(password).unwrap();

        // Different salts should produce different hashes
        assert_ne!(hash1, hash2);

        assert!(AuthService::verify_password(password, &hash1).unwrap());
        assert!(AuthService::verify_password(password, &hash2).unwrap());
    }

    #[test]
    fn test_verify_invalid_hash() {
        let result = AuthService::verify_password("password", "not_a_valid_hash");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_create_and_authenticate() {
        let service = test_service().await;
        let created = service.create_user(sample_customer()).await.unwrap();

        // Email is normalized to lowercase
        assert_eq!(created.email, "rider@example.com");

        let authed = service
            .authenticate("RIDER@example.com", "secret123")
            .await
            .unwrap();
        assert!(authed.is_some());

        let wrong = service
            .authenticate("rider@example.com", "bad-password")
            .await
            .unwrap();
        assert!(wrong.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let service = test_service().await;
        service.create_user(sample_customer()).await.unwrap();

        let err = service.create_user(sample_customer()).await.unwrap_err();
        assert!(err.to_string().contains("Email already exists"));
    }

    #[tokio::test]
    async fn test_dealership_staff_scoping() {
        let service = test_service().await;
        let dealer_id = Uuid::new_v4();

        let mut employee = sample_customer();
        employee.email = "staff@example.com".to_string();
        employee.role = Role::Employee;
        employee.dealer_id = Some(dealer_id);
        service.create_user(employee).await.unwrap();

        let mut other = sample_customer();
        other.email = "other@example.com".to_string();
        other.role = Role::Employee;
        other.dealer_id = Some(Uuid::new_v4());
        service.create_user(other).await.unwrap();

        let staff = service
            .list_by_role(Role::Employee, Some(dealer_id))
            .await
            .unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0].email, "staff@example.com");

        assert_eq!(service.count_by_role(Role::Employee).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_change_password() {
        let service = test_service().await;
        let user = service.create_user(sample_customer()).await.unwrap();

        // Wrong current password is refused
        assert!(!service
            .change_password(user.id, "nope", "newsecret1")
            .await
            .unwrap());

        assert!(service
            .change_password(user.id, "secret123", "newsecret1")
            .await
            .unwrap());
        assert!(service
            .authenticate("rider@example.com", "newsecret1")
            .await
            .unwrap()
            .is_some());
    }
}
