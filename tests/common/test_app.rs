//! Test application setup utilities
//!
//! Builds an application instance over an in-memory SQLite database and
//! drives it through tower's `oneshot`, no listening socket required.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use voltride::{
    api,
    config::{AppConfig, DatabaseConfig},
    db,
    middleware::auth::create_access_token,
    models::Role,
    services::auth::NewUser,
    services::{AuthService, NotificationService},
    AppState,
};

const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Test application wrapper for integration testing
pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application with an in-memory SQLite database
    pub async fn new() -> Self {
        let config = test_config();

        let db = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize test database");

        let notifications = NotificationService::new(db.clone());

        let state = AppState {
            config,
            db,
            notifications,
        };

        Self { state }
    }

    /// Router with auth middleware on protected routes, as in main
    pub fn router(&self) -> Router {
        Router::new()
            .nest("/api/v1", api::public_routes())
            .nest(
                "/api/v1",
                api::protected_routes().layer(axum::middleware::from_fn_with_state(
                    self.state.clone(),
                    voltride::middleware::auth::auth_middleware,
                )),
            )
            .with_state(self.state.clone())
    }

    /// Create an account directly and return its id and a bearer token
    pub async fn seed_user(&self, role: Role, dealer_id: Option<Uuid>) -> (Uuid, String) {
        let auth_service = AuthService::new(self.state.db.clone());
        let user = auth_service
            .create_user(NewUser {
                email: format!("{}-{}@test.example", role.as_str(), Uuid::new_v4()),
                password: "secret123".to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                phone: "9876543210".to_string(),
                role,
                dealer_id,
                admin_id: None,
                dealership_name: (role == Role::Dealer).then(|| "Test Dealership".to_string()),
                address: None,
                city: None,
                state: None,
                pincode: None,
                joining_date: None,
                salary: None,
                is_approved: true,
                created_by: None,
            })
            .await
            .expect("Failed to seed user");

        let token = create_access_token(&user, TEST_JWT_SECRET, 12).expect("Failed to mint token");
        (user.id, token)
    }

    /// Send a request and return (status, parsed JSON body)
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", path, token, None).await
    }

    pub async fn post(
        &self,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.request("POST", path, token, Some(body)).await
    }

    pub async fn patch(
        &self,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.request("PATCH", path, token, Some(body)).await
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    config.database = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        connect_timeout_secs: 5,
        idle_timeout_secs: 60,
    };
    config
}
