//! API surface tests: auth flow, role gating, notifications

use axum::http::StatusCode;
use serde_json::json;

use crate::common::TestApp;
use voltride::models::Role;

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn protected_routes_require_auth() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/api/v1/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/v1/inventory", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_me_round_trip() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "email": "asha@test.example",
                "password": "secret123",
                "first_name": "Asha",
                "last_name": "Verma",
                "phone": "9876543210"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "customer");
    assert!(body["access_token"].is_string());

    let (status, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({"email": "asha@test.example", "password": "secret123"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/v1/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "asha@test.example");

    // Wrong password is rejected
    let (status, _) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({"email": "asha@test.example", "password": "wrong"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn product_creation_is_admin_only() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.seed_user(Role::Admin, None).await;
    let (_, customer_token) = app.seed_user(Role::Customer, None).await;

    let payload = json!({
        "name": "Lightning Pro",
        "slug": "lightning-pro",
        "model": "LIGHTNING",
        "base_price": 55000.0,
        "dealer_price": 48000.0,
        "mrp": 60000.0,
        "total_stock": 25
    });

    let (status, _) = app
        .post("/api/v1/products", Some(&customer_token), payload.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post("/api/v1/products", Some(&admin_token), payload.clone())
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["product"]["slug"], "lightning-pro");

    // Duplicate slug conflicts
    let (status, _) = app
        .post("/api/v1/products", Some(&admin_token), payload)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Browsing needs no token
    let (status, body) = app.get("/api/v1/products", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, body) = app.get("/api/v1/products/slug/lightning-pro", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["name"], "Lightning Pro");
}

#[tokio::test]
async fn dealer_notification_targeting_is_restricted() {
    let app = TestApp::new().await;
    let (dealer_id, dealer_token) = app.seed_user(Role::Dealer, None).await;
    let (_, staff_token) = app.seed_user(Role::Employee, Some(dealer_id)).await;
    let (_, outsider_token) = app.seed_user(Role::Employee, None).await;

    // Dealers may not broadcast to everyone
    let (status, _) = app
        .post(
            "/api/v1/notifications",
            Some(&dealer_token),
            json!({
                "title": "Hello",
                "message": "For everyone",
                "recipient_type": "all"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Their own staff is fine
    let (status, _) = app
        .post(
            "/api/v1/notifications",
            Some(&dealer_token),
            json!({
                "title": "Staff meeting",
                "message": "Monday 9am",
                "recipient_type": "dealer_employees"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .get("/api/v1/notifications/unread-count", Some(&staff_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unread_count"], 1);

    // Staff at other dealerships see nothing
    let (status, body) = app
        .get("/api/v1/notifications/unread-count", Some(&outsider_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unread_count"], 0);
}

#[tokio::test]
async fn attendance_clock_cycle() {
    let app = TestApp::new().await;
    let (dealer_id, _) = app.seed_user(Role::Dealer, None).await;
    let (_, staff_token) = app.seed_user(Role::Employee, Some(dealer_id)).await;
    let (_, customer_token) = app.seed_user(Role::Customer, None).await;

    // Customers have no attendance
    let (status, _) = app
        .post("/api/v1/attendance/clock-in", Some(&customer_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post("/api/v1/attendance/clock-in", Some(&staff_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attendance"]["status"], "present");

    // Double clock-in rejected
    let (status, _) = app
        .post("/api/v1/attendance/clock-in", Some(&staff_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/api/v1/attendance/today", Some(&staff_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clocked_in"], true);
    assert_eq!(body["clocked_out"], false);

    let (status, _) = app
        .post(
            "/api/v1/attendance/clock-out",
            Some(&staff_token),
            json!({"notes": "done"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/v1/attendance/my", Some(&staff_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["present_days"], 1);
}
