//! End-to-end flow: catalog -> dealer order -> approval -> sale -> service

use axum::http::StatusCode;
use serde_json::json;

use crate::common::TestApp;
use voltride::models::Role;

/// Walks the whole commercial lifecycle through the HTTP surface:
/// admin stocks the catalog, a dealer restocks from the distributor, an
/// employee rings up a sale, and the customer books warranty services
/// until the free allowance is spent.
#[tokio::test]
async fn full_dealership_lifecycle() {
    let app = TestApp::new().await;

    let (_, admin_token) = app.seed_user(Role::Admin, None).await;
    let (dealer_id, dealer_token) = app.seed_user(Role::Dealer, None).await;
    let (_, employee_token) = app.seed_user(Role::Employee, Some(dealer_id)).await;
    let (serviceman_id, serviceman_token) = app.seed_user(Role::Serviceman, Some(dealer_id)).await;
    let (customer_id, customer_token) = app.seed_user(Role::Customer, None).await;

    // Admin creates a product with master stock
    let (status, body) = app
        .post(
            "/api/v1/products",
            Some(&admin_token),
            json!({
                "name": "Lightning Pro",
                "slug": "lightning-pro",
                "model": "LIGHTNING",
                "base_price": 55000.0,
                "dealer_price": 48000.0,
                "mrp": 60000.0,
                "total_stock": 20,
                "warranty": {"free_services": 2, "warranty_period_months": 24}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let product_id = body["product"]["id"].as_str().unwrap().to_string();

    // Dealer orders 5 units; admin approval moves stock into the dealership
    let (status, body) = app
        .post(
            "/api/v1/orders/dealer",
            Some(&dealer_token),
            json!({"items": [{"product_id": product_id, "quantity": 5}]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = body["order"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["order"]["status"], "pending");
    // 5 x 48000 + 18% tax
    let grand_total = body["order"]["grand_total"].as_f64().unwrap();
    assert!((grand_total - 283200.0).abs() < 0.01);

    // A dealer cannot approve their own order
    let (status, _) = app
        .post(
            &format!("/api/v1/orders/dealer/{}/approve", order_id),
            Some(&dealer_token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            &format!("/api/v1/orders/dealer/{}/approve", order_id),
            Some(&admin_token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["status"], "approved");

    // A second approval loses the race on the pending guard
    let (status, _) = app
        .post(
            &format!("/api/v1/orders/dealer/{}/approve", order_id),
            Some(&admin_token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Master stock went down, dealer inventory went up
    let (_, body) = app
        .get("/api/v1/products/slug/lightning-pro", None)
        .await;
    assert_eq!(body["product"]["total_stock"], 15);

    let (status, body) = app.get("/api/v1/inventory", Some(&employee_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["inventory"][0]["quantity"], 5);

    // Employee rings up a sale to the registered customer
    let (status, body) = app
        .post(
            "/api/v1/billing/sales",
            Some(&employee_token),
            json!({
                "customer_id": customer_id,
                "items": [{"product_id": product_id, "quantity": 1}],
                "payment_method": "cash"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let invoice_id = body["sale"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["sale"]["payment_status"], "paid");
    assert_eq!(body["sale"]["warranty"]["free_services_remaining"], 2);

    // Inventory reflects the sale
    let (_, body) = app.get("/api/v1/inventory", Some(&dealer_token)).await;
    assert_eq!(body["inventory"][0]["quantity"], 4);

    // Customer books the first (free) service against their invoice
    let (status, body) = app
        .post(
            "/api/v1/service/requests",
            Some(&customer_token),
            json!({
                "invoice_id": invoice_id,
                "issue_type": "maintenance",
                "issue_description": "First free checkup"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = body["service_request"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["service_request"]["is_free_service"], true);
    assert_eq!(body["service_request"]["service_charge"], 0.0);
    assert_eq!(body["service_request"]["service_number"], 1);

    // Another customer cannot book on this invoice
    let (_, stranger_token) = app.seed_user(Role::Customer, None).await;
    let (status, _) = app
        .post(
            "/api/v1/service/requests",
            Some(&stranger_token),
            json!({
                "invoice_id": invoice_id,
                "issue_type": "repair",
                "issue_description": "Not mine"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Dealer assigns their serviceman
    let (status, body) = app
        .post(
            &format!("/api/v1/service/requests/{}/assign", request_id),
            Some(&dealer_token),
            json!({"serviceman_id": serviceman_id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service_request"]["status"], "assigned");

    // Serviceman works the ticket to completion
    let (status, _) = app
        .patch(
            &format!("/api/v1/service/requests/{}/status", request_id),
            Some(&serviceman_token),
            json!({"status": "in_progress"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .patch(
            &format!("/api/v1/service/requests/{}/status", request_id),
            Some(&serviceman_token),
            json!({
                "status": "completed",
                "notes": "Brakes adjusted",
                "parts_used": [{"part_name": "Brake pads", "quantity": 1, "cost": 250.0}],
                "service_time_minutes": 40
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service_request"]["status"], "completed");
    assert_eq!(body["service_request"]["parts_cost"], 250.0);

    // Warranty counters moved
    let (status, body) = app
        .get(
            &format!("/api/v1/service/warranty/{}", invoice_id),
            Some(&customer_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["warranty"]["services_completed"], 1);
    assert_eq!(body["warranty"]["services_remaining"], 1);
    assert_eq!(body["warranty"]["warranty_status"], "active");

    // Second booking is still free, numbered 2
    let (status, body) = app
        .post(
            "/api/v1/service/requests",
            Some(&customer_token),
            json!({
                "invoice_id": invoice_id,
                "issue_type": "maintenance",
                "issue_description": "Second checkup"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["service_request"]["service_number"], 2);
    assert_eq!(body["service_request"]["is_free_service"], true);

    // Dealer dashboard sees the activity
    let (status, body) = app
        .get("/api/v1/analytics/dealer/dashboard", Some(&dealer_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dashboard"]["sales"]["total"], 1);
    assert_eq!(body["dashboard"]["staff"]["employees"], 1);
    assert_eq!(body["dashboard"]["staff"]["servicemen"], 1);
}

#[tokio::test]
async fn dealer_order_rejected_on_insufficient_master_stock() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.seed_user(Role::Admin, None).await;
    let (_, dealer_token) = app.seed_user(Role::Dealer, None).await;

    let (_, body) = app
        .post(
            "/api/v1/products",
            Some(&admin_token),
            json!({
                "name": "Marium",
                "slug": "marium",
                "model": "MARIUM",
                "base_price": 45000.0,
                "dealer_price": 39000.0,
                "mrp": 50000.0,
                "total_stock": 2
            }),
        )
        .await;
    let product_id = body["product"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/api/v1/orders/dealer",
            Some(&dealer_token),
            json!({"items": [{"product_id": product_id, "quantity": 5}]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Insufficient stock"));
}

#[tokio::test]
async fn sale_fails_without_dealer_inventory() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.seed_user(Role::Admin, None).await;
    let (_, dealer_token) = app.seed_user(Role::Dealer, None).await;

    let (_, body) = app
        .post(
            "/api/v1/products",
            Some(&admin_token),
            json!({
                "name": "Marium",
                "slug": "marium",
                "model": "MARIUM",
                "base_price": 45000.0,
                "dealer_price": 39000.0,
                "mrp": 50000.0,
                "total_stock": 10
            }),
        )
        .await;
    let product_id = body["product"]["id"].as_str().unwrap().to_string();

    // No dealer order was ever approved, so the dealership holds no stock
    let (status, body) = app
        .post(
            "/api/v1/billing/sales",
            Some(&dealer_token),
            json!({
                "items": [{"product_id": product_id, "quantity": 1}],
                "payment_method": "cash"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("not in inventory"));
}

#[tokio::test]
async fn customer_order_scoping() {
    let app = TestApp::new().await;
    let (_, admin_token) = app.seed_user(Role::Admin, None).await;
    let (dealer_id, dealer_token) = app.seed_user(Role::Dealer, None).await;
    let (_, customer_token) = app.seed_user(Role::Customer, None).await;
    let (_, other_dealer_token) = app.seed_user(Role::Dealer, None).await;

    let (_, body) = app
        .post(
            "/api/v1/products",
            Some(&admin_token),
            json!({
                "name": "Lightning Pro",
                "slug": "lightning-pro",
                "model": "LIGHTNING",
                "base_price": 55000.0,
                "dealer_price": 48000.0,
                "mrp": 60000.0,
                "total_stock": 10
            }),
        )
        .await;
    let product_id = body["product"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/api/v1/orders/customer",
            Some(&customer_token),
            json!({
                "dealer_id": dealer_id,
                "items": [{"product_id": product_id, "quantity": 1}],
                "amount_paid": 10000.0
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = body["order"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["order"]["payment_status"], "partial");

    // The owning dealership can update status; another dealership cannot
    let (status, _) = app
        .patch(
            &format!("/api/v1/orders/customer/{}/status", order_id),
            Some(&other_dealer_token),
            json!({"status": "confirmed"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .patch(
            &format!("/api/v1/orders/customer/{}/status", order_id),
            Some(&dealer_token),
            json!({"status": "confirmed"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["status"], "confirmed");

    // Settle the balance; payment status derives to completed
    let remaining = body["order"]["amount_remaining"].as_f64().unwrap();
    let (status, body) = app
        .patch(
            &format!("/api/v1/orders/customer/{}/payment", order_id),
            Some(&dealer_token),
            json!({"additional_payment": remaining}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["payment_status"], "completed");
    assert_eq!(body["order"]["amount_remaining"], 0.0);

    // Customer sees exactly their own order
    let (status, body) = app.get("/api/v1/orders/customer", Some(&customer_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}
