//! Notification API endpoints

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        Json, Sse,
    },
    routing::{get, post, put},
    Router,
};
use futures::stream::Stream;
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::{
    middleware::AuthUser,
    models::{CreateNotificationRequest, NotificationQuery, RecipientType, Role},
    services::NotificationEvent,
    utils::{AppError, AppResult},
    AppState,
};

/// Create notification routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(my_notifications).post(create_notification))
        .route("/unread-count", get(unread_count))
        .route("/mark-all-read", post(mark_all_read))
        .route("/stream", get(notification_stream))
        .route("/{id}/read", put(mark_read))
}

/// POST /api/v1/notifications
///
/// Admins may target anyone; dealers only their own staff or specific
/// users.
async fn create_notification(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateNotificationRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    if !matches!(auth_user.role, Role::Admin | Role::Dealer) {
        return Err(AppError::Forbidden(
            "Only Admins and Dealers can send notifications".to_string(),
        ));
    }

    if payload.title.trim().is_empty() || payload.message.trim().is_empty() {
        return Err(AppError::BadRequest(
            "title and message are required".to_string(),
        ));
    }

    if auth_user.role == Role::Dealer
        && !matches!(
            payload.recipient_type,
            RecipientType::DealerEmployees | RecipientType::SpecificUsers
        )
    {
        return Err(AppError::Forbidden(
            "Dealers can only notify their own staff or specific users".to_string(),
        ));
    }

    // Dealership targeting is bound to the sender's own dealership
    let dealer_id = match payload.recipient_type {
        RecipientType::DealerEmployees => Some(auth_user.id),
        _ => None,
    };

    let notification = state
        .notifications
        .create(payload, auth_user.id, auth_user.role, dealer_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "notification": notification })),
    ))
}

/// GET /api/v1/notifications
async fn my_notifications(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let notifications = state
        .notifications
        .for_user(auth_user.id, auth_user.role, auth_user.dealer_id, &query)
        .await?;

    // Flag each row with the caller's read state
    let annotated: Vec<serde_json::Value> = notifications
        .iter()
        .map(|n| {
            let mut value = serde_json::to_value(n).unwrap_or_default();
            if let Some(obj) = value.as_object_mut() {
                obj.insert("read".to_string(), json!(n.is_read_by(auth_user.id)));
            }
            value
        })
        .collect();

    Ok(Json(json!({
        "count": annotated.len(),
        "notifications": annotated
    })))
}

/// GET /api/v1/notifications/unread-count
async fn unread_count(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    let count = state
        .notifications
        .unread_count(auth_user.id, auth_user.role, auth_user.dealer_id)
        .await?;

    Ok(Json(json!({ "unread_count": count })))
}

/// PUT /api/v1/notifications/{id}/read
async fn mark_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let notification = state
        .notifications
        .mark_read(id, auth_user.id, auth_user.role, auth_user.dealer_id)
        .await?;

    Ok(Json(json!({ "notification": notification })))
}

/// POST /api/v1/notifications/mark-all-read
async fn mark_all_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    let count = state
        .notifications
        .mark_all_read(auth_user.id, auth_user.role, auth_user.dealer_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": count,
        "message": format!("Marked {} notifications as read", count)
    })))
}

/// GET /api/v1/notifications/stream
///
/// Server-Sent Events stream of new notifications addressed to the caller.
async fn notification_stream(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.notifications.subscribe();

    use futures::StreamExt as _;

    let stream = BroadcastStream::new(receiver).filter_map(move |result| {
        let auth_user = auth_user.clone();
        Box::pin(async move {
            match result {
                Ok(NotificationEvent::New(notification)) => {
                    if notification.is_recipient(
                        auth_user.id,
                        auth_user.role,
                        auth_user.dealer_id,
                    ) {
                        Some(Ok::<_, Infallible>(
                            Event::default()
                                .json_data(json!({
                                    "type": "new",
                                    "notification": notification
                                }))
                                .unwrap(),
                        ))
                    } else {
                        None
                    }
                }
                Err(_) => None,
            }
        })
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
