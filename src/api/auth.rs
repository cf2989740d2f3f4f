//! Authentication API endpoints
//!
//! Login, token refresh, customer self-registration, profile management.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    middleware::auth::{create_access_token, create_refresh_token, validate_token, TokenType},
    middleware::AuthUser,
    models::{
        AuthResponse, ChangePasswordRequest, LoginRequest, RefreshTokenRequest,
        RegisterCustomerRequest, Role, TokenResponse, UpdateProfileRequest, UserPublic,
    },
    services::auth::NewUser,
    services::AuthService,
    utils::validation::validate_password_strength,
    utils::{AppError, AppResult},
    AppState,
};

/// Create public routes for authentication endpoints (no auth required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .route("/register", post(register))
}

/// Create protected routes for authentication endpoints (auth required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_current_user))
        .route("/change-password", post(change_password))
        .route("/profile", put(update_profile))
}

/// Login handler
///
/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let auth_service = AuthService::new(state.db.clone());

    let user = auth_service
        .authenticate(&payload.email, &payload.password)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }
    if !user.is_approved {
        return Err(AppError::Forbidden(
            "Account is awaiting approval".to_string(),
        ));
    }

    auth_service.record_login(user.id).await?;

    let access_token = create_access_token(
        &user,
        &state.config.auth.jwt_secret,
        state.config.auth.token_expiry_hours,
    )
    .map_err(|e| AppError::Internal(format!("Failed to create access token: {}", e)))?;

    let refresh_token = create_refresh_token(
        &user,
        &state.config.auth.jwt_secret,
        state.config.auth.refresh_token_expiry_days,
    )
    .map_err(|e| AppError::Internal(format!("Failed to create refresh token: {}", e)))?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.auth.token_expiry_hours * 3600,
        user: user.into(),
    }))
}

/// Refresh token handler
///
/// POST /api/v1/auth/refresh
async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token_data = validate_token(&payload.refresh_token, &state.config.auth.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

    if token_data.claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Invalid token type".to_string()));
    }

    // Re-read the user so a fresh token reflects current role and status
    let user_id = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user ID in token".to_string()))?;

    let auth_service = AuthService::new(state.db.clone());
    let user = auth_service
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    let access_token = create_access_token(
        &user,
        &state.config.auth.jwt_secret,
        state.config.auth.token_expiry_hours,
    )
    .map_err(|e| AppError::Internal(format!("Failed to create access token: {}", e)))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.auth.token_expiry_hours * 3600,
    }))
}

/// Logout response
#[derive(Debug, Serialize)]
struct LogoutResponse {
    message: String,
}

/// Logout handler
///
/// POST /api/v1/auth/logout
///
/// Tokens are stateless; logout is handled client-side by discarding them.
/// The endpoint exists for client symmetry.
async fn logout() -> Json<LogoutResponse> {
    Json(LogoutResponse {
        message: "Successfully logged out".to_string(),
    })
}

/// Customer self-registration
///
/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterCustomerRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    payload.validate()?;
    validate_password_strength(&payload.password, state.config.auth.password_min_length)
        .map_err(AppError::ValidationError)?;

    let auth_service = AuthService::new(state.db.clone());
    let user = auth_service
        .create_user(NewUser {
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
            phone: payload.phone,
            role: Role::Customer,
            dealer_id: None,
            admin_id: None,
            dealership_name: None,
            address: payload.address,
            city: payload.city,
            state: payload.state,
            pincode: payload.pincode,
            joining_date: None,
            salary: None,
            is_approved: true,
            created_by: None,
        })
        .await
        .map_err(|e| {
            if e.to_string().contains("already exists") {
                AppError::Conflict("Email already registered".to_string())
            } else {
                AppError::Internal(e.to_string())
            }
        })?;

    let access_token = create_access_token(
        &user,
        &state.config.auth.jwt_secret,
        state.config.auth.token_expiry_hours,
    )
    .map_err(|e| AppError::Internal(format!("Failed to create access token: {}", e)))?;
    let refresh_token = create_refresh_token(
        &user,
        &state.config.auth.jwt_secret,
        state.config.auth.refresh_token_expiry_days,
    )
    .map_err(|e| AppError::Internal(format!("Failed to create refresh token: {}", e)))?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: state.config.auth.token_expiry_hours * 3600,
            user: user.into(),
        }),
    ))
}

/// Current user handler
///
/// GET /api/v1/auth/me
async fn get_current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<UserPublic>> {
    let auth_service = AuthService::new(state.db.clone());
    let user = auth_service
        .get_user_by_id(auth_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Change password handler
///
/// POST /api/v1/auth/change-password
async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    validate_password_strength(&payload.new_password, state.config.auth.password_min_length)
        .map_err(AppError::ValidationError)?;

    let auth_service = AuthService::new(state.db.clone());
    let changed = auth_service
        .change_password(auth_user.id, &payload.current_password, &payload.new_password)
        .await?;

    if !changed {
        return Err(AppError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Password changed successfully"
    })))
}

/// Profile update handler
///
/// PUT /api/v1/auth/profile
async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserPublic>> {
    let auth_service = AuthService::new(state.db.clone());
    let user = auth_service.update_profile(auth_user.id, &payload).await?;

    Ok(Json(user.into()))
}
