//! Account management API endpoints
//!
//! The registration chain: super admins register admins, admins register
//! dealers, admins or dealers register dealership staff. Dealers may only
//! touch staff bound to their own dealership.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    middleware::AuthUser,
    models::{RegisterStaffRequest, Role, UpdateStaffRequest, UserPublic},
    services::auth::NewUser,
    services::AuthService,
    utils::validation::validate_password_strength,
    utils::{AppError, AppResult},
    AppState,
};

/// Create routes for account management
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admins", get(list_admins).post(register_admin))
        .route("/admins/{id}", put(update_admin).delete(delete_admin))
        .route("/dealers", get(list_dealers).post(register_dealer))
        .route("/dealers/{id}", put(update_dealer).delete(delete_dealer))
        .route("/employees", get(list_employees).post(register_employee))
        .route(
            "/employees/{id}",
            put(update_staff_member).delete(delete_staff_member),
        )
        .route("/servicemen", get(list_servicemen).post(register_serviceman))
        .route(
            "/servicemen/{id}",
            put(update_staff_member).delete(delete_staff_member),
        )
}

fn require_role(auth_user: &AuthUser, role: Role, action: &str) -> AppResult<()> {
    if auth_user.role != role {
        return Err(AppError::Forbidden(format!(
            "Only {}s can {}",
            role, action
        )));
    }
    Ok(())
}

async fn create_account(
    state: &AppState,
    req: &RegisterStaffRequest,
    mut new_user: NewUser,
) -> AppResult<UserPublic> {
    req.validate()?;
    validate_password_strength(&req.password, state.config.auth.password_min_length)
        .map_err(AppError::ValidationError)?;

    new_user.is_approved = true;
    let auth_service = AuthService::new(state.db.clone());
    let user = auth_service.create_user(new_user).await.map_err(|e| {
        if e.to_string().contains("already exists") {
            AppError::Conflict("Email already registered".to_string())
        } else {
            AppError::Internal(e.to_string())
        }
    })?;

    Ok(user.into())
}

// ---- Admins (super admin only) -----------------------------------------

/// POST /api/v1/users/admins
async fn register_admin(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<RegisterStaffRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    require_role(&auth_user, Role::SuperAdmin, "register admins")?;

    let mut new_user = NewUser::from_staff_request(&payload, Role::Admin);
    new_user.created_by = Some(auth_user.id);
    let user = create_account(&state, &payload, new_user).await?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

/// GET /api/v1/users/admins
async fn list_admins(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    require_role(&auth_user, Role::SuperAdmin, "view admins")?;

    let auth_service = AuthService::new(state.db.clone());
    let admins: Vec<UserPublic> = auth_service
        .list_by_role(Role::Admin, None)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(json!({ "count": admins.len(), "users": admins })))
}

/// PUT /api/v1/users/admins/{id}
async fn update_admin(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStaffRequest>,
) -> AppResult<Json<serde_json::Value>> {
    require_role(&auth_user, Role::SuperAdmin, "update admins")?;

    let auth_service = AuthService::new(state.db.clone());
    let target = auth_service
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))?;
    if target.role != Role::Admin {
        return Err(AppError::BadRequest("User is not an admin".to_string()));
    }

    let user: UserPublic = auth_service.update_staff(id, &payload).await?.into();
    Ok(Json(json!({ "user": user })))
}

/// DELETE /api/v1/users/admins/{id}
async fn delete_admin(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    require_role(&auth_user, Role::SuperAdmin, "delete admins")?;

    let auth_service = AuthService::new(state.db.clone());
    let target = auth_service
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))?;
    if target.role != Role::Admin {
        return Err(AppError::BadRequest("User is not an admin".to_string()));
    }

    auth_service.delete_user(id).await?;
    Ok(Json(json!({ "success": true, "message": "Admin deleted" })))
}

// ---- Dealers (admin only) ----------------------------------------------

/// POST /api/v1/users/dealers
async fn register_dealer(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<RegisterStaffRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    require_role(&auth_user, Role::Admin, "register dealers")?;

    if payload.dealership_name.as_deref().unwrap_or("").is_empty() {
        return Err(AppError::ValidationError(
            "dealership_name is required for dealers".to_string(),
        ));
    }

    let mut new_user = NewUser::from_staff_request(&payload, Role::Dealer);
    new_user.admin_id = Some(auth_user.id);
    new_user.created_by = Some(auth_user.id);
    let user = create_account(&state, &payload, new_user).await?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

/// GET /api/v1/users/dealers
async fn list_dealers(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    require_role(&auth_user, Role::Admin, "view dealers")?;

    let auth_service = AuthService::new(state.db.clone());
    let dealers: Vec<UserPublic> = auth_service
        .list_by_role(Role::Dealer, None)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(json!({ "count": dealers.len(), "users": dealers })))
}

/// PUT /api/v1/users/dealers/{id}
async fn update_dealer(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStaffRequest>,
) -> AppResult<Json<serde_json::Value>> {
    require_role(&auth_user, Role::Admin, "update dealers")?;

    let auth_service = AuthService::new(state.db.clone());
    let target = auth_service
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Dealer not found".to_string()))?;
    if target.role != Role::Dealer {
        return Err(AppError::BadRequest("User is not a dealer".to_string()));
    }

    let user: UserPublic = auth_service.update_staff(id, &payload).await?.into();
    Ok(Json(json!({ "user": user })))
}

/// DELETE /api/v1/users/dealers/{id}
async fn delete_dealer(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    require_role(&auth_user, Role::Admin, "delete dealers")?;

    let auth_service = AuthService::new(state.db.clone());
    let target = auth_service
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Dealer not found".to_string()))?;
    if target.role != Role::Dealer {
        return Err(AppError::BadRequest("User is not a dealer".to_string()));
    }

    auth_service.delete_user(id).await?;
    Ok(Json(json!({ "success": true, "message": "Dealer deleted" })))
}

// ---- Dealership staff (admin or dealer) --------------------------------

/// Resolve the dealership a new staff member is bound to. Dealers bind
/// staff to themselves; admins must name the dealership.
async fn resolve_staff_dealer(
    state: &AppState,
    auth_user: &AuthUser,
    requested: Option<Uuid>,
    action: &str,
) -> AppResult<Uuid> {
    match auth_user.role {
        Role::Dealer => Ok(auth_user.id),
        Role::Admin => {
            let dealer_id = requested.ok_or_else(|| {
                AppError::BadRequest("dealer_id is required".to_string())
            })?;
            let auth_service = AuthService::new(state.db.clone());
            let dealer = auth_service
                .get_user_by_id(dealer_id)
                .await?
                .filter(|u| u.role == Role::Dealer)
                .ok_or_else(|| AppError::NotFound("Dealer not found".to_string()))?;
            Ok(dealer.id)
        }
        _ => Err(AppError::Forbidden(format!(
            "Only Admins or Dealers can {}",
            action
        ))),
    }
}

async fn register_staff(
    state: AppState,
    auth_user: AuthUser,
    payload: RegisterStaffRequest,
    role: Role,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let dealer_id =
        resolve_staff_dealer(&state, &auth_user, payload.dealer_id, "register staff").await?;

    let mut new_user = NewUser::from_staff_request(&payload, role);
    new_user.dealer_id = Some(dealer_id);
    new_user.created_by = Some(auth_user.id);
    let user = create_account(&state, &payload, new_user).await?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

async fn list_staff(
    state: AppState,
    auth_user: AuthUser,
    role: Role,
) -> AppResult<Json<serde_json::Value>> {
    let dealer_filter = match auth_user.role {
        Role::Admin => None,
        Role::Dealer => Some(auth_user.id),
        _ => {
            return Err(AppError::Forbidden(
                "Only Admins or Dealers can view staff".to_string(),
            ))
        }
    };

    let auth_service = AuthService::new(state.db.clone());
    let staff: Vec<UserPublic> = auth_service
        .list_by_role(role, dealer_filter)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(json!({ "count": staff.len(), "users": staff })))
}

/// Load a staff member and verify the caller may manage them
async fn managed_staff_member(
    state: &AppState,
    auth_user: &AuthUser,
    id: Uuid,
) -> AppResult<crate::models::User> {
    let auth_service = AuthService::new(state.db.clone());
    let target = auth_service
        .get_user_by_id(id)
        .await?
        .filter(|u| u.role.is_dealership_staff())
        .ok_or_else(|| AppError::NotFound("Staff member not found".to_string()))?;

    match auth_user.role {
        Role::Admin => Ok(target),
        Role::Dealer => {
            if target.dealer_id != Some(auth_user.id) {
                return Err(AppError::Forbidden(
                    "You can only manage staff at your dealership".to_string(),
                ));
            }
            Ok(target)
        }
        _ => Err(AppError::Forbidden(
            "Only Admins or Dealers can manage staff".to_string(),
        )),
    }
}

/// POST /api/v1/users/employees
async fn register_employee(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<RegisterStaffRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    register_staff(state, auth_user, payload, Role::Employee).await
}

/// GET /api/v1/users/employees
async fn list_employees(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    list_staff(state, auth_user, Role::Employee).await
}

/// POST /api/v1/users/servicemen
async fn register_serviceman(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<RegisterStaffRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    register_staff(state, auth_user, payload, Role::Serviceman).await
}

/// GET /api/v1/users/servicemen
async fn list_servicemen(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    list_staff(state, auth_user, Role::Serviceman).await
}

/// PUT /api/v1/users/employees/{id} and /api/v1/users/servicemen/{id}
async fn update_staff_member(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStaffRequest>,
) -> AppResult<Json<serde_json::Value>> {
    managed_staff_member(&state, &auth_user, id).await?;

    let auth_service = AuthService::new(state.db.clone());
    let user: UserPublic = auth_service.update_staff(id, &payload).await?.into();
    Ok(Json(json!({ "user": user })))
}

/// DELETE /api/v1/users/employees/{id} and /api/v1/users/servicemen/{id}
async fn delete_staff_member(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    managed_staff_member(&state, &auth_user, id).await?;

    let auth_service = AuthService::new(state.db.clone());
    auth_service.delete_user(id).await?;
    Ok(Json(json!({ "success": true, "message": "Staff member deleted" })))
}
