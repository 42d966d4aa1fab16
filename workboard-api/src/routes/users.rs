//! Tenant member endpoints
//!
//! - `POST /api/tenants/:tenant_id/users`
//! - `GET /api/tenants/:tenant_id/users`
//! - `PUT /api/users/:user_id`
//! - `DELETE /api/users/:user_id`

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;
use workboard_shared::models::account::Role;
use workboard_shared::services::accounts::{
    AccountChanges, AccountView, MemberQuery, NewMember, DEFAULT_ACCOUNT_PAGE,
};

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{AppJson, AppPath, AppQuery, Authenticated, Paging},
    response::ApiResponse,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,

    #[validate(length(min = 1, max = 255, message = "Full name must be between 1 and 255 characters"))]
    pub full_name: String,

    /// Defaults to `user`
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Full name must be between 1 and 255 characters"))]
    pub full_name: Option<String>,

    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub is_active: Option<bool>,

    /// Substring of name or email
    pub search: Option<String>,
}

pub async fn create_user(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(tenant_id): AppPath<Uuid>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AccountView>>)> {
    req.validate()?;

    let account = state
        .accounts
        .create(
            &caller,
            tenant_id,
            NewMember {
                email: req.email,
                password: req.password,
                full_name: req.full_name,
                role: req.role.unwrap_or(Role::User),
            },
        )
        .await?;

    Ok(ApiResponse::created("User created successfully", account))
}

pub async fn list_users(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(tenant_id): AppPath<Uuid>,
    AppQuery(paging): AppQuery<Paging>,
    AppQuery(query): AppQuery<UserListQuery>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let listing = state
        .accounts
        .list(
            &caller.auth,
            tenant_id,
            MemberQuery {
                role: query.role,
                is_active: query.is_active,
                search: query.search,
            },
            paging.request(DEFAULT_ACCOUNT_PAGE),
        )
        .await?;

    Ok(ApiResponse::data(json!({
        "users": listing.items,
        "pagination": listing.pagination,
    })))
}

/// Members may rename themselves; role and active flag need an admin
pub async fn update_user(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(user_id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> ApiResult<Json<ApiResponse<AccountView>>> {
    req.validate()?;

    let account = state
        .accounts
        .update(
            &caller,
            user_id,
            AccountChanges {
                full_name: req.full_name,
                role: req.role,
                is_active: req.is_active,
            },
        )
        .await?;

    Ok(ApiResponse::with_message("User updated successfully", account))
}

/// Tasks assigned to the user are unassigned, not deleted
pub async fn delete_user(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(user_id): AppPath<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.accounts.delete(&caller, user_id).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}
