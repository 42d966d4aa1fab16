//! Tenant endpoints
//!
//! - `POST /api/tenants`: self-service registration (public)
//! - `GET /api/tenants`: platform directory, super_admin only
//! - `GET /api/tenants/:tenant_id`: details with usage stats
//! - `PUT /api/tenants/:tenant_id`: rename, or change plan and status

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;
use workboard_shared::models::tenant::{SubscriptionPlan, TenantFilter, TenantStatus};
use workboard_shared::services::tenants::{
    RegisterTenant, RegistrationView, TenantChanges, TenantDetailsView, TenantView,
    DEFAULT_TENANT_PAGE,
};

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{AppJson, AppPath, AppQuery, Authenticated, ClientIp, Paging},
    response::ApiResponse,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTenantRequest {
    #[validate(length(min = 1, max = 255, message = "Tenant name must be between 1 and 255 characters"))]
    pub name: String,

    /// Trimmed and lowercased before validation
    pub subdomain: String,

    #[validate(email(message = "Invalid email address"))]
    pub admin_email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub admin_password: String,

    #[validate(length(min = 1, max = 255, message = "Full name must be between 1 and 255 characters"))]
    pub admin_full_name: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenantRequest {
    #[validate(length(min = 1, max = 255, message = "Tenant name must be between 1 and 255 characters"))]
    pub name: Option<String>,

    pub status: Option<TenantStatus>,
    pub subscription_plan: Option<SubscriptionPlan>,

    #[validate(range(min = 0, message = "maxUsers cannot be negative"))]
    pub max_users: Option<i32>,

    #[validate(range(min = 0, message = "maxProjects cannot be negative"))]
    pub max_projects: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantListQuery {
    pub status: Option<TenantStatus>,
    pub subscription_plan: Option<SubscriptionPlan>,
}

/// `POST /api/tenants`
///
/// Creates the tenant on the free plan together with its tenant_admin.
///
/// # Errors
///
/// - `400` for a bad subdomain, email, name or short password
/// - `409` "Subdomain already exists" / "Email already exists"
pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppJson(req): AppJson<RegisterTenantRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<RegistrationView>>)> {
    req.validate()?;

    let view = state
        .tenants
        .register(
            RegisterTenant {
                tenant_name: req.name,
                subdomain: req.subdomain,
                admin_email: req.admin_email,
                admin_password: req.admin_password,
                admin_full_name: req.admin_full_name,
            },
            ip,
        )
        .await?;

    Ok(ApiResponse::created("Tenant registered successfully", view))
}

pub async fn get_tenant(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(tenant_id): AppPath<Uuid>,
) -> ApiResult<Json<ApiResponse<TenantDetailsView>>> {
    let details = state.tenants.get(&caller.auth, tenant_id).await?;
    Ok(ApiResponse::data(details))
}

pub async fn update_tenant(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(tenant_id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateTenantRequest>,
) -> ApiResult<Json<ApiResponse<TenantView>>> {
    req.validate()?;

    let tenant = state
        .tenants
        .update(
            &caller,
            tenant_id,
            TenantChanges {
                name: req.name,
                status: req.status,
                subscription_plan: req.subscription_plan,
                max_users: req.max_users,
                max_projects: req.max_projects,
            },
        )
        .await?;

    Ok(ApiResponse::with_message("Tenant updated successfully", tenant))
}

pub async fn list_tenants(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppQuery(paging): AppQuery<Paging>,
    AppQuery(query): AppQuery<TenantListQuery>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let listing = state
        .tenants
        .list(
            &caller.auth,
            TenantFilter {
                status: query.status,
                subscription_plan: query.subscription_plan,
            },
            paging.request(DEFAULT_TENANT_PAGE),
        )
        .await?;

    Ok(ApiResponse::data(json!({
        "tenants": listing.items,
        "pagination": listing.pagination,
    })))
}
