//! Session endpoints
//!
//! - `POST /api/auth/login`: issue a token (public)
//! - `GET /api/auth/me`: profile of the caller
//! - `POST /api/auth/logout`: record the logout

use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;
use workboard_shared::services::sessions::{
    LoginRequest as ServiceLogin, LoginView, ProfileView, TenantSelector,
};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{AppJson, Authenticated, ClientIp},
    response::ApiResponse,
};

const MISSING_LOGIN_FIELDS: &str =
    "Email, password, and tenant subdomain or tenant ID are required";

/// Login body; the tenant is named by subdomain or id
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub tenant_subdomain: Option<String>,
    pub tenant_id: Option<Uuid>,
}

impl LoginRequest {
    fn into_service(self) -> ApiResult<ServiceLogin> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let password = self.password.filter(|p| !p.is_empty());
        let (Some(email), Some(password)) = (present(self.email), password) else {
            return Err(ApiError::BadRequest(MISSING_LOGIN_FIELDS.to_string()));
        };

        let tenant = match (present(self.tenant_subdomain), self.tenant_id) {
            (Some(subdomain), _) => TenantSelector::Subdomain(subdomain),
            (None, Some(id)) => TenantSelector::Id(id),
            (None, None) => return Err(ApiError::BadRequest(MISSING_LOGIN_FIELDS.to_string())),
        };

        Ok(ServiceLogin {
            email,
            password,
            tenant,
        })
    }
}

/// `POST /api/auth/login`
///
/// # Errors
///
/// - `400` when email, password or the tenant is missing
/// - `401` "Invalid credentials"
/// - `403` for a suspended tenant or inactive account
/// - `404` for an unknown tenant
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<LoginView>>> {
    let login = req.into_service()?;
    let view = state.sessions.login(login, ip).await?;

    Ok(ApiResponse::with_message("Login successful", view))
}

pub async fn me(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> ApiResult<Json<ApiResponse<ProfileView>>> {
    let profile = state.sessions.me(&caller.auth).await?;
    Ok(ApiResponse::data(profile))
}

/// Tokens are stateless; the client discards its copy
pub async fn logout(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Json<ApiResponse<()>> {
    state.sessions.logout(&caller);
    ApiResponse::message("Logged out successfully")
}
