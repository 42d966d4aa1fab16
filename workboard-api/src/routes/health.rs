//! Health check
//!
//! ```text
//! GET /api/health
//! ```
//!
//! ```json
//! { "success": true, "data": { "status": "healthy", "version": "0.1.0", "database": "connected" } }
//! ```

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use workboard_shared::db::pool::health_check as db_health_check;

use crate::{app::AppState, response::ApiResponse};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let connected = match db_health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    ApiResponse::data(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
    })
}
