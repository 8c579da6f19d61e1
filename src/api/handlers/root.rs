use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;

use crate::{api::state::AppState, error::Result};

#[derive(Debug, Serialize)]
pub struct OrganizationSummary {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub hierarchy_level: String,
    pub description: String,
    pub booth_location: String,
    pub contact_email: String,
}

/// Landing data: the active organizations collecting fees.
pub async fn root(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let organizations: Vec<OrganizationSummary> = state
        .service_context
        .organization_repo
        .list_active()
        .await?
        .into_iter()
        .map(|org| OrganizationSummary {
            id: org.id,
            code: org.code,
            name: org.name,
            hierarchy_level: org.hierarchy_level.as_str().to_string(),
            description: org.description,
            booth_location: org.booth_location,
            contact_email: org.contact_email,
        })
        .collect();

    Ok(Json(json!({
        "name": "orgpay",
        "version": env!("CARGO_PKG_VERSION"),
        "organizations": organizations,
    })))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
