use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    api::{handlers::types::FeeTypeDto, state::AppState},
    error::{AppError, Result},
};

#[derive(Debug, Serialize)]
pub struct OrganizationFees {
    pub code: String,
    pub name: String,
    pub booth_location: String,
    pub fees: Vec<FeeTypeDto>,
}

pub async fn fees(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<OrganizationFees>> {
    let ctx = &state.service_context;

    let organization = ctx
        .organization_repo
        .find_by_code(&code)
        .await?
        .filter(|org| org.is_active)
        .ok_or_else(|| AppError::NotFound(format!("Organization {} not found", code)))?;

    let now = Utc::now();
    let fees = ctx
        .fee_type_repo
        .list_active_by_organization(organization.id)
        .await?
        .into_iter()
        .map(|fee| FeeTypeDto::new(fee, now))
        .collect();

    Ok(Json(OrganizationFees {
        code: organization.code,
        name: organization.name,
        booth_location: organization.booth_location,
        fees,
    }))
}
