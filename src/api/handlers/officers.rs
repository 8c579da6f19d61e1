use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    api::{handlers::types::OfficerDto, middleware::auth::CurrentUser, state::AppState},
    domain::OfficerCapabilities,
    error::Result,
    service::PromotionRequest,
};

#[derive(Debug, Serialize)]
pub struct OfficerList {
    pub officers: Vec<OfficerDto>,
    pub total: usize,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<OfficerList>> {
    let officer = current.officer()?;
    let ctx = &state.service_context;

    let scope = ctx.scope_service.scope_for_officer(officer).await?;
    let officers: Vec<OfficerDto> = ctx
        .officer_repo
        .list_in_scope(&scope)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(OfficerList {
        total: officers.len(),
        officers,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PromoteRequest {
    pub student_id: i64,
    pub organization_id: i64,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub role: String,
    #[serde(default)]
    pub can_process_payments: bool,
    #[serde(default)]
    pub can_void_payments: bool,
    #[serde(default)]
    pub can_generate_reports: bool,
    #[serde(default)]
    pub can_promote_officers: bool,
    #[serde(default)]
    pub is_super_officer: bool,
}

pub async fn promote(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<PromoteRequest>,
) -> Result<(StatusCode, Json<OfficerDto>)> {
    req.validate()?;
    let actor = current.officer()?;

    let officer = state
        .service_context
        .promotion_service
        .promote(
            actor,
            PromotionRequest {
                student_id: req.student_id,
                organization_id: req.organization_id,
                role: req.role,
                capabilities: OfficerCapabilities {
                    can_process_payments: req.can_process_payments,
                    can_void_payments: req.can_void_payments,
                    can_generate_reports: req.can_generate_reports,
                    can_promote_officers: req.can_promote_officers,
                },
                is_super_officer: req.is_super_officer,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(officer.into())))
}

pub async fn demote(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(officer_id): Path<i64>,
) -> Result<Json<OfficerDto>> {
    let actor = current.officer()?;

    let ctx = &state.service_context;
    let officer = ctx.promotion_service.demote(actor, officer_id).await?;
    ctx.auth_service.invalidate_user_sessions(officer.user_id).await?;

    Ok(Json(officer.into()))
}
