use axum::{
    extract::{Extension, State},
    Json,
};
use serde::Serialize;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    error::Result,
};

#[derive(Debug, Serialize)]
pub struct ExpireResponse {
    pub expired: u64,
    pub sessions_removed: u64,
}

pub async fn expire_requests(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ExpireResponse>> {
    let officer = current.officer()?;

    let ctx = &state.service_context;
    let expired = ctx.payment_request_service.expire_stale(officer).await?;
    let sessions_removed = ctx.auth_service.cleanup_expired_sessions().await?;

    Ok(Json(ExpireResponse {
        expired,
        sessions_removed,
    }))
}
