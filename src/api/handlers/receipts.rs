use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{api::state::AppState, error::Result, service::ReceiptVerification};

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(default)]
    pub signature: String,
}

/// Public: anyone holding a printed receipt can check it.
pub async fn verify(
    State(state): State<AppState>,
    Path(or_number): Path<String>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<ReceiptVerification>> {
    let verification = state
        .service_context
        .payment_service
        .verify_receipt(&or_number, &params.signature)
        .await?;

    Ok(Json(verification))
}
