use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use crate::{
    api::{
        handlers::types::{parse_day, FeeTypeDto},
        middleware::auth::CurrentUser,
        state::AppState,
    },
    domain::{pesos_to_cents, CreateFeeTypeRequest, Semester, UpdateFeeTypeRequest},
    error::Result,
};

fn default_year_levels() -> String {
    "ALL".to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct FeeForm {
    #[validate(length(min = 1, max = 100, message = "Fee name must be 1 to 100 characters"))]
    pub name: String,
    /// Pesos.
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than zero"))]
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 20))]
    pub academic_year: String,
    pub semester: Semester,
    #[serde(default = "default_year_levels")]
    pub applicable_year_levels: String,
    /// YYYY-MM-DD
    #[serde(default)]
    pub deadline: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFeeForm {
    pub organization_id: i64,
    #[serde(flatten)]
    #[validate(nested)]
    pub fee: FeeForm,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateFeeForm>,
) -> Result<(StatusCode, Json<FeeTypeDto>)> {
    req.validate()?;
    let officer = current.officer()?;
    let deadline = parse_day(req.fee.deadline.as_deref(), "deadline")?;

    let fee = state
        .service_context
        .fee_type_service
        .create(
            officer,
            CreateFeeTypeRequest {
                organization_id: req.organization_id,
                name: req.fee.name,
                amount_cents: pesos_to_cents(req.fee.amount),
                description: req.fee.description,
                academic_year: req.fee.academic_year,
                semester: req.fee.semester,
                applicable_year_levels: req.fee.applicable_year_levels,
                deadline,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(FeeTypeDto::new(fee, Utc::now()))))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(fee_type_id): Path<i64>,
    Json(req): Json<FeeForm>,
) -> Result<Json<FeeTypeDto>> {
    req.validate()?;
    let officer = current.officer()?;
    let deadline = parse_day(req.deadline.as_deref(), "deadline")?;

    let fee = state
        .service_context
        .fee_type_service
        .update(
            officer,
            fee_type_id,
            UpdateFeeTypeRequest {
                name: req.name,
                amount_cents: pesos_to_cents(req.amount),
                description: req.description,
                academic_year: req.academic_year,
                semester: req.semester,
                applicable_year_levels: req.applicable_year_levels,
                deadline,
            },
        )
        .await?;

    Ok(Json(FeeTypeDto::new(fee, Utc::now())))
}

pub async fn deactivate(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(fee_type_id): Path<i64>,
) -> Result<Json<FeeTypeDto>> {
    let officer = current.officer()?;

    let fee = state
        .service_context
        .fee_type_service
        .deactivate(officer, fee_type_id)
        .await?;

    Ok(Json(FeeTypeDto::new(fee, Utc::now())))
}
