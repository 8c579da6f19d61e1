use axum::{
    extract::{Extension, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    api::{handlers::types::StudentDto, middleware::auth::CurrentUser, state::AppState},
    error::Result,
    service::ProfileUpdate,
};

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 15))]
    pub phone_number: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub course_code: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Year level must be between 1 and 5"))]
    pub year_level: Option<i64>,
}

pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<StudentDto>> {
    req.validate()?;
    let student = current.student()?;

    let updated = state
        .service_context
        .profile_service
        .update_profile(
            student,
            ProfileUpdate {
                phone_number: req.phone_number,
                email: req.email,
                course_code: req.course_code,
                year_level: req.year_level,
            },
        )
        .await?;

    Ok(Json(updated.into()))
}
