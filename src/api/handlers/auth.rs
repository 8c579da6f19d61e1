use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    api::{handlers::types::StudentDto, state::AppState},
    auth::{AuthService, SESSION_COOKIE},
    domain::Semester,
    error::{AppError, Result},
    service::Registration,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub is_student: bool,
    pub is_officer: bool,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let ctx = &state.service_context;
    let email = req.email.trim().to_lowercase();

    let password_hash = ctx
        .user_repo
        .get_password_hash(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !AuthService::verify_password(&req.password, &password_hash).await? {
        return Err(AppError::Unauthorized);
    }

    let user = ctx
        .user_repo
        .find_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let is_student = ctx.student_repo.find_by_user(user.id).await?.is_some();
    let is_officer = ctx
        .officer_repo
        .find_by_user(user.id)
        .await?
        .is_some_and(|officer| officer.is_active);

    let (_session, token) = ctx.auth_service.create_session(user.id).await?;
    let cookie = ctx
        .auth_service
        .create_session_cookie(&token, state.settings.auth.secure_cookies);

    tracing::debug!("User {} signed in", user.id);

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "Login successful".to_string(),
            is_student,
            is_officer,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        let _ = state
            .service_context
            .auth_service
            .invalidate_session(session_cookie.value())
            .await;
    }

    let jar = jar.add(AuthService::create_logout_cookie());

    Ok((jar, StatusCode::NO_CONTENT))
}

fn default_academic_year() -> String {
    "2024-2025".to_string()
}

fn default_semester() -> Semester {
    Semester::First
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 3, max = 150, message = "Username must be 3 to 150 characters"))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(min = 1, max = 20))]
    pub student_id_number: String,
    pub course_code: String,
    #[validate(range(min = 1, max = 5, message = "Year level must be between 1 and 5"))]
    pub year_level: i64,
    #[serde(default)]
    #[validate(length(max = 15))]
    pub phone_number: String,
    #[serde(default = "default_academic_year")]
    pub academic_year: String,
    #[serde(default = "default_semester")]
    pub semester: Semester,
}

/// Student self-registration. Logs the new student in on success.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<StudentDto>)> {
    req.validate()?;

    let ctx = &state.service_context;
    let student = ctx
        .profile_service
        .register(Registration {
            email: req.email,
            username: req.username,
            password: req.password,
            first_name: req.first_name,
            middle_name: req.middle_name,
            last_name: req.last_name,
            student_id_number: req.student_id_number,
            course_code: req.course_code,
            year_level: req.year_level,
            phone_number: req.phone_number,
            academic_year: req.academic_year,
            semester: req.semester,
        })
        .await?;

    let (_session, token) = ctx.auth_service.create_session(student.user_id).await?;
    let cookie = ctx
        .auth_service
        .create_session_cookie(&token, state.settings.auth.secure_cookies);

    Ok((StatusCode::CREATED, jar.add(cookie), Json(student.into())))
}
