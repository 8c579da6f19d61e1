use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    api::state::AppState,
    auth::SESSION_COOKIE,
    domain::{Officer, Student, User},
    error::{AppError, Result},
};

/// The signed-in user and whichever portal profiles they hold. Only an
/// active officer record is loaded; a demoted officer browses as a student.
#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
    pub student: Option<Student>,
    pub officer: Option<Officer>,
}

impl CurrentUser {
    pub fn student(&self) -> Result<&Student> {
        self.student
            .as_ref()
            .ok_or_else(|| AppError::missing_profile("student"))
    }

    pub fn officer(&self) -> Result<&Officer> {
        self.officer
            .as_ref()
            .ok_or_else(|| AppError::missing_profile("officer"))
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let current = load_current_user(&state, &jar).await?;
    request.extensions_mut().insert(current);

    Ok(next.run(request).await)
}

/// Admin surface: an active super officer only.
pub async fn require_super_officer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let current = load_current_user(&state, &jar).await?;

    let is_super = current
        .officer
        .as_ref()
        .is_some_and(|officer| officer.is_super_officer);
    if !is_super {
        return Err(AppError::Forbidden("Super officer access required".to_string()));
    }

    request.extensions_mut().insert(current);

    Ok(next.run(request).await)
}

async fn load_current_user(state: &AppState, jar: &CookieJar) -> Result<CurrentUser> {
    let session_cookie = jar.get(SESSION_COOKIE).ok_or(AppError::Unauthorized)?;

    let ctx = &state.service_context;

    let session = ctx
        .auth_service
        .validate_session(session_cookie.value())
        .await?
        .ok_or(AppError::Unauthorized)?;

    let user = ctx
        .user_repo
        .find_by_id(session.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let student = ctx.student_repo.find_by_user(user.id).await?;
    let officer = ctx
        .officer_repo
        .find_by_user(user.id)
        .await?
        .filter(|officer| officer.is_active);

    Ok(CurrentUser {
        user,
        student,
        officer,
    })
}
