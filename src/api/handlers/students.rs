use axum::{
    extract::{Extension, State},
    Json,
};
use serde::Serialize;

use crate::{
    api::{handlers::types::StudentDto, middleware::auth::CurrentUser, state::AppState},
    error::Result,
};

#[derive(Debug, Serialize)]
pub struct StudentList {
    pub students: Vec<StudentDto>,
    pub total: usize,
}

/// Active students the officer's organization covers.
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<StudentList>> {
    let officer = current.officer()?;
    let ctx = &state.service_context;

    let scope = ctx.scope_service.scope_for_officer(officer).await?;
    let students: Vec<StudentDto> = ctx
        .student_repo
        .list_in_scope(&scope)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(StudentList {
        total: students.len(),
        students,
    }))
}
