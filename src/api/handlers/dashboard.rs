use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Serialize;

use crate::{
    api::{
        handlers::types::{FeeTypeDto, PaymentDto, PaymentRequestDto, StudentDto},
        middleware::auth::CurrentUser,
        state::AppState,
    },
    domain::{cents_to_pesos, Organization},
    error::{AppError, Result},
    service::start_of_day,
};

/// Completed payments shown on the student dashboard.
const RECENT_PAYMENTS: i64 = 10;

#[derive(Debug, Serialize)]
pub struct StudentDashboard {
    pub student: StudentDto,
    pub pending_requests: Vec<PaymentRequestDto>,
    pub completed_payments: Vec<PaymentDto>,
    pub available_fees: Vec<FeeTypeDto>,
    pub organizations: Vec<OrganizationRef>,
}

#[derive(Debug, Serialize)]
pub struct OrganizationRef {
    pub id: i64,
    pub code: String,
    pub name: String,
}

impl From<Organization> for OrganizationRef {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id,
            code: org.code,
            name: org.name,
        }
    }
}

pub async fn student_dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<StudentDashboard>> {
    let student = current.student()?;
    let ctx = &state.service_context;
    let now = Utc::now();

    let pending_requests = ctx
        .payment_request_repo
        .list_pending_by_student(student.id, now)
        .await?
        .into_iter()
        .map(|request| PaymentRequestDto::new(request, now))
        .collect();

    let completed_payments = ctx
        .payment_repo
        .list_collected_by_student(student.id, RECENT_PAYMENTS)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let organizations = ctx.scope_service.eligible_organizations(student).await?;
    let organization_ids: Vec<i64> = organizations.iter().map(|org| org.id).collect();

    let available_fees = ctx
        .fee_type_repo
        .list_active_for_organizations(&organization_ids)
        .await?
        .into_iter()
        .filter(|fee| fee.applies_to_year_level(student.year_level))
        .map(|fee| FeeTypeDto::new(fee, now))
        .collect();

    Ok(Json(StudentDashboard {
        student: student.clone().into(),
        pending_requests,
        completed_payments,
        available_fees,
        organizations: organizations.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct OfficerDashboard {
    pub organization: OrganizationRef,
    pub role: String,
    pub is_super_officer: bool,
    pub todays_payments: Vec<PaymentDto>,
    pub pending_requests: Vec<PaymentRequestDto>,
    pub total_collected_today: f64,
    pub total_collected: f64,
    pub active_fees: i64,
}

pub async fn officer_dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<OfficerDashboard>> {
    let officer = current.officer()?;
    let ctx = &state.service_context;
    let now = Utc::now();
    let today = start_of_day(now);

    let organization = ctx
        .organization_repo
        .find_by_id(officer.organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Organization {} not found", officer.organization_id)))?;

    let todays_payments = ctx
        .payment_repo
        .list_collected_by_organization(organization.id, today, today + Duration::days(1))
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let pending_requests = ctx
        .payment_request_repo
        .list_pending_by_organization(organization.id, now)
        .await?
        .into_iter()
        .map(|request| PaymentRequestDto::new(request, now))
        .collect();

    let stats = ctx.report_service.organization_stats(organization.id).await?;

    Ok(Json(OfficerDashboard {
        organization: organization.into(),
        role: officer.role.clone(),
        is_super_officer: officer.is_super_officer,
        todays_payments,
        pending_requests,
        total_collected_today: cents_to_pesos(stats.collected_today_cents),
        total_collected: cents_to_pesos(stats.total_collected_cents),
        active_fees: stats.active_fees,
    }))
}
