use std::collections::HashMap;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::{
        handlers::types::{parse_day, PaymentDto, PaymentRequestDto},
        middleware::auth::CurrentUser,
        state::AppState,
    },
    domain::{cents_to_pesos, pesos_to_cents, PaymentMethod, PaymentSearch, Receipt},
    error::{AppError, Result},
    service::ProcessPayment,
};

#[derive(Debug, Deserialize)]
pub struct GenerateQrRequest {
    pub fee_type_id: i64,
}

pub async fn generate_qr(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<GenerateQrRequest>,
) -> Result<(StatusCode, Json<PaymentRequestDto>)> {
    let student = current.student()?;

    let request = state
        .service_context
        .payment_request_service
        .generate(student, req.fee_type_id)
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentRequestDto::new(request, Utc::now()))))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProcessPaymentRequest {
    /// Pesos handed over at the booth.
    pub amount_received: f64,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    pub qr_signature: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessPaymentResponse {
    pub payment: PaymentDto,
    pub receipt: Receipt,
    pub change: f64,
}

pub async fn process(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(request_id): Path<Uuid>,
    Json(req): Json<ProcessPaymentRequest>,
) -> Result<(StatusCode, Json<ProcessPaymentResponse>)> {
    req.validate()?;
    let officer = current.officer()?;

    let processed = state
        .service_context
        .payment_service
        .process(
            officer,
            request_id,
            ProcessPayment {
                amount_received_cents: pesos_to_cents(req.amount_received),
                payment_method: req.payment_method.unwrap_or_default(),
                notes: req.notes,
                qr_signature: req.qr_signature,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProcessPaymentResponse {
            change: cents_to_pesos(processed.change_cents),
            payment: processed.payment.into(),
            receipt: processed.receipt,
        }),
    ))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<PaymentRequestDto>> {
    let student = current.student()?;

    let request = state
        .service_context
        .payment_request_service
        .cancel(student, request_id)
        .await?;

    Ok(Json(PaymentRequestDto::new(request, Utc::now())))
}

#[derive(Debug, Deserialize, Validate)]
pub struct VoidPaymentRequest {
    #[validate(length(max = 1000))]
    pub void_reason: String,
}

pub async fn void(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(payment_id): Path<i64>,
    Json(req): Json<VoidPaymentRequest>,
) -> Result<Json<PaymentDto>> {
    req.validate()?;
    let officer = current.officer()?;

    let payment = state
        .service_context
        .payment_service
        .void(officer, payment_id, &req.void_reason)
        .await?;

    Ok(Json(payment.into()))
}

#[derive(Debug, Serialize)]
pub struct PaymentHistory {
    pub payments: Vec<PaymentDto>,
    pub requests: Vec<PaymentRequestDto>,
}

pub async fn history(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<PaymentHistory>> {
    let student = current.student()?;
    let ctx = &state.service_context;
    let now = Utc::now();

    let payments = ctx
        .payment_repo
        .list_by_student(student.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let requests = ctx
        .payment_request_repo
        .list_by_student(student.id)
        .await?
        .into_iter()
        .map(|request| PaymentRequestDto::new(request, now))
        .collect();

    Ok(Json(PaymentHistory { payments, requests }))
}

/// Students see their own payments; officers see payments of the
/// organizations they reach.
pub async fn detail(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(payment_id): Path<i64>,
) -> Result<Json<PaymentDto>> {
    let payment_service = &state.service_context.payment_service;

    // An officer who is also a student may be looking at their own payment
    // from outside their scope
    let payment = match (&current.officer, &current.student) {
        (Some(officer), Some(student)) => match payment_service.for_officer(officer, payment_id).await {
            Err(AppError::NotFound(_)) => payment_service.for_student(student, payment_id).await?,
            found => found?,
        },
        (Some(officer), None) => payment_service.for_officer(officer, payment_id).await?,
        (None, Some(student)) => payment_service.for_student(student, payment_id).await?,
        (None, None) => return Err(AppError::missing_profile("student or officer")),
    };

    Ok(Json(payment.into()))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub payments: Vec<PaymentDto>,
    pub total: usize,
}

/// `date_to` is an inclusive calendar day.
pub async fn search(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let officer = current.officer()?;

    let search = PaymentSearch {
        query: params.q,
        date_from: parse_day(params.date_from.as_deref(), "date_from")?,
        date_to: parse_day(params.date_to.as_deref(), "date_to")?.map(|day| day + Duration::days(1)),
    };

    let payments: Vec<PaymentDto> = state
        .service_context
        .payment_service
        .search(officer, &search)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(SearchResponse {
        total: payments.len(),
        payments,
    }))
}

#[derive(Debug, Serialize)]
pub struct RecentPayment {
    pub or_number: String,
    pub organization: String,
    pub amount: f64,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatus {
    pub pending_count: usize,
    pub recent_payments: Vec<RecentPayment>,
}

/// Polled by the student dashboard.
pub async fn payment_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<PaymentStatus>> {
    let student = current.student()?;
    let ctx = &state.service_context;

    let pending_count = ctx
        .payment_request_repo
        .list_pending_by_student(student.id, Utc::now())
        .await?
        .len();

    let names: HashMap<i64, String> = ctx
        .organization_repo
        .list_all()
        .await?
        .into_iter()
        .map(|org| (org.id, org.name))
        .collect();

    let recent_payments = ctx
        .payment_repo
        .list_collected_by_student(student.id, 5)
        .await?
        .into_iter()
        .map(|payment| RecentPayment {
            organization: names
                .get(&payment.organization_id)
                .cloned()
                .unwrap_or_default(),
            or_number: payment.or_number,
            amount: cents_to_pesos(payment.amount_cents),
            date: payment.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(PaymentStatus {
        pending_count,
        recent_payments,
    }))
}
