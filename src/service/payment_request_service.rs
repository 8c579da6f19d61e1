use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    domain::{
        actions, NewActivityLog, NewPaymentRequest, Officer, PaymentRequest, PaymentRequestStatus,
        Student,
    },
    error::{is_unique_violation_on, AppError, Result},
    payments::{generate_qr_signature, queue_attempt, queue_number, render_payment_qr},
    repository::{ActivityLogRepository, FeeTypeRepository, PaymentRequestRepository},
    service::ScopeService,
};

/// Extra queue numbers tried when concurrent requests take the next one.
const MAX_QUEUE_RETRIES: u32 = 10;

pub struct PaymentRequestService {
    pool: SqlitePool,
    fee_type_repo: Arc<dyn FeeTypeRepository>,
    payment_request_repo: Arc<dyn PaymentRequestRepository>,
    activity_log_repo: Arc<dyn ActivityLogRepository>,
    scope_service: Arc<ScopeService>,
    request_ttl: Duration,
    qr_size: u32,
}

impl PaymentRequestService {
    pub fn new(
        pool: SqlitePool,
        fee_type_repo: Arc<dyn FeeTypeRepository>,
        payment_request_repo: Arc<dyn PaymentRequestRepository>,
        activity_log_repo: Arc<dyn ActivityLogRepository>,
        scope_service: Arc<ScopeService>,
        request_ttl_hours: i64,
        qr_size: u32,
    ) -> Self {
        Self {
            pool,
            fee_type_repo,
            payment_request_repo,
            activity_log_repo,
            scope_service,
            request_ttl: Duration::hours(request_ttl_hours),
            qr_size,
        }
    }

    /// Issues a PENDING request (with queue number and QR ticket) for a fee
    /// the student is eligible to pay.
    pub async fn generate(&self, student: &Student, fee_type_id: i64) -> Result<PaymentRequest> {
        let fee = self
            .fee_type_repo
            .find_by_id(fee_type_id)
            .await?
            .filter(|fee| fee.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Fee type {} not found", fee_type_id)))?;

        let organization = self
            .scope_service
            .eligible_organizations(student)
            .await?
            .into_iter()
            .find(|org| org.id == fee.organization_id)
            .ok_or_else(|| {
                AppError::Forbidden("This fee belongs to an organization that does not serve your program".to_string())
            })?;

        if !fee.applies_to_year_level(student.year_level) {
            return Err(AppError::Validation(format!(
                "{} does not apply to year level {}",
                fee.name, student.year_level
            )));
        }

        // Old requests keep their numbers, so continue after the last one
        let first_attempt = self
            .payment_request_repo
            .queue_numbers_for(student.id, organization.id)
            .await?
            .iter()
            .filter_map(|queue| queue_attempt(&organization.code, student.id, queue))
            .max()
            .map_or(1, |last| last + 1);

        let request_id = Uuid::new_v4();
        let qr_signature = generate_qr_signature();
        let qr_image = render_payment_qr(request_id, &qr_signature, self.qr_size)?;
        let mut request = NewPaymentRequest {
            request_id,
            student_id: student.id,
            organization_id: organization.id,
            fee_type_id: fee.id,
            amount_cents: fee.amount_cents,
            queue_number: queue_number(&organization.code, student.id, first_attempt),
            qr_signature,
            qr_image: Some(qr_image),
            expires_at: Utc::now() + self.request_ttl,
        };

        let mut tx = self.pool.begin().await?;

        let mut attempt = first_attempt;
        let id = loop {
            match self.payment_request_repo.insert(&mut *tx, &request).await {
                Ok(id) => break id,
                Err(e)
                    if is_unique_violation_on(&e, "payment_requests.queue_number")
                        && attempt < first_attempt + MAX_QUEUE_RETRIES =>
                {
                    tracing::debug!("Queue number {} taken, retrying", request.queue_number);
                    attempt += 1;
                    request.queue_number = queue_number(&organization.code, student.id, attempt);
                }
                Err(e) => return Err(e.into()),
            }
        };
        let queue = request.queue_number;

        self.activity_log_repo
            .append(
                &mut *tx,
                NewActivityLog::new(
                    student.user_id,
                    actions::QR_GENERATED,
                    format!("Student {} generated QR for {}", student.full_name(), fee.name),
                )
                .with_request(id),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Payment request {} issued to student {}", queue, student.id);

        self.payment_request_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created payment request".to_string()))
    }

    /// Student-initiated cancellation of their own pending request.
    pub async fn cancel(&self, student: &Student, request_id: Uuid) -> Result<PaymentRequest> {
        let request = self.find(request_id).await?;

        if request.student_id != student.id {
            return Err(AppError::Forbidden("You can only cancel your own payment requests".to_string()));
        }

        let now = Utc::now();
        ensure_actionable(&request, now)?;

        let mut tx = self.pool.begin().await?;

        let moved = self
            .payment_request_repo
            .transition(&mut *tx, request.id, PaymentRequestStatus::Cancelled, now)
            .await?;
        if moved == 0 {
            return Err(AppError::Conflict("Payment request is no longer pending".to_string()));
        }

        self.activity_log_repo
            .append(
                &mut *tx,
                NewActivityLog::new(
                    student.user_id,
                    actions::PAYMENT_CANCELLED,
                    format!("Student cancelled payment request {}", request.queue_number),
                )
                .with_request(request.id),
            )
            .await?;

        tx.commit().await?;

        self.find(request_id).await
    }

    /// Persists EXPIRED on every pending request past its expiry. Super
    /// officers only.
    pub async fn expire_stale(&self, actor: &Officer) -> Result<u64> {
        if !actor.is_active || !actor.is_super_officer {
            return Err(AppError::Forbidden("Only super officers can expire payment requests".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let expired = self
            .payment_request_repo
            .expire_stale(&mut *tx, Utc::now())
            .await?;

        self.activity_log_repo
            .append(
                &mut *tx,
                NewActivityLog::new(
                    actor.user_id,
                    actions::REQUESTS_EXPIRED,
                    format!("Expired {} stale payment request(s)", expired),
                ),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Expired {} stale payment requests", expired);

        Ok(expired)
    }

    pub async fn find(&self, request_id: Uuid) -> Result<PaymentRequest> {
        self.payment_request_repo
            .find_by_request_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment request not found".to_string()))
    }
}

/// Conflict unless the request is still PENDING and unexpired.
pub(crate) fn ensure_actionable(request: &PaymentRequest, now: DateTime<Utc>) -> Result<()> {
    match request.effective_status(now) {
        PaymentRequestStatus::Pending => Ok(()),
        PaymentRequestStatus::Expired => Err(AppError::Conflict(format!(
            "Payment request {} has expired",
            request.queue_number
        ))),
        status => Err(AppError::Conflict(format!(
            "Payment request {} is already {}",
            request.queue_number,
            status.as_str()
        ))),
    }
}
