use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    domain::{
        actions, NewActivityLog, NewPayment, Officer, Payment, PaymentMethod, PaymentRequestStatus,
        PaymentSearch, PaymentStatus, Receipt, Student, MIN_VOID_REASON_LEN,
    },
    error::{is_unique_violation_on, AppError, Result},
    payments::{constant_time_eq, generate_or_number, ReceiptSigner},
    repository::{
        ActivityLogRepository, PaymentRepository, PaymentRequestRepository, ReceiptRepository,
    },
    service::{payment_request_service::ensure_actionable, ScopeService},
};

/// Attempts at drawing an unused OR number.
const MAX_OR_NUMBER_ATTEMPTS: u32 = 10;

/// Where OR numbers are drawn from. Random by default.
pub type OrNumberSource = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ProcessPayment {
    pub amount_received_cents: i64,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    /// Signature read off the scanned QR ticket, when the officer scanned one.
    pub qr_signature: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedPayment {
    pub payment: Payment,
    pub receipt: Receipt,
    pub change_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptVerification {
    pub or_number: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_void: Option<bool>,
}

pub struct PaymentService {
    pool: SqlitePool,
    payment_request_repo: Arc<dyn PaymentRequestRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    receipt_repo: Arc<dyn ReceiptRepository>,
    activity_log_repo: Arc<dyn ActivityLogRepository>,
    scope_service: Arc<ScopeService>,
    signer: ReceiptSigner,
    or_numbers: OrNumberSource,
}

impl PaymentService {
    pub fn new(
        pool: SqlitePool,
        payment_request_repo: Arc<dyn PaymentRequestRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        receipt_repo: Arc<dyn ReceiptRepository>,
        activity_log_repo: Arc<dyn ActivityLogRepository>,
        scope_service: Arc<ScopeService>,
        signer: ReceiptSigner,
    ) -> Self {
        Self {
            pool,
            payment_request_repo,
            payment_repo,
            receipt_repo,
            activity_log_repo,
            scope_service,
            signer,
            or_numbers: Arc::new(generate_or_number),
        }
    }

    pub fn with_or_number_source(mut self, source: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.or_numbers = Arc::new(source);
        self
    }

    /// Records payment for a pending request. The request moves to PAID and
    /// the payment, its receipt and the audit entry are written in the same
    /// transaction.
    pub async fn process(&self, officer: &Officer, request_id: Uuid, input: ProcessPayment) -> Result<ProcessedPayment> {
        let request = self
            .payment_request_repo
            .find_by_request_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment request not found".to_string()))?;

        if !officer.is_active || !officer.capabilities.can_process_payments {
            return Err(AppError::Forbidden("You do not have permission to process payments".to_string()));
        }
        if !officer.is_super_officer && officer.organization_id != request.organization_id {
            return Err(AppError::Forbidden("This payment request belongs to another organization".to_string()));
        }

        let now = Utc::now();
        ensure_actionable(&request, now)?;

        if input.amount_received_cents <= 0 {
            return Err(AppError::Validation("Amount received must be greater than zero".to_string()));
        }
        if input.amount_received_cents < request.amount_cents {
            return Err(AppError::Validation(format!(
                "Amount received is less than the amount due ({} centavos)",
                request.amount_cents
            )));
        }
        if let Some(signature) = input.qr_signature.as_deref() {
            if !constant_time_eq(signature.trim(), &request.qr_signature) {
                return Err(AppError::Validation("QR signature does not match this payment request".to_string()));
            }
        }

        let mut tx = self.pool.begin().await?;

        let moved = self
            .payment_request_repo
            .transition(&mut *tx, request.id, PaymentRequestStatus::Paid, now)
            .await?;
        if moved == 0 {
            return Err(AppError::Conflict("Payment request is no longer pending".to_string()));
        }

        let notes = input
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let mut attempt = 1;
        let (payment_id, or_number) = loop {
            let payment = NewPayment {
                payment_request_id: request.id,
                student_id: request.student_id,
                organization_id: request.organization_id,
                fee_type_id: request.fee_type_id,
                amount_cents: request.amount_cents,
                amount_received_cents: input.amount_received_cents,
                payment_method: input.payment_method,
                or_number: (self.or_numbers)(),
                notes: notes.clone(),
                processed_by: officer.id,
            };

            match self.payment_repo.insert(&mut *tx, &payment).await {
                Ok(id) => break (id, payment.or_number),
                Err(e) if is_unique_violation_on(&e, "payments.or_number") && attempt < MAX_OR_NUMBER_ATTEMPTS => {
                    tracing::warn!("OR number collision on {}, drawing another", payment.or_number);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let signature = self.signer.sign(&or_number, request.amount_cents, payment_id)?;
        self.receipt_repo
            .insert(&mut *tx, payment_id, &or_number, &signature)
            .await?;

        self.activity_log_repo
            .append(
                &mut *tx,
                NewActivityLog::new(
                    officer.user_id,
                    actions::PAYMENT_PROCESSED,
                    format!(
                        "Officer {} processed payment OR#{} for request {}",
                        officer.full_name(),
                        or_number,
                        request.queue_number
                    ),
                )
                .with_payment(payment_id)
                .with_request(request.id),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Payment {} recorded for request {}", or_number, request.queue_number);

        let payment = self.get(payment_id).await?;
        let receipt = self
            .receipt_repo
            .find_by_payment(payment_id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created receipt".to_string()))?;

        Ok(ProcessedPayment {
            change_cents: payment.change_cents(),
            payment,
            receipt,
        })
    }

    /// Marks a completed payment void. The row is kept for the audit trail.
    pub async fn void(&self, officer: &Officer, payment_id: i64, reason: &str) -> Result<Payment> {
        if !officer.is_active || !officer.capabilities.can_void_payments {
            return Err(AppError::Forbidden("You do not have permission to void payments".to_string()));
        }

        let payment = self.get(payment_id).await?;

        if !officer.is_super_officer && officer.organization_id != payment.organization_id {
            return Err(AppError::Forbidden("This payment belongs to another organization".to_string()));
        }

        let reason = reason.trim();
        if reason.chars().count() < MIN_VOID_REASON_LEN {
            return Err(AppError::Validation(format!(
                "Void reason must be at least {} characters",
                MIN_VOID_REASON_LEN
            )));
        }

        if payment.is_void {
            return Err(AppError::Conflict(format!("Payment OR#{} is already void", payment.or_number)));
        }
        if payment.status != PaymentStatus::Completed {
            return Err(AppError::Conflict(format!(
                "Only completed payments can be voided (OR#{} is {})",
                payment.or_number,
                payment.status.as_str()
            )));
        }

        let mut tx = self.pool.begin().await?;

        let voided = self
            .payment_repo
            .mark_void(&mut *tx, payment.id, officer.id, reason, Utc::now())
            .await?;
        if voided == 0 {
            return Err(AppError::Conflict(format!("Payment OR#{} is already void", payment.or_number)));
        }

        self.activity_log_repo
            .append(
                &mut *tx,
                NewActivityLog::new(
                    officer.user_id,
                    actions::PAYMENT_VOIDED,
                    format!("Officer voided payment OR#{}. Reason: {}", payment.or_number, reason),
                )
                .with_payment(payment.id),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Payment {} voided by officer {}", payment.or_number, officer.id);

        self.get(payment.id).await
    }

    /// Public check of a printed receipt.
    pub async fn verify_receipt(&self, or_number: &str, signature: &str) -> Result<ReceiptVerification> {
        let Some(payment) = self.payment_repo.find_by_or_number(or_number).await? else {
            return Ok(ReceiptVerification {
                or_number: or_number.to_string(),
                valid: false,
                is_void: None,
            });
        };

        let valid = self
            .signer
            .verify(&payment.or_number, payment.amount_cents, payment.id, signature.trim())?;

        Ok(ReceiptVerification {
            or_number: payment.or_number,
            valid,
            is_void: valid.then_some(payment.is_void),
        })
    }

    pub async fn for_student(&self, student: &Student, payment_id: i64) -> Result<Payment> {
        let payment = self.get(payment_id).await?;
        if payment.student_id != student.id {
            return Err(not_found(payment_id));
        }
        Ok(payment)
    }

    pub async fn for_officer(&self, officer: &Officer, payment_id: i64) -> Result<Payment> {
        let payment = self.get(payment_id).await?;
        let scope = self.scope_service.scope_for_officer(officer).await?;
        if !scope.includes_organization(payment.organization_id) {
            return Err(not_found(payment_id));
        }
        Ok(payment)
    }

    pub async fn search(&self, officer: &Officer, search: &PaymentSearch) -> Result<Vec<Payment>> {
        let scope = self.scope_service.scope_for_officer(officer).await?;
        self.payment_repo.search(&scope, search).await
    }

    async fn get(&self, payment_id: i64) -> Result<Payment> {
        self.payment_repo
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| not_found(payment_id))
    }
}

fn not_found(payment_id: i64) -> AppError {
    AppError::NotFound(format!("Payment {} not found", payment_id))
}
