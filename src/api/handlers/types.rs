//! Response shapes shared by several handlers.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::{
        cents_to_pesos, FeeType, Officer, OfficerCapabilities, Payment, PaymentRequest,
        PaymentRequestStatus, Student,
    },
    error::{AppError, Result},
};

#[derive(Debug, Serialize)]
pub struct PaymentRequestDto {
    pub request_id: Uuid,
    pub queue_number: String,
    pub organization_id: i64,
    pub fee_type_id: i64,
    pub amount: f64,
    /// Reads as EXPIRED once past `expires_at`, even before a sweep.
    pub status: PaymentRequestStatus,
    pub qr_signature: String,
    pub qr_image: Option<String>,
    pub expires_at: String,
    pub paid_at: Option<String>,
    pub created_at: String,
}

impl PaymentRequestDto {
    pub fn new(request: PaymentRequest, now: DateTime<Utc>) -> Self {
        Self {
            status: request.effective_status(now),
            request_id: request.request_id,
            queue_number: request.queue_number,
            organization_id: request.organization_id,
            fee_type_id: request.fee_type_id,
            amount: cents_to_pesos(request.amount_cents),
            qr_signature: request.qr_signature,
            qr_image: request.qr_image,
            expires_at: request.expires_at.to_rfc3339(),
            paid_at: request.paid_at.map(|dt| dt.to_rfc3339()),
            created_at: request.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentDto {
    pub id: i64,
    pub or_number: String,
    pub student_id: i64,
    pub organization_id: i64,
    pub fee_type_id: i64,
    pub amount: f64,
    pub amount_received: f64,
    pub change: f64,
    pub payment_method: String,
    pub status: String,
    pub notes: Option<String>,
    pub processed_by: i64,
    pub is_void: bool,
    pub void_reason: Option<String>,
    pub voided_at: Option<String>,
    pub created_at: String,
}

impl From<Payment> for PaymentDto {
    fn from(payment: Payment) -> Self {
        Self {
            change: cents_to_pesos(payment.change_cents()),
            id: payment.id,
            or_number: payment.or_number,
            student_id: payment.student_id,
            organization_id: payment.organization_id,
            fee_type_id: payment.fee_type_id,
            amount: cents_to_pesos(payment.amount_cents),
            amount_received: cents_to_pesos(payment.amount_received_cents),
            payment_method: payment.payment_method.as_str().to_string(),
            status: payment.status.as_str().to_string(),
            notes: payment.notes,
            processed_by: payment.processed_by,
            is_void: payment.is_void,
            void_reason: payment.void_reason,
            voided_at: payment.voided_at.map(|dt| dt.to_rfc3339()),
            created_at: payment.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeeTypeDto {
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    pub amount: f64,
    pub description: String,
    pub academic_year: String,
    pub semester: String,
    pub applicable_year_levels: String,
    pub deadline: Option<String>,
    pub is_overdue: bool,
}

impl FeeTypeDto {
    pub fn new(fee: FeeType, now: DateTime<Utc>) -> Self {
        Self {
            is_overdue: fee.is_overdue(now),
            id: fee.id,
            organization_id: fee.organization_id,
            name: fee.name,
            amount: cents_to_pesos(fee.amount_cents),
            description: fee.description,
            academic_year: fee.academic_year,
            semester: fee.semester.as_str().to_string(),
            applicable_year_levels: fee.applicable_year_levels,
            deadline: fee.deadline.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StudentDto {
    pub id: i64,
    pub student_id_number: String,
    pub full_name: String,
    pub course_id: i64,
    pub year_level: i64,
    pub email: String,
    pub phone_number: String,
    pub academic_year: String,
    pub semester: String,
}

impl From<Student> for StudentDto {
    fn from(student: Student) -> Self {
        Self {
            full_name: student.full_name(),
            id: student.id,
            student_id_number: student.student_id_number,
            course_id: student.course_id,
            year_level: student.year_level,
            email: student.email,
            phone_number: student.phone_number,
            academic_year: student.academic_year,
            semester: student.semester.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OfficerDto {
    pub id: i64,
    pub employee_id: String,
    pub full_name: String,
    pub email: String,
    pub organization_id: i64,
    pub role: String,
    pub capabilities: OfficerCapabilities,
    pub is_super_officer: bool,
    pub is_active: bool,
}

impl From<Officer> for OfficerDto {
    fn from(officer: Officer) -> Self {
        Self {
            full_name: officer.full_name(),
            id: officer.id,
            employee_id: officer.employee_id,
            email: officer.email,
            organization_id: officer.organization_id,
            role: officer.role,
            capabilities: officer.capabilities,
            is_super_officer: officer.is_super_officer,
            is_active: officer.is_active,
        }
    }
}

/// Parses an optional `YYYY-MM-DD` query value into midnight UTC. Blank
/// values count as absent.
pub fn parse_day(value: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("{} must be a date in YYYY-MM-DD format", field)))?;

    Ok(Some(DateTime::from_naive_utc_and_offset(date.and_time(NaiveTime::MIN), Utc)))
}
