use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum length of a trimmed void reason.
pub const MIN_VOID_REASON_LEN: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub payment_request_id: i64,
    pub student_id: i64,
    pub organization_id: i64,
    pub fee_type_id: i64,
    pub amount_cents: i64,
    pub amount_received_cents: i64,
    pub payment_method: PaymentMethod,
    pub or_number: String,
    pub status: PaymentStatus,
    pub notes: Option<String>,
    pub processed_by: i64,
    pub is_void: bool,
    pub void_reason: Option<String>,
    pub voided_by: Option<i64>,
    pub voided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn change_cents(&self) -> i64 {
        (self.amount_received_cents - self.amount_cents).max(0)
    }

    /// Completed and not voided: the payment counts toward collections.
    pub fn is_collected(&self) -> bool {
        self.status == PaymentStatus::Completed && !self.is_void
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "COMPLETED" => Some(PaymentStatus::Completed),
            "FAILED" => Some(PaymentStatus::Failed),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Gcash,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Gcash => "GCASH",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CASH" => Some(PaymentMethod::Cash),
            "GCASH" => Some(PaymentMethod::Gcash),
            "BANK_TRANSFER" => Some(PaymentMethod::BankTransfer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payment_request_id: i64,
    pub student_id: i64,
    pub organization_id: i64,
    pub fee_type_id: i64,
    pub amount_cents: i64,
    pub amount_received_cents: i64,
    pub payment_method: PaymentMethod,
    pub or_number: String,
    pub notes: Option<String>,
    pub processed_by: i64,
}

/// Filters for the officer payment search.
#[derive(Debug, Clone, Default)]
pub struct PaymentSearch {
    pub query: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub date_to: Option<DateTime<Utc>>,
}

/// Converts a peso amount such as `500.00` to centavos.
pub fn pesos_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn cents_to_pesos(cents: i64) -> f64 {
    cents as f64 / 100.0
}
