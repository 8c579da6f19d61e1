use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentRequestStatus {
    Pending,
    Paid,
    Cancelled,
    Expired,
}

impl PaymentRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentRequestStatus::Pending => "PENDING",
            PaymentRequestStatus::Paid => "PAID",
            PaymentRequestStatus::Cancelled => "CANCELLED",
            PaymentRequestStatus::Expired => "EXPIRED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentRequestStatus::Pending),
            "PAID" => Some(PaymentRequestStatus::Paid),
            "CANCELLED" => Some(PaymentRequestStatus::Cancelled),
            "EXPIRED" => Some(PaymentRequestStatus::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentRequestStatus::Pending)
    }

    /// The only legal moves are out of PENDING.
    pub fn can_transition_to(&self, next: PaymentRequestStatus) -> bool {
        matches!(self, PaymentRequestStatus::Pending) && next.is_terminal()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub id: i64,
    pub request_id: Uuid,
    pub student_id: i64,
    pub organization_id: i64,
    pub fee_type_id: i64,
    pub amount_cents: i64,
    pub queue_number: String,
    pub qr_signature: String,
    pub qr_image: Option<String>,
    pub status: PaymentRequestStatus,
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == PaymentRequestStatus::Pending && now > self.expires_at
    }

    /// Status as seen by readers: a pending request past its expiry reads
    /// as EXPIRED even if no sweep has persisted that yet.
    pub fn effective_status(&self, now: DateTime<Utc>) -> PaymentRequestStatus {
        if self.is_expired(now) {
            PaymentRequestStatus::Expired
        } else {
            self.status
        }
    }

    /// Pending and not yet expired.
    pub fn is_actionable(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == PaymentRequestStatus::Pending
    }
}

#[derive(Debug, Clone)]
pub struct NewPaymentRequest {
    pub request_id: Uuid,
    pub student_id: i64,
    pub organization_id: i64,
    pub fee_type_id: i64,
    pub amount_cents: i64,
    pub queue_number: String,
    pub qr_signature: String,
    pub qr_image: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(status: PaymentRequestStatus, expires_at: DateTime<Utc>) -> PaymentRequest {
        PaymentRequest {
            id: 1,
            request_id: Uuid::new_v4(),
            student_id: 1,
            organization_id: 1,
            fee_type_id: 1,
            amount_cents: 50_000,
            queue_number: "CSSG-001".to_string(),
            qr_signature: "sig".to_string(),
            qr_image: None,
            status,
            expires_at,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_transitions_only_leave_pending() {
        use PaymentRequestStatus::*;

        for next in [Paid, Cancelled, Expired] {
            assert!(Pending.can_transition_to(next));
        }
        assert!(!Pending.can_transition_to(Pending));

        for terminal in [Paid, Cancelled, Expired] {
            assert!(terminal.is_terminal());
            for next in [Pending, Paid, Cancelled, Expired] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_expiry_is_derived_on_read() {
        let now = Utc::now();
        let stale = request(PaymentRequestStatus::Pending, now - Duration::minutes(1));
        assert!(stale.is_expired(now));
        assert_eq!(stale.effective_status(now), PaymentRequestStatus::Expired);
        assert!(!stale.is_actionable(now));

        let fresh = request(PaymentRequestStatus::Pending, now + Duration::hours(24));
        assert_eq!(fresh.effective_status(now), PaymentRequestStatus::Pending);

        // Terminal rows keep their own status regardless of the clock
        let paid = request(PaymentRequestStatus::Paid, now - Duration::days(3));
        assert!(!paid.is_expired(now));
        assert_eq!(paid.effective_status(now), PaymentRequestStatus::Paid);
    }
}
