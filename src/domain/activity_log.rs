use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action tags written to the audit trail.
pub mod actions {
    pub const QR_GENERATED: &str = "qr_generated";
    pub const PAYMENT_PROCESSED: &str = "payment_processed";
    pub const PAYMENT_CANCELLED: &str = "payment_cancelled";
    pub const PAYMENT_VOIDED: &str = "payment_voided";
    pub const PROFILE_UPDATED: &str = "profile_updated";
    pub const OFFICER_PROMOTED: &str = "officer_promoted";
    pub const OFFICER_DEMOTED: &str = "officer_demoted";
    pub const STUDENT_REGISTERED: &str = "student_registered";
    pub const REQUESTS_EXPIRED: &str = "requests_expired";
    pub const FEE_TYPE_CREATED: &str = "fee_type_created";
    pub const FEE_TYPE_UPDATED: &str = "fee_type_updated";
    pub const FEE_TYPE_DEACTIVATED: &str = "fee_type_deactivated";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub description: String,
    pub payment_id: Option<i64>,
    pub payment_request_id: Option<i64>,
    pub organization_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivityLog {
    pub user_id: i64,
    pub action: &'static str,
    pub description: String,
    pub payment_id: Option<i64>,
    pub payment_request_id: Option<i64>,
    pub organization_id: Option<i64>,
}

impl NewActivityLog {
    pub fn new(user_id: i64, action: &'static str, description: impl Into<String>) -> Self {
        Self {
            user_id,
            action,
            description: description.into(),
            payment_id: None,
            payment_request_id: None,
            organization_id: None,
        }
    }

    pub fn with_payment(mut self, payment_id: i64) -> Self {
        self.payment_id = Some(payment_id);
        self
    }

    pub fn with_request(mut self, payment_request_id: i64) -> Self {
        self.payment_request_id = Some(payment_request_id);
        self
    }

    pub fn with_organization(mut self, organization_id: i64) -> Self {
        self.organization_id = Some(organization_id);
        self
    }
}
