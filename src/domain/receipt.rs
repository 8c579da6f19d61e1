use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub payment_id: i64,
    pub or_number: String,
    pub email_sent: bool,
    pub sms_sent: bool,
    pub verification_signature: String,
    pub created_at: DateTime<Utc>,
}
