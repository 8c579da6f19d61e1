use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Officer {
    pub id: i64,
    pub user_id: i64,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub organization_id: i64,
    pub role: String,
    pub capabilities: OfficerCapabilities,
    pub is_super_officer: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Officer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct OfficerCapabilities {
    pub can_process_payments: bool,
    pub can_void_payments: bool,
    pub can_generate_reports: bool,
    pub can_promote_officers: bool,
}

impl OfficerCapabilities {
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct CreateOfficerRequest {
    pub user_id: i64,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub organization_id: i64,
    pub role: String,
    pub capabilities: OfficerCapabilities,
    pub is_super_officer: bool,
}
