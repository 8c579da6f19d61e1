use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Affiliation tag that gives an organization umbrella scope over its
/// parent's whole subtree.
pub const ALL_PROGRAMS: &str = "ALL";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HierarchyLevel {
    College,
    Program,
}

impl HierarchyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HierarchyLevel::College => "COLLEGE",
            HierarchyLevel::Program => "PROGRAM",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "COLLEGE" => Some(HierarchyLevel::College),
            "PROGRAM" => Some(HierarchyLevel::Program),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub hierarchy_level: HierarchyLevel,
    pub parent_id: Option<i64>,
    pub program_affiliation: Option<String>,
    /// The college ("department") the organization belongs to, if any.
    pub college_id: Option<i64>,
    pub fee_tier: String,
    pub description: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub booth_location: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn has_umbrella_scope(&self) -> bool {
        self.program_affiliation
            .as_deref()
            .map(|a| a.eq_ignore_ascii_case(ALL_PROGRAMS))
            .unwrap_or(false)
    }

    /// The specific program tag this organization serves, ignoring `ALL`
    /// and blank values.
    pub fn program(&self) -> Option<&str> {
        match self.program_affiliation.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() && !p.eq_ignore_ascii_case(ALL_PROGRAMS) => Some(p),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub code: String,
    pub hierarchy_level: HierarchyLevel,
    pub parent_id: Option<i64>,
    pub program_affiliation: Option<String>,
    pub college_id: Option<i64>,
    pub fee_tier: String,
    pub description: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub booth_location: String,
}

/// Figures shown on the officer dashboard and in collection reports.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct OrganizationStats {
    pub organization_id: i64,
    pub active_fees: i64,
    pub total_collected_cents: i64,
    pub collected_today_cents: i64,
    pub pending_requests: i64,
}
