use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Semester;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeType {
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    pub amount_cents: i64,
    pub description: String,
    pub academic_year: String,
    pub semester: Semester,
    /// `ALL`, or a comma separated list of year levels such as `1,2`.
    pub applicable_year_levels: String,
    pub deadline: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeeType {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map(|deadline| now > deadline).unwrap_or(false)
    }

    pub fn applies_to_year_level(&self, year_level: i64) -> bool {
        let levels = self.applicable_year_levels.trim();
        if levels.is_empty() || levels.eq_ignore_ascii_case("ALL") {
            return true;
        }

        levels
            .split(',')
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .any(|level| level == year_level)
    }
}

#[derive(Debug, Clone)]
pub struct CreateFeeTypeRequest {
    pub organization_id: i64,
    pub name: String,
    pub amount_cents: i64,
    pub description: String,
    pub academic_year: String,
    pub semester: Semester,
    pub applicable_year_levels: String,
    pub deadline: Option<DateTime<Utc>>,
}

/// Replacement values for an existing fee. The owning organization never
/// changes.
#[derive(Debug, Clone)]
pub struct UpdateFeeTypeRequest {
    pub name: String,
    pub amount_cents: i64,
    pub description: String,
    pub academic_year: String,
    pub semester: Semester,
    pub applicable_year_levels: String,
    pub deadline: Option<DateTime<Utc>>,
}

/// Canonical form of an applicable year level list: `ALL`, or ascending
/// distinct levels joined by commas. `None` when a part is not a year
/// level between 1 and 5.
pub fn normalize_year_levels(levels: &str) -> Option<String> {
    let levels = levels.trim();
    if levels.is_empty() || levels.eq_ignore_ascii_case("ALL") {
        return Some("ALL".to_string());
    }

    let mut parsed = Vec::new();
    for part in levels.split(',') {
        let level = part.trim().parse::<i64>().ok().filter(|l| (1..=5).contains(l))?;
        if !parsed.contains(&level) {
            parsed.push(level);
        }
    }
    parsed.sort_unstable();

    Some(
        parsed
            .iter()
            .map(|level| level.to_string())
            .collect::<Vec<_>>()
            .join(","),
    )
}
