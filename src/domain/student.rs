use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_YEAR_LEVEL: i64 = 1;
pub const MAX_YEAR_LEVEL: i64 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Semester {
    #[serde(rename = "1st Semester")]
    First,
    #[serde(rename = "2nd Semester")]
    Second,
    #[serde(rename = "Summer")]
    Summer,
}

impl Semester {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::First => "1st Semester",
            Semester::Second => "2nd Semester",
            Semester::Summer => "Summer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1st Semester" => Some(Semester::First),
            "2nd Semester" => Some(Semester::Second),
            "Summer" => Some(Semester::Summer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub user_id: i64,
    pub student_id_number: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub course_id: i64,
    pub year_level: i64,
    pub email: String,
    pub phone_number: String,
    pub academic_year: String,
    pub semester: Semester,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    /// Full name with the middle initial, e.g. `Juan D. Cruz`.
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().and_then(|m| m.chars().next()) {
            Some(initial) => format!("{} {}. {}", self.first_name, initial, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateStudentRequest {
    pub user_id: i64,
    pub student_id_number: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub course_id: i64,
    pub year_level: i64,
    pub email: String,
    pub phone_number: String,
    pub academic_year: String,
    pub semester: Semester,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateStudentRequest {
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub course_id: Option<i64>,
    pub year_level: Option<i64>,
}
