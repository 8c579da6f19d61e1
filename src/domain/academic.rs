use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct College {
    pub id: i64,
    pub code: String,
    pub name: String,
}

/// A degree program. `program_type` is the tag organizations match against
/// through their program affiliation (e.g. `COMPUTER_SCIENCE`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub program_type: String,
    pub college_id: i64,
}
