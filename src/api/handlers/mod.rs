pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod fees;
pub mod officers;
pub mod organizations;
pub mod payments;
pub mod profile;
pub mod receipts;
pub mod reports;
pub mod root;
pub mod students;
pub mod types;
