use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::domain::*;
use crate::error::{AppError, Result};

pub mod user_repository;
pub mod academic_repository;
pub mod organization_repository;
pub mod student_repository;
pub mod officer_repository;
pub mod fee_type_repository;
pub mod payment_request_repository;
pub mod payment_repository;
pub mod receipt_repository;
pub mod activity_log_repository;

pub use user_repository::SqliteUserRepository;
pub use academic_repository::SqliteAcademicRepository;
pub use organization_repository::SqliteOrganizationRepository;
pub use student_repository::SqliteStudentRepository;
pub use officer_repository::SqliteOfficerRepository;
pub use fee_type_repository::SqliteFeeTypeRepository;
pub use payment_request_repository::SqlitePaymentRequestRepository;
pub use payment_repository::SqlitePaymentRepository;
pub use receipt_repository::SqliteReceiptRepository;
pub use activity_log_repository::SqliteActivityLogRepository;

// Writes that take a `&mut SqliteConnection` are meant to run inside a
// transaction opened by the service layer. Everything else reads through the
// repository's own pool.

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, conn: &mut SqliteConnection, user: CreateUserRequest) -> Result<i64>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn get_password_hash(&self, email: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait AcademicRepository: Send + Sync {
    async fn create_college(&self, code: &str, name: &str) -> Result<College>;
    async fn create_course(&self, code: &str, name: &str, program_type: &str, college_id: i64) -> Result<Course>;
    async fn find_course_by_id(&self, id: i64) -> Result<Option<Course>>;
    async fn find_course_by_code(&self, code: &str) -> Result<Option<Course>>;
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn create(&self, org: CreateOrganizationRequest) -> Result<Organization>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Organization>>;
    async fn find_by_code(&self, code: &str) -> Result<Option<Organization>>;
    async fn list_all(&self) -> Result<Vec<Organization>>;
    async fn list_active(&self) -> Result<Vec<Organization>>;
    async fn stats(&self, organization_id: i64, day_start: DateTime<Utc>) -> Result<OrganizationStats>;
}

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn create(&self, conn: &mut SqliteConnection, student: CreateStudentRequest) -> Result<i64>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Student>>;
    async fn find_by_user(&self, user_id: i64) -> Result<Option<Student>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Student>>;
    async fn list_in_scope(&self, scope: &AccessScope) -> Result<Vec<Student>>;
    async fn update(&self, conn: &mut SqliteConnection, id: i64, update: UpdateStudentRequest) -> Result<()>;
}

#[async_trait]
pub trait OfficerRepository: Send + Sync {
    async fn create(&self, conn: &mut SqliteConnection, officer: CreateOfficerRequest) -> Result<i64>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Officer>>;
    /// Any officer record for the user, active or not.
    async fn find_by_user(&self, user_id: i64) -> Result<Option<Officer>>;
    async fn list_in_scope(&self, scope: &AccessScope) -> Result<Vec<Officer>>;
    async fn reactivate(&self, conn: &mut SqliteConnection, id: i64, officer: CreateOfficerRequest) -> Result<u64>;
    async fn deactivate(&self, conn: &mut SqliteConnection, id: i64) -> Result<u64>;
}

#[async_trait]
pub trait FeeTypeRepository: Send + Sync {
    async fn create(&self, conn: &mut SqliteConnection, fee: CreateFeeTypeRequest) -> Result<i64>;
    /// Guarded on `is_active`. Returns rows affected (0 or 1).
    async fn update(&self, conn: &mut SqliteConnection, id: i64, fee: &UpdateFeeTypeRequest) -> Result<u64>;
    /// Guarded on `is_active`. Returns rows affected (0 or 1).
    async fn deactivate(&self, conn: &mut SqliteConnection, id: i64) -> Result<u64>;
    async fn find_by_id(&self, id: i64) -> Result<Option<FeeType>>;
    async fn list_active_by_organization(&self, organization_id: i64) -> Result<Vec<FeeType>>;
    async fn list_active_for_organizations(&self, organization_ids: &[i64]) -> Result<Vec<FeeType>>;
}

#[async_trait]
pub trait PaymentRequestRepository: Send + Sync {
    /// Raw sqlx error so callers can retry on a unique violation.
    async fn insert(&self, conn: &mut SqliteConnection, request: &NewPaymentRequest) -> std::result::Result<i64, sqlx::Error>;
    async fn find_by_id(&self, id: i64) -> Result<Option<PaymentRequest>>;
    async fn find_by_request_id(&self, request_id: Uuid) -> Result<Option<PaymentRequest>>;
    async fn list_by_student(&self, student_id: i64) -> Result<Vec<PaymentRequest>>;
    /// Every queue number ever issued to the student by the organization,
    /// whatever the request's status.
    async fn queue_numbers_for(&self, student_id: i64, organization_id: i64) -> Result<Vec<String>>;
    async fn list_pending_by_student(&self, student_id: i64, now: DateTime<Utc>) -> Result<Vec<PaymentRequest>>;
    async fn list_pending_by_organization(&self, organization_id: i64, now: DateTime<Utc>) -> Result<Vec<PaymentRequest>>;
    /// Guarded PENDING -> `to` move. Returns rows affected (0 or 1).
    async fn transition(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        to: PaymentRequestStatus,
        now: DateTime<Utc>,
    ) -> Result<u64>;
    /// Persists EXPIRED on every pending row past its expiry.
    async fn expire_stale(&self, conn: &mut SqliteConnection, now: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Raw sqlx error so callers can retry on an OR number collision.
    async fn insert(&self, conn: &mut SqliteConnection, payment: &NewPayment) -> std::result::Result<i64, sqlx::Error>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Payment>>;
    async fn find_by_or_number(&self, or_number: &str) -> Result<Option<Payment>>;
    async fn list_by_student(&self, student_id: i64) -> Result<Vec<Payment>>;
    async fn list_collected_by_student(&self, student_id: i64, limit: i64) -> Result<Vec<Payment>>;
    async fn list_collected_by_organization(
        &self,
        organization_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Payment>>;
    async fn search(&self, scope: &AccessScope, search: &PaymentSearch) -> Result<Vec<Payment>>;
    /// Guarded void. Returns rows affected (0 or 1).
    async fn mark_void(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        voided_by: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<u64>;
}

#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    async fn insert(
        &self,
        conn: &mut SqliteConnection,
        payment_id: i64,
        or_number: &str,
        verification_signature: &str,
    ) -> Result<i64>;
    async fn find_by_payment(&self, payment_id: i64) -> Result<Option<Receipt>>;
}

#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    async fn append(&self, conn: &mut SqliteConnection, entry: NewActivityLog) -> Result<i64>;
    /// Entries touching the scope's organizations, plus the actor's own.
    async fn list_in_scope(&self, scope: &AccessScope, actor_user_id: i64, limit: i64) -> Result<Vec<ActivityLog>>;
    async fn list_for_payment(&self, payment_id: i64) -> Result<Vec<ActivityLog>>;
    async fn list_for_request(&self, payment_request_id: i64) -> Result<Vec<ActivityLog>>;
}

pub(crate) fn to_utc(dt: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(dt, Utc)
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

/// Appends `column IN (?, ?, ...)` binding each id.
pub(crate) fn push_id_list<'a>(qb: &mut QueryBuilder<'a, Sqlite>, column: &str, ids: impl IntoIterator<Item = i64>) {
    qb.push(column);
    qb.push(" IN (");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");
}
