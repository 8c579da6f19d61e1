pub mod fee_type_service;
pub mod scope_service;
pub mod payment_request_service;
pub mod payment_service;
pub mod promotion_service;
pub mod profile_service;
pub mod report_service;

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use sqlx::SqlitePool;

use crate::auth::AuthService;
use crate::config::Settings;
use crate::payments::ReceiptSigner;
use crate::repository::*;

pub use fee_type_service::FeeTypeService;
pub use payment_request_service::PaymentRequestService;
pub use payment_service::{
    OrNumberSource, PaymentService, ProcessPayment, ProcessedPayment, ReceiptVerification,
};
pub use profile_service::{ProfileService, ProfileUpdate, Registration};
pub use promotion_service::{PromotionRequest, PromotionService};
pub use report_service::{CollectionSummary, ReportService};
pub use scope_service::ScopeService;

pub struct ServiceContext {
    pub user_repo: Arc<dyn UserRepository>,
    pub academic_repo: Arc<dyn AcademicRepository>,
    pub organization_repo: Arc<dyn OrganizationRepository>,
    pub student_repo: Arc<dyn StudentRepository>,
    pub officer_repo: Arc<dyn OfficerRepository>,
    pub fee_type_repo: Arc<dyn FeeTypeRepository>,
    pub payment_request_repo: Arc<dyn PaymentRequestRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub receipt_repo: Arc<dyn ReceiptRepository>,
    pub activity_log_repo: Arc<dyn ActivityLogRepository>,
    pub auth_service: Arc<AuthService>,
    pub scope_service: Arc<ScopeService>,
    pub fee_type_service: Arc<FeeTypeService>,
    pub payment_request_service: Arc<PaymentRequestService>,
    pub payment_service: Arc<PaymentService>,
    pub promotion_service: Arc<PromotionService>,
    pub profile_service: Arc<ProfileService>,
    pub report_service: Arc<ReportService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(db_pool: SqlitePool, settings: &Settings) -> Self {
        let user_repo: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(db_pool.clone()));
        let academic_repo: Arc<dyn AcademicRepository> = Arc::new(SqliteAcademicRepository::new(db_pool.clone()));
        let organization_repo: Arc<dyn OrganizationRepository> = Arc::new(SqliteOrganizationRepository::new(db_pool.clone()));
        let student_repo: Arc<dyn StudentRepository> = Arc::new(SqliteStudentRepository::new(db_pool.clone()));
        let officer_repo: Arc<dyn OfficerRepository> = Arc::new(SqliteOfficerRepository::new(db_pool.clone()));
        let fee_type_repo: Arc<dyn FeeTypeRepository> = Arc::new(SqliteFeeTypeRepository::new(db_pool.clone()));
        let payment_request_repo: Arc<dyn PaymentRequestRepository> = Arc::new(SqlitePaymentRequestRepository::new(db_pool.clone()));
        let payment_repo: Arc<dyn PaymentRepository> = Arc::new(SqlitePaymentRepository::new(db_pool.clone()));
        let receipt_repo: Arc<dyn ReceiptRepository> = Arc::new(SqliteReceiptRepository::new(db_pool.clone()));
        let activity_log_repo: Arc<dyn ActivityLogRepository> = Arc::new(SqliteActivityLogRepository::new(db_pool.clone()));

        let auth_service = Arc::new(AuthService::new(
            db_pool.clone(),
            settings.auth.session_duration_hours,
        ));

        let scope_service = Arc::new(ScopeService::new(
            organization_repo.clone(),
            academic_repo.clone(),
        ));

        let fee_type_service = Arc::new(FeeTypeService::new(
            db_pool.clone(),
            fee_type_repo.clone(),
            organization_repo.clone(),
            activity_log_repo.clone(),
            scope_service.clone(),
        ));

        let payment_request_service = Arc::new(PaymentRequestService::new(
            db_pool.clone(),
            fee_type_repo.clone(),
            payment_request_repo.clone(),
            activity_log_repo.clone(),
            scope_service.clone(),
            settings.payments.request_ttl_hours,
            settings.payments.qr_size,
        ));

        let payment_service = Arc::new(PaymentService::new(
            db_pool.clone(),
            payment_request_repo.clone(),
            payment_repo.clone(),
            receipt_repo.clone(),
            activity_log_repo.clone(),
            scope_service.clone(),
            ReceiptSigner::new(settings.payments.receipt_signing_secret.clone()),
        ));

        let promotion_service = Arc::new(PromotionService::new(
            db_pool.clone(),
            organization_repo.clone(),
            student_repo.clone(),
            officer_repo.clone(),
            activity_log_repo.clone(),
            scope_service.clone(),
        ));

        let profile_service = Arc::new(ProfileService::new(
            db_pool.clone(),
            user_repo.clone(),
            academic_repo.clone(),
            student_repo.clone(),
            activity_log_repo.clone(),
            settings.auth.allowed_email_domain.clone(),
        ));

        let report_service = Arc::new(ReportService::new(
            organization_repo.clone(),
            payment_repo.clone(),
            activity_log_repo.clone(),
            scope_service.clone(),
        ));

        Self {
            user_repo,
            academic_repo,
            organization_repo,
            student_repo,
            officer_repo,
            fee_type_repo,
            payment_request_repo,
            payment_repo,
            receipt_repo,
            activity_log_repo,
            auth_service,
            scope_service,
            fee_type_service,
            payment_request_service,
            payment_service,
            promotion_service,
            profile_service,
            report_service,
            db_pool,
        }
    }
}

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(now.date_naive().and_time(NaiveTime::MIN), Utc)
}
