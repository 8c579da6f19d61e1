use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    domain::{
        actions, cents_to_pesos, normalize_year_levels, CreateFeeTypeRequest, FeeType,
        NewActivityLog, Officer, UpdateFeeTypeRequest,
    },
    error::{AppError, Result},
    repository::{ActivityLogRepository, FeeTypeRepository, OrganizationRepository},
    service::ScopeService,
};

const MAX_FEE_NAME_LEN: usize = 100;

/// Officers maintain the fees of the organizations they reach. Fees are
/// retired rather than deleted since requests and payments point at them.
pub struct FeeTypeService {
    pool: SqlitePool,
    fee_type_repo: Arc<dyn FeeTypeRepository>,
    organization_repo: Arc<dyn OrganizationRepository>,
    activity_log_repo: Arc<dyn ActivityLogRepository>,
    scope_service: Arc<ScopeService>,
}

impl FeeTypeService {
    pub fn new(
        pool: SqlitePool,
        fee_type_repo: Arc<dyn FeeTypeRepository>,
        organization_repo: Arc<dyn OrganizationRepository>,
        activity_log_repo: Arc<dyn ActivityLogRepository>,
        scope_service: Arc<ScopeService>,
    ) -> Self {
        Self {
            pool,
            fee_type_repo,
            organization_repo,
            activity_log_repo,
            scope_service,
        }
    }

    pub async fn create(&self, officer: &Officer, mut fee: CreateFeeTypeRequest) -> Result<FeeType> {
        let organization = self
            .organization_repo
            .find_by_id(fee.organization_id)
            .await?
            .filter(|org| org.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Organization {} not found", fee.organization_id)))?;

        self.ensure_manages(officer, organization.id).await?;

        fee.name = fee.name.trim().to_string();
        fee.applicable_year_levels = check_fee(&fee.name, fee.amount_cents, &fee.applicable_year_levels)?;

        let mut tx = self.pool.begin().await?;

        let id = self.fee_type_repo.create(&mut *tx, fee.clone()).await?;

        self.activity_log_repo
            .append(
                &mut *tx,
                NewActivityLog::new(
                    officer.user_id,
                    actions::FEE_TYPE_CREATED,
                    format!(
                        "{} created fee {} (PHP {:.2}) for {}",
                        officer.full_name(),
                        fee.name,
                        cents_to_pesos(fee.amount_cents),
                        organization.code
                    ),
                )
                .with_organization(organization.id),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Fee type {} created for {} by officer {}", id, organization.code, officer.id);

        self.get(id).await
    }

    /// Replaces the fee's details. Requests already issued keep the amount
    /// they were issued with.
    pub async fn update(&self, officer: &Officer, fee_type_id: i64, mut changes: UpdateFeeTypeRequest) -> Result<FeeType> {
        let fee = self.get(fee_type_id).await?;
        self.ensure_manages(officer, fee.organization_id).await?;

        if !fee.is_active {
            return Err(AppError::Conflict(format!("{} has been deactivated", fee.name)));
        }

        changes.name = changes.name.trim().to_string();
        changes.applicable_year_levels =
            check_fee(&changes.name, changes.amount_cents, &changes.applicable_year_levels)?;

        let mut tx = self.pool.begin().await?;

        let updated = self.fee_type_repo.update(&mut *tx, fee.id, &changes).await?;
        if updated == 0 {
            return Err(AppError::Conflict(format!("{} has been deactivated", fee.name)));
        }

        self.activity_log_repo
            .append(
                &mut *tx,
                NewActivityLog::new(
                    officer.user_id,
                    actions::FEE_TYPE_UPDATED,
                    format!(
                        "{} updated fee {} (PHP {:.2} -> PHP {:.2})",
                        officer.full_name(),
                        changes.name,
                        cents_to_pesos(fee.amount_cents),
                        cents_to_pesos(changes.amount_cents)
                    ),
                )
                .with_organization(fee.organization_id),
            )
            .await?;

        tx.commit().await?;

        self.get(fee.id).await
    }

    /// Stops the fee from being offered. Existing requests and payments are
    /// untouched.
    pub async fn deactivate(&self, officer: &Officer, fee_type_id: i64) -> Result<FeeType> {
        let fee = self.get(fee_type_id).await?;
        self.ensure_manages(officer, fee.organization_id).await?;

        let mut tx = self.pool.begin().await?;

        let deactivated = self.fee_type_repo.deactivate(&mut *tx, fee.id).await?;
        if deactivated == 0 {
            return Err(AppError::Conflict(format!("{} is already deactivated", fee.name)));
        }

        self.activity_log_repo
            .append(
                &mut *tx,
                NewActivityLog::new(
                    officer.user_id,
                    actions::FEE_TYPE_DEACTIVATED,
                    format!("{} deactivated fee {}", officer.full_name(), fee.name),
                )
                .with_organization(fee.organization_id),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Fee type {} deactivated by officer {}", fee.id, officer.id);

        self.get(fee.id).await
    }

    async fn get(&self, fee_type_id: i64) -> Result<FeeType> {
        self.fee_type_repo
            .find_by_id(fee_type_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fee type {} not found", fee_type_id)))
    }

    async fn ensure_manages(&self, officer: &Officer, organization_id: i64) -> Result<()> {
        if !officer.is_active {
            return Err(AppError::Forbidden("Only active officers can manage fees".to_string()));
        }

        let scope = self.scope_service.scope_for_officer(officer).await?;
        if !scope.includes_organization(organization_id) {
            return Err(AppError::Forbidden("This fee belongs to an organization outside your scope".to_string()));
        }

        Ok(())
    }
}

/// Validates a fee's details and returns the canonical year level list.
fn check_fee(name: &str, amount_cents: i64, applicable_year_levels: &str) -> Result<String> {
    if name.is_empty() || name.chars().count() > MAX_FEE_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Fee name must be 1 to {} characters",
            MAX_FEE_NAME_LEN
        )));
    }
    if amount_cents <= 0 {
        return Err(AppError::Validation("Fee amount must be greater than zero".to_string()));
    }

    normalize_year_levels(applicable_year_levels).ok_or_else(|| {
        AppError::Validation("Applicable year levels must be ALL or a list such as 1,2".to_string())
    })
}
