use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    domain::{
        actions, scope::can_promote, CreateOfficerRequest, NewActivityLog, Officer,
        OfficerCapabilities,
    },
    error::{AppError, Result},
    repository::{ActivityLogRepository, OfficerRepository, OrganizationRepository, StudentRepository},
    service::ScopeService,
};

#[derive(Debug, Clone)]
pub struct PromotionRequest {
    pub student_id: i64,
    pub organization_id: i64,
    pub role: String,
    pub capabilities: OfficerCapabilities,
    pub is_super_officer: bool,
}

/// Officers with promotion authority turn students into officers of the
/// organizations they reach, and take that status away again.
pub struct PromotionService {
    pool: SqlitePool,
    organization_repo: Arc<dyn OrganizationRepository>,
    student_repo: Arc<dyn StudentRepository>,
    officer_repo: Arc<dyn OfficerRepository>,
    activity_log_repo: Arc<dyn ActivityLogRepository>,
    scope_service: Arc<ScopeService>,
}

impl PromotionService {
    pub fn new(
        pool: SqlitePool,
        organization_repo: Arc<dyn OrganizationRepository>,
        student_repo: Arc<dyn StudentRepository>,
        officer_repo: Arc<dyn OfficerRepository>,
        activity_log_repo: Arc<dyn ActivityLogRepository>,
        scope_service: Arc<ScopeService>,
    ) -> Self {
        Self {
            pool,
            organization_repo,
            student_repo,
            officer_repo,
            activity_log_repo,
            scope_service,
        }
    }

    pub async fn promote(&self, actor: &Officer, request: PromotionRequest) -> Result<Officer> {
        let organization = self
            .organization_repo
            .find_by_id(request.organization_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Organization {} not found", request.organization_id)))?;

        let scope = self.scope_service.scope_for_officer(actor).await?;
        if !can_promote(actor, &scope, organization.id) {
            return Err(AppError::Forbidden(format!(
                "You cannot promote officers into {}",
                organization.code
            )));
        }

        let student = self
            .student_repo
            .find_by_id(request.student_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", request.student_id)))?;

        if !self.scope_service.can_view_student(actor, &student).await? {
            return Err(AppError::Forbidden("This student is outside your organization's scope".to_string()));
        }

        if !actor.is_super_officer
            && (request.capabilities.can_promote_officers || request.is_super_officer)
        {
            return Err(AppError::Forbidden(
                "Only administrators can grant promotion or super officer rights".to_string(),
            ));
        }

        let existing = self.officer_repo.find_by_user(student.user_id).await?;
        if existing.as_ref().is_some_and(|officer| officer.is_active) {
            return Err(AppError::Conflict(format!("{} is already an officer", student.full_name())));
        }

        let role = match request.role.trim() {
            "" => "Officer".to_string(),
            role => role.to_string(),
        };

        let officer = CreateOfficerRequest {
            user_id: student.user_id,
            employee_id: format!("{}-{}", organization.code, student.student_id_number),
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            email: student.email.clone(),
            phone_number: student.phone_number.clone(),
            organization_id: organization.id,
            role: role.clone(),
            capabilities: request.capabilities,
            is_super_officer: request.is_super_officer,
        };

        let mut tx = self.pool.begin().await?;

        let officer_id = match existing {
            Some(previous) => {
                let reactivated = self.officer_repo.reactivate(&mut *tx, previous.id, officer).await?;
                if reactivated == 0 {
                    return Err(AppError::Conflict(format!("{} is already an officer", student.full_name())));
                }
                previous.id
            }
            None => self.officer_repo.create(&mut *tx, officer).await?,
        };

        self.activity_log_repo
            .append(
                &mut *tx,
                NewActivityLog::new(
                    actor.user_id,
                    actions::OFFICER_PROMOTED,
                    format!(
                        "{} promoted {} to {} of {}",
                        actor.full_name(),
                        student.full_name(),
                        role,
                        organization.code
                    ),
                ),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Student {} promoted to officer of {}", student.id, organization.code);

        self.get(officer_id).await
    }

    /// Deactivates an officer and clears their capabilities. The record is
    /// kept because payments reference it.
    pub async fn demote(&self, actor: &Officer, officer_id: i64) -> Result<Officer> {
        let target = self.get(officer_id).await?;

        if target.id == actor.id {
            return Err(AppError::Forbidden("You cannot demote yourself".to_string()));
        }

        let scope = self.scope_service.scope_for_officer(actor).await?;
        if !can_promote(actor, &scope, target.organization_id) {
            return Err(AppError::Forbidden("You cannot demote officers of this organization".to_string()));
        }
        if target.is_super_officer && !actor.is_super_officer {
            return Err(AppError::Forbidden("Only administrators can demote a super officer".to_string()));
        }
        if !target.is_active {
            return Err(AppError::Conflict(format!("{} is not an active officer", target.full_name())));
        }

        let mut tx = self.pool.begin().await?;

        let deactivated = self.officer_repo.deactivate(&mut *tx, target.id).await?;
        if deactivated == 0 {
            return Err(AppError::Conflict(format!("{} is not an active officer", target.full_name())));
        }

        self.activity_log_repo
            .append(
                &mut *tx,
                NewActivityLog::new(
                    actor.user_id,
                    actions::OFFICER_DEMOTED,
                    format!("{} demoted {} ({})", actor.full_name(), target.full_name(), target.role),
                ),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Officer {} demoted by {}", target.id, actor.id);

        self.get(target.id).await
    }

    async fn get(&self, officer_id: i64) -> Result<Officer> {
        self.officer_repo
            .find_by_id(officer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Officer {} not found", officer_id)))
    }
}
