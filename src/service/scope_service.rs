use std::sync::Arc;

use crate::{
    domain::{scope::OrganizationTree, AccessScope, Course, Officer, Organization, Student},
    error::{AppError, Result},
    repository::{AcademicRepository, OrganizationRepository},
};

/// Loads the organization hierarchy and answers scoping questions against
/// it. Every listing and permission check goes through here.
pub struct ScopeService {
    organization_repo: Arc<dyn OrganizationRepository>,
    academic_repo: Arc<dyn AcademicRepository>,
}

impl ScopeService {
    pub fn new(
        organization_repo: Arc<dyn OrganizationRepository>,
        academic_repo: Arc<dyn AcademicRepository>,
    ) -> Self {
        Self {
            organization_repo,
            academic_repo,
        }
    }

    pub async fn scope_for_officer(&self, officer: &Officer) -> Result<AccessScope> {
        if officer.is_super_officer {
            return Ok(AccessScope::unrestricted());
        }

        let organizations = self.organization_repo.list_all().await?;
        Ok(OrganizationTree::new(&organizations).scope_for_officer(officer))
    }

    pub async fn course_for(&self, student: &Student) -> Result<Course> {
        self.academic_repo
            .find_course_by_id(student.course_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", student.course_id)))
    }

    /// Active organizations whose fees the student may pay.
    pub async fn eligible_organizations(&self, student: &Student) -> Result<Vec<Organization>> {
        let course = self.course_for(student).await?;
        let organizations = self.organization_repo.list_all().await?;

        Ok(OrganizationTree::new(&organizations)
            .eligible_organizations(&course)
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn can_view_student(&self, officer: &Officer, student: &Student) -> Result<bool> {
        let scope = self.scope_for_officer(officer).await?;
        if scope.unrestricted {
            return Ok(true);
        }

        let course = self.course_for(student).await?;
        Ok(student.is_active && scope.covers_course(&course))
    }
}
