use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{
    domain::{ActivityLog, Officer, OrganizationStats},
    error::{AppError, Result},
    repository::{ActivityLogRepository, OrganizationRepository, PaymentRepository},
    service::{start_of_day, ScopeService},
};

#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub organization_id: i64,
    pub code: String,
    pub name: String,
    pub stats: OrganizationStats,
    /// Collected within the requested date range.
    pub collected_in_range_cents: i64,
    pub payments_in_range: usize,
}

pub struct ReportService {
    organization_repo: Arc<dyn OrganizationRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    activity_log_repo: Arc<dyn ActivityLogRepository>,
    scope_service: Arc<ScopeService>,
}

impl ReportService {
    pub fn new(
        organization_repo: Arc<dyn OrganizationRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        activity_log_repo: Arc<dyn ActivityLogRepository>,
        scope_service: Arc<ScopeService>,
    ) -> Self {
        Self {
            organization_repo,
            payment_repo,
            activity_log_repo,
            scope_service,
        }
    }

    pub async fn organization_stats(&self, organization_id: i64) -> Result<OrganizationStats> {
        self.organization_repo
            .stats(organization_id, start_of_day(Utc::now()))
            .await
    }

    /// Collection totals for every organization the officer reaches.
    /// `date_to` is exclusive.
    pub async fn collections_report(
        &self,
        officer: &Officer,
        date_from: Option<DateTime<Utc>>,
        date_to: Option<DateTime<Utc>>,
    ) -> Result<Vec<CollectionSummary>> {
        ensure_can_report(officer)?;

        let now = Utc::now();
        let from = date_from.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let to = date_to.unwrap_or_else(|| start_of_day(now) + Duration::days(1));
        if from >= to {
            return Err(AppError::Validation("date_from must be before date_to".to_string()));
        }

        let scope = self.scope_service.scope_for_officer(officer).await?;
        let organizations = self.organization_repo.list_active().await?;

        let mut summaries = Vec::new();
        for organization in organizations
            .into_iter()
            .filter(|org| scope.includes_organization(org.id))
        {
            let stats = self
                .organization_repo
                .stats(organization.id, start_of_day(now))
                .await?;
            let payments = self
                .payment_repo
                .list_collected_by_organization(organization.id, from, to)
                .await?;

            summaries.push(CollectionSummary {
                organization_id: organization.id,
                code: organization.code,
                name: organization.name,
                stats,
                collected_in_range_cents: payments.iter().map(|p| p.amount_cents).sum(),
                payments_in_range: payments.len(),
            });
        }

        Ok(summaries)
    }

    pub async fn activity_log(&self, officer: &Officer, limit: i64) -> Result<Vec<ActivityLog>> {
        ensure_can_report(officer)?;

        let scope = self.scope_service.scope_for_officer(officer).await?;
        self.activity_log_repo
            .list_in_scope(&scope, officer.user_id, limit)
            .await
    }
}

fn ensure_can_report(officer: &Officer) -> Result<()> {
    if officer.is_active && (officer.is_super_officer || officer.capabilities.can_generate_reports) {
        Ok(())
    } else {
        Err(AppError::Forbidden("You do not have permission to view reports".to_string()))
    }
}
