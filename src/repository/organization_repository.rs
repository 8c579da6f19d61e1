use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{CreateOrganizationRequest, HierarchyLevel, Organization, OrganizationStats},
    error::{AppError, Result},
    repository::{to_utc, OrganizationRepository},
};

#[derive(FromRow)]
struct OrganizationRow {
    id: i64,
    name: String,
    code: String,
    hierarchy_level: String,
    parent_id: Option<i64>,
    program_affiliation: Option<String>,
    college_id: Option<i64>,
    fee_tier: String,
    description: String,
    contact_email: String,
    contact_phone: String,
    booth_location: String,
    is_active: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const ORGANIZATION_COLUMNS: &str = r#"
    id, name, code, hierarchy_level, parent_id, program_affiliation,
    college_id, fee_tier, description, contact_email, contact_phone,
    booth_location, is_active, created_at, updated_at
"#;

pub struct SqliteOrganizationRepository {
    pool: SqlitePool,
}

impl SqliteOrganizationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_organization(row: OrganizationRow) -> Result<Organization> {
        let hierarchy_level = HierarchyLevel::from_str(&row.hierarchy_level).ok_or_else(|| {
            AppError::Database(format!("Invalid hierarchy level: {}", row.hierarchy_level))
        })?;

        Ok(Organization {
            id: row.id,
            name: row.name,
            code: row.code,
            hierarchy_level,
            parent_id: row.parent_id,
            program_affiliation: row.program_affiliation,
            college_id: row.college_id,
            fee_tier: row.fee_tier,
            description: row.description,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            booth_location: row.booth_location,
            is_active: row.is_active != 0,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }

    async fn fetch_where(&self, clause: &str) -> Result<Vec<Organization>> {
        let sql = format!(
            "SELECT {} FROM organizations {} ORDER BY name",
            ORGANIZATION_COLUMNS, clause
        );
        let rows = sqlx::query_as::<_, OrganizationRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_organization).collect()
    }
}

#[async_trait]
impl OrganizationRepository for SqliteOrganizationRepository {
    async fn create(&self, org: CreateOrganizationRequest) -> Result<Organization> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO organizations (
                name, code, hierarchy_level, parent_id, program_affiliation,
                college_id, fee_tier, description, contact_email, contact_phone,
                booth_location, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#
        )
        .bind(&org.name)
        .bind(&org.code)
        .bind(org.hierarchy_level.as_str())
        .bind(org.parent_id)
        .bind(&org.program_affiliation)
        .bind(org.college_id)
        .bind(&org.fee_tier)
        .bind(&org.description)
        .bind(&org.contact_email)
        .bind(&org.contact_phone)
        .bind(&org.booth_location)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(result.last_insert_rowid()).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created organization".to_string())
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Organization>> {
        let sql = format!("SELECT {} FROM organizations WHERE id = ?", ORGANIZATION_COLUMNS);
        let row = sqlx::query_as::<_, OrganizationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_organization).transpose()
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Organization>> {
        let sql = format!("SELECT {} FROM organizations WHERE code = ?", ORGANIZATION_COLUMNS);
        let row = sqlx::query_as::<_, OrganizationRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_organization).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Organization>> {
        self.fetch_where("").await
    }

    async fn list_active(&self) -> Result<Vec<Organization>> {
        self.fetch_where("WHERE is_active = 1").await
    }

    async fn stats(&self, organization_id: i64, day_start: DateTime<Utc>) -> Result<OrganizationStats> {
        let day_start_naive = day_start.naive_utc();
        let day_end_naive = (day_start + Duration::days(1)).naive_utc();

        let active_fees = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM fee_types WHERE organization_id = ? AND is_active = 1"
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        let (total_collected_cents, collected_today_cents) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COALESCE(SUM(amount_cents), 0),
                COALESCE(SUM(CASE WHEN created_at >= ? AND created_at < ? THEN amount_cents ELSE 0 END), 0)
            FROM payments
            WHERE organization_id = ? AND status = 'COMPLETED' AND is_void = 0
            "#
        )
        .bind(day_start_naive)
        .bind(day_end_naive)
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        let pending_requests = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM payment_requests
            WHERE organization_id = ? AND status = 'PENDING' AND expires_at > ?
            "#
        )
        .bind(organization_id)
        .bind(Utc::now().naive_utc())
        .fetch_one(&self.pool)
        .await?;

        Ok(OrganizationStats {
            organization_id,
            active_fees,
            total_collected_cents,
            collected_today_cents,
            pending_requests,
        })
    }
}
