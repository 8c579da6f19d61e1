use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    domain::{AccessScope, CreateOfficerRequest, Officer, OfficerCapabilities},
    error::Result,
    repository::{push_id_list, to_utc, OfficerRepository},
};

#[derive(FromRow)]
struct OfficerRow {
    id: i64,
    user_id: i64,
    employee_id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone_number: String,
    organization_id: i64,
    role: String,
    can_process_payments: i64,
    can_void_payments: i64,
    can_generate_reports: i64,
    can_promote_officers: i64,
    is_super_officer: i64,
    is_active: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const OFFICER_COLUMNS: &str = r#"
    id, user_id, employee_id, first_name, last_name, email, phone_number,
    organization_id, role, can_process_payments, can_void_payments,
    can_generate_reports, can_promote_officers, is_super_officer, is_active,
    created_at, updated_at
"#;

pub struct SqliteOfficerRepository {
    pool: SqlitePool,
}

impl SqliteOfficerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_officer(row: OfficerRow) -> Officer {
        Officer {
            id: row.id,
            user_id: row.user_id,
            employee_id: row.employee_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone_number: row.phone_number,
            organization_id: row.organization_id,
            role: row.role,
            capabilities: OfficerCapabilities {
                can_process_payments: row.can_process_payments != 0,
                can_void_payments: row.can_void_payments != 0,
                can_generate_reports: row.can_generate_reports != 0,
                can_promote_officers: row.can_promote_officers != 0,
            },
            is_super_officer: row.is_super_officer != 0,
            is_active: row.is_active != 0,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        }
    }
}

#[async_trait]
impl OfficerRepository for SqliteOfficerRepository {
    async fn create(&self, conn: &mut SqliteConnection, officer: CreateOfficerRequest) -> Result<i64> {
        let now = Utc::now().naive_utc();
        let caps = officer.capabilities;

        let result = sqlx::query(
            r#"
            INSERT INTO officers (
                user_id, employee_id, first_name, last_name, email, phone_number,
                organization_id, role, can_process_payments, can_void_payments,
                can_generate_reports, can_promote_officers, is_super_officer,
                is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#
        )
        .bind(officer.user_id)
        .bind(&officer.employee_id)
        .bind(&officer.first_name)
        .bind(&officer.last_name)
        .bind(&officer.email)
        .bind(&officer.phone_number)
        .bind(officer.organization_id)
        .bind(&officer.role)
        .bind(caps.can_process_payments)
        .bind(caps.can_void_payments)
        .bind(caps.can_generate_reports)
        .bind(caps.can_promote_officers)
        .bind(officer.is_super_officer)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Officer>> {
        let sql = format!("SELECT {} FROM officers WHERE id = ?", OFFICER_COLUMNS);
        let row = sqlx::query_as::<_, OfficerRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Self::row_to_officer))
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Option<Officer>> {
        let sql = format!("SELECT {} FROM officers WHERE user_id = ?", OFFICER_COLUMNS);
        let row = sqlx::query_as::<_, OfficerRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Self::row_to_officer))
    }

    async fn list_in_scope(&self, scope: &AccessScope) -> Result<Vec<Officer>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM officers WHERE is_active = 1",
            OFFICER_COLUMNS
        ));

        if !scope.unrestricted {
            if scope.organization_ids.is_empty() {
                return Ok(Vec::new());
            }
            qb.push(" AND ");
            push_id_list(&mut qb, "organization_id", scope.organization_ids.iter().copied());
        }

        qb.push(" ORDER BY last_name, first_name");

        let rows = qb.build_query_as::<OfficerRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Self::row_to_officer).collect())
    }

    async fn reactivate(&self, conn: &mut SqliteConnection, id: i64, officer: CreateOfficerRequest) -> Result<u64> {
        let now = Utc::now().naive_utc();
        let caps = officer.capabilities;

        let result = sqlx::query(
            r#"
            UPDATE officers
            SET organization_id = ?,
                role = ?,
                can_process_payments = ?,
                can_void_payments = ?,
                can_generate_reports = ?,
                can_promote_officers = ?,
                is_super_officer = ?,
                is_active = 1,
                updated_at = ?
            WHERE id = ? AND is_active = 0
            "#
        )
        .bind(officer.organization_id)
        .bind(&officer.role)
        .bind(caps.can_process_payments)
        .bind(caps.can_void_payments)
        .bind(caps.can_generate_reports)
        .bind(caps.can_promote_officers)
        .bind(officer.is_super_officer)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    async fn deactivate(&self, conn: &mut SqliteConnection, id: i64) -> Result<u64> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE officers
            SET is_active = 0,
                can_process_payments = 0,
                can_void_payments = 0,
                can_generate_reports = 0,
                can_promote_officers = 0,
                is_super_officer = 0,
                updated_at = ?
            WHERE id = ? AND is_active = 1
            "#
        )
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}
