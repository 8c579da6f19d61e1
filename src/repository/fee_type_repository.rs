use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    domain::{CreateFeeTypeRequest, FeeType, Semester, UpdateFeeTypeRequest},
    error::{AppError, Result},
    repository::{push_id_list, to_utc, FeeTypeRepository},
};

#[derive(FromRow)]
struct FeeTypeRow {
    id: i64,
    organization_id: i64,
    name: String,
    amount_cents: i64,
    description: String,
    academic_year: String,
    semester: String,
    applicable_year_levels: String,
    deadline: Option<NaiveDateTime>,
    is_active: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const FEE_TYPE_COLUMNS: &str = r#"
    id, organization_id, name, amount_cents, description, academic_year,
    semester, applicable_year_levels, deadline, is_active, created_at, updated_at
"#;

pub struct SqliteFeeTypeRepository {
    pool: SqlitePool,
}

impl SqliteFeeTypeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_fee_type(row: FeeTypeRow) -> Result<FeeType> {
        let semester = Semester::from_str(&row.semester)
            .ok_or_else(|| AppError::Database(format!("Invalid semester: {}", row.semester)))?;

        Ok(FeeType {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            amount_cents: row.amount_cents,
            description: row.description,
            academic_year: row.academic_year,
            semester,
            applicable_year_levels: row.applicable_year_levels,
            deadline: row.deadline.map(to_utc),
            is_active: row.is_active != 0,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }
}

#[async_trait]
impl FeeTypeRepository for SqliteFeeTypeRepository {
    async fn create(&self, conn: &mut SqliteConnection, fee: CreateFeeTypeRequest) -> Result<i64> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO fee_types (
                organization_id, name, amount_cents, description, academic_year,
                semester, applicable_year_levels, deadline, is_active,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#
        )
        .bind(fee.organization_id)
        .bind(&fee.name)
        .bind(fee.amount_cents)
        .bind(&fee.description)
        .bind(&fee.academic_year)
        .bind(fee.semester.as_str())
        .bind(&fee.applicable_year_levels)
        .bind(fee.deadline.map(|d| d.naive_utc()))
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update(&self, conn: &mut SqliteConnection, id: i64, fee: &UpdateFeeTypeRequest) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE fee_types
            SET name = ?, amount_cents = ?, description = ?, academic_year = ?,
                semester = ?, applicable_year_levels = ?, deadline = ?, updated_at = ?
            WHERE id = ? AND is_active = 1
            "#
        )
        .bind(&fee.name)
        .bind(fee.amount_cents)
        .bind(&fee.description)
        .bind(&fee.academic_year)
        .bind(fee.semester.as_str())
        .bind(&fee.applicable_year_levels)
        .bind(fee.deadline.map(|d| d.naive_utc()))
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    async fn deactivate(&self, conn: &mut SqliteConnection, id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE fee_types SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1"
        )
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<FeeType>> {
        let sql = format!("SELECT {} FROM fee_types WHERE id = ?", FEE_TYPE_COLUMNS);
        let row = sqlx::query_as::<_, FeeTypeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_fee_type).transpose()
    }

    async fn list_active_by_organization(&self, organization_id: i64) -> Result<Vec<FeeType>> {
        self.list_active_for_organizations(&[organization_id]).await
    }

    async fn list_active_for_organizations(&self, organization_ids: &[i64]) -> Result<Vec<FeeType>> {
        if organization_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM fee_types WHERE is_active = 1 AND ",
            FEE_TYPE_COLUMNS
        ));
        push_id_list(&mut qb, "organization_id", organization_ids.iter().copied());
        qb.push(" ORDER BY organization_id, name");

        let rows = qb.build_query_as::<FeeTypeRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_fee_type).collect()
    }
}
