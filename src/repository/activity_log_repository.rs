use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    domain::{AccessScope, ActivityLog, NewActivityLog},
    error::Result,
    repository::{push_id_list, to_utc, ActivityLogRepository},
};

#[derive(FromRow)]
struct ActivityLogRow {
    id: i64,
    user_id: i64,
    action: String,
    description: String,
    payment_id: Option<i64>,
    payment_request_id: Option<i64>,
    organization_id: Option<i64>,
    created_at: NaiveDateTime,
}

impl From<ActivityLogRow> for ActivityLog {
    fn from(row: ActivityLogRow) -> Self {
        ActivityLog {
            id: row.id,
            user_id: row.user_id,
            action: row.action,
            description: row.description,
            payment_id: row.payment_id,
            payment_request_id: row.payment_request_id,
            organization_id: row.organization_id,
            created_at: to_utc(row.created_at),
        }
    }
}

const ACTIVITY_LOG_COLUMNS: &str =
    "a.id, a.user_id, a.action, a.description, a.payment_id, a.payment_request_id, a.organization_id, a.created_at";

/// Append-only audit trail. The table carries triggers that reject UPDATE
/// and DELETE, so this repository only ever inserts and reads.
pub struct SqliteActivityLogRepository {
    pool: SqlitePool,
}

impl SqliteActivityLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLogRepository for SqliteActivityLogRepository {
    async fn append(&self, conn: &mut SqliteConnection, entry: NewActivityLog) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO activity_logs (
                user_id, action, description, payment_id, payment_request_id, organization_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(entry.user_id)
        .bind(entry.action)
        .bind(&entry.description)
        .bind(entry.payment_id)
        .bind(entry.payment_request_id)
        .bind(entry.organization_id)
        .bind(Utc::now().naive_utc())
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_in_scope(&self, scope: &AccessScope, actor_user_id: i64, limit: i64) -> Result<Vec<ActivityLog>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            r#"
            SELECT {} FROM activity_logs a
            LEFT JOIN payments p ON p.id = a.payment_id
            LEFT JOIN payment_requests r ON r.id = a.payment_request_id
            "#,
            ACTIVITY_LOG_COLUMNS
        ));

        if !scope.unrestricted {
            qb.push(" WHERE a.user_id = ");
            qb.push_bind(actor_user_id);
            if !scope.organization_ids.is_empty() {
                qb.push(" OR ");
                push_id_list(&mut qb, "p.organization_id", scope.organization_ids.iter().copied());
                qb.push(" OR ");
                push_id_list(&mut qb, "r.organization_id", scope.organization_ids.iter().copied());
                qb.push(" OR ");
                push_id_list(&mut qb, "a.organization_id", scope.organization_ids.iter().copied());
            }
        }

        qb.push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ");
        qb.push_bind(limit);

        let rows = qb.build_query_as::<ActivityLogRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_for_payment(&self, payment_id: i64) -> Result<Vec<ActivityLog>> {
        let sql = format!(
            "SELECT {} FROM activity_logs a WHERE a.payment_id = ? ORDER BY a.id",
            ACTIVITY_LOG_COLUMNS
        );
        let rows = sqlx::query_as::<_, ActivityLogRow>(&sql)
            .bind(payment_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_for_request(&self, payment_request_id: i64) -> Result<Vec<ActivityLog>> {
        let sql = format!(
            "SELECT {} FROM activity_logs a WHERE a.payment_request_id = ? ORDER BY a.id",
            ACTIVITY_LOG_COLUMNS
        );
        let rows = sqlx::query_as::<_, ActivityLogRow>(&sql)
            .bind(payment_request_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
