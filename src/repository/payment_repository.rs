use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    domain::{AccessScope, NewPayment, Payment, PaymentMethod, PaymentSearch, PaymentStatus},
    error::{AppError, Result},
    repository::{push_id_list, to_utc, PaymentRepository},
};

#[derive(FromRow)]
struct PaymentRow {
    id: i64,
    payment_request_id: i64,
    student_id: i64,
    organization_id: i64,
    fee_type_id: i64,
    amount_cents: i64,
    amount_received_cents: i64,
    payment_method: String,
    or_number: String,
    status: String,
    notes: Option<String>,
    processed_by: i64,
    is_void: i64,
    void_reason: Option<String>,
    voided_by: Option<i64>,
    voided_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const PAYMENT_COLUMNS: &str = r#"
    p.id, p.payment_request_id, p.student_id, p.organization_id, p.fee_type_id,
    p.amount_cents, p.amount_received_cents, p.payment_method, p.or_number,
    p.status, p.notes, p.processed_by, p.is_void, p.void_reason, p.voided_by,
    p.voided_at, p.created_at, p.updated_at
"#;

/// Upper bound on rows returned by the officer search.
const SEARCH_LIMIT: i64 = 200;

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PaymentRow) -> Result<Payment> {
        let payment_method = PaymentMethod::from_str(&row.payment_method).ok_or_else(|| {
            AppError::Database(format!("Invalid payment method: {}", row.payment_method))
        })?;
        let status = PaymentStatus::from_str(&row.status)
            .ok_or_else(|| AppError::Database(format!("Invalid payment status: {}", row.status)))?;

        Ok(Payment {
            id: row.id,
            payment_request_id: row.payment_request_id,
            student_id: row.student_id,
            organization_id: row.organization_id,
            fee_type_id: row.fee_type_id,
            amount_cents: row.amount_cents,
            amount_received_cents: row.amount_received_cents,
            payment_method,
            or_number: row.or_number,
            status,
            notes: row.notes,
            processed_by: row.processed_by,
            is_void: row.is_void != 0,
            void_reason: row.void_reason,
            voided_by: row.voided_by,
            voided_at: row.voided_at.map(to_utc),
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }

    fn collect(rows: Vec<PaymentRow>) -> Result<Vec<Payment>> {
        rows.into_iter().map(Self::row_to_payment).collect()
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn insert(&self, conn: &mut SqliteConnection, payment: &NewPayment) -> std::result::Result<i64, sqlx::Error> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                payment_request_id, student_id, organization_id, fee_type_id,
                amount_cents, amount_received_cents, payment_method, or_number,
                status, notes, processed_by, is_void, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'COMPLETED', ?, ?, 0, ?, ?)
            "#
        )
        .bind(payment.payment_request_id)
        .bind(payment.student_id)
        .bind(payment.organization_id)
        .bind(payment.fee_type_id)
        .bind(payment.amount_cents)
        .bind(payment.amount_received_cents)
        .bind(payment.payment_method.as_str())
        .bind(&payment.or_number)
        .bind(&payment.notes)
        .bind(payment.processed_by)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Payment>> {
        let sql = format!("SELECT {} FROM payments p WHERE p.id = ?", PAYMENT_COLUMNS);
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn find_by_or_number(&self, or_number: &str) -> Result<Option<Payment>> {
        let sql = format!("SELECT {} FROM payments p WHERE p.or_number = ?", PAYMENT_COLUMNS);
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(or_number)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn list_by_student(&self, student_id: i64) -> Result<Vec<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments p WHERE p.student_id = ? ORDER BY p.created_at DESC, p.id DESC",
            PAYMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;

        Self::collect(rows)
    }

    async fn list_collected_by_student(&self, student_id: i64, limit: i64) -> Result<Vec<Payment>> {
        let sql = format!(
            r#"
            SELECT {} FROM payments p
            WHERE p.student_id = ? AND p.status = 'COMPLETED' AND p.is_void = 0
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ?
            "#,
            PAYMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(student_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Self::collect(rows)
    }

    async fn list_collected_by_organization(
        &self,
        organization_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Payment>> {
        let sql = format!(
            r#"
            SELECT {} FROM payments p
            WHERE p.organization_id = ?
              AND p.status = 'COMPLETED' AND p.is_void = 0
              AND p.created_at >= ? AND p.created_at < ?
            ORDER BY p.created_at DESC, p.id DESC
            "#,
            PAYMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(organization_id)
            .bind(from.naive_utc())
            .bind(to.naive_utc())
            .fetch_all(&self.pool)
            .await?;

        Self::collect(rows)
    }

    async fn search(&self, scope: &AccessScope, search: &PaymentSearch) -> Result<Vec<Payment>> {
        if !scope.unrestricted && scope.organization_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM payments p JOIN students s ON s.id = p.student_id WHERE p.status = 'COMPLETED'",
            PAYMENT_COLUMNS
        ));

        if !scope.unrestricted {
            qb.push(" AND ");
            push_id_list(&mut qb, "p.organization_id", scope.organization_ids.iter().copied());
        }

        if let Some(query) = search.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", query);
            qb.push(" AND (p.or_number LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR s.student_id_number LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR s.first_name LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR s.last_name LIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }

        if let Some(from) = search.date_from {
            qb.push(" AND p.created_at >= ");
            qb.push_bind(from.naive_utc());
        }

        if let Some(to) = search.date_to {
            qb.push(" AND p.created_at < ");
            qb.push_bind(to.naive_utc());
        }

        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(SEARCH_LIMIT);

        let rows = qb.build_query_as::<PaymentRow>()
            .fetch_all(&self.pool)
            .await?;

        Self::collect(rows)
    }

    async fn mark_void(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        voided_by: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let now = now.naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE payments
            SET is_void = 1, void_reason = ?, voided_by = ?, voided_at = ?, updated_at = ?
            WHERE id = ? AND is_void = 0 AND status = 'COMPLETED'
            "#
        )
        .bind(reason)
        .bind(voided_by)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}
