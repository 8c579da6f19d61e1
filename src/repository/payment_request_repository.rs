use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{NewPaymentRequest, PaymentRequest, PaymentRequestStatus},
    error::{AppError, Result},
    repository::{parse_uuid, to_utc, PaymentRequestRepository},
};

#[derive(FromRow)]
struct PaymentRequestRow {
    id: i64,
    request_id: String,
    student_id: i64,
    organization_id: i64,
    fee_type_id: i64,
    amount_cents: i64,
    queue_number: String,
    qr_signature: String,
    qr_image: Option<String>,
    status: String,
    expires_at: NaiveDateTime,
    paid_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const PAYMENT_REQUEST_COLUMNS: &str = r#"
    id, request_id, student_id, organization_id, fee_type_id, amount_cents,
    queue_number, qr_signature, qr_image, status, expires_at, paid_at,
    created_at, updated_at
"#;

pub struct SqlitePaymentRequestRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRequestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_request(row: PaymentRequestRow) -> Result<PaymentRequest> {
        let status = PaymentRequestStatus::from_str(&row.status)
            .ok_or_else(|| AppError::Database(format!("Invalid request status: {}", row.status)))?;

        Ok(PaymentRequest {
            id: row.id,
            request_id: parse_uuid(&row.request_id)?,
            student_id: row.student_id,
            organization_id: row.organization_id,
            fee_type_id: row.fee_type_id,
            amount_cents: row.amount_cents,
            queue_number: row.queue_number,
            qr_signature: row.qr_signature,
            qr_image: row.qr_image,
            status,
            expires_at: to_utc(row.expires_at),
            paid_at: row.paid_at.map(to_utc),
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }

    async fn fetch_many(&self, sql: &str, id: i64, now: Option<NaiveDateTime>) -> Result<Vec<PaymentRequest>> {
        let mut query = sqlx::query_as::<_, PaymentRequestRow>(sql).bind(id);
        if let Some(now) = now {
            query = query.bind(now);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_request).collect()
    }
}

#[async_trait]
impl PaymentRequestRepository for SqlitePaymentRequestRepository {
    async fn insert(&self, conn: &mut SqliteConnection, request: &NewPaymentRequest) -> std::result::Result<i64, sqlx::Error> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO payment_requests (
                request_id, student_id, organization_id, fee_type_id, amount_cents,
                queue_number, qr_signature, qr_image, status, expires_at,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'PENDING', ?, ?, ?)
            "#
        )
        .bind(request.request_id.to_string())
        .bind(request.student_id)
        .bind(request.organization_id)
        .bind(request.fee_type_id)
        .bind(request.amount_cents)
        .bind(&request.queue_number)
        .bind(&request.qr_signature)
        .bind(&request.qr_image)
        .bind(request.expires_at.naive_utc())
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PaymentRequest>> {
        let sql = format!("SELECT {} FROM payment_requests WHERE id = ?", PAYMENT_REQUEST_COLUMNS);
        let row = sqlx::query_as::<_, PaymentRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_request).transpose()
    }

    async fn find_by_request_id(&self, request_id: Uuid) -> Result<Option<PaymentRequest>> {
        let sql = format!("SELECT {} FROM payment_requests WHERE request_id = ?", PAYMENT_REQUEST_COLUMNS);
        let row = sqlx::query_as::<_, PaymentRequestRow>(&sql)
            .bind(request_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_request).transpose()
    }

    async fn list_by_student(&self, student_id: i64) -> Result<Vec<PaymentRequest>> {
        let sql = format!(
            "SELECT {} FROM payment_requests WHERE student_id = ? ORDER BY created_at DESC, id DESC",
            PAYMENT_REQUEST_COLUMNS
        );
        self.fetch_many(&sql, student_id, None).await
    }

    async fn queue_numbers_for(&self, student_id: i64, organization_id: i64) -> Result<Vec<String>> {
        let queue_numbers = sqlx::query_scalar::<_, String>(
            "SELECT queue_number FROM payment_requests WHERE student_id = ? AND organization_id = ?"
        )
        .bind(student_id)
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(queue_numbers)
    }

    async fn list_pending_by_student(&self, student_id: i64, now: DateTime<Utc>) -> Result<Vec<PaymentRequest>> {
        let sql = format!(
            r#"
            SELECT {} FROM payment_requests
            WHERE student_id = ? AND status = 'PENDING' AND expires_at > ?
            ORDER BY created_at DESC, id DESC
            "#,
            PAYMENT_REQUEST_COLUMNS
        );
        self.fetch_many(&sql, student_id, Some(now.naive_utc())).await
    }

    async fn list_pending_by_organization(&self, organization_id: i64, now: DateTime<Utc>) -> Result<Vec<PaymentRequest>> {
        // Oldest first so the queue drains in arrival order
        let sql = format!(
            r#"
            SELECT {} FROM payment_requests
            WHERE organization_id = ? AND status = 'PENDING' AND expires_at > ?
            ORDER BY created_at ASC, id ASC
            "#,
            PAYMENT_REQUEST_COLUMNS
        );
        self.fetch_many(&sql, organization_id, Some(now.naive_utc())).await
    }

    async fn transition(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        to: PaymentRequestStatus,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let now = now.naive_utc();

        let result = match to {
            PaymentRequestStatus::Pending => {
                return Err(AppError::Internal("Cannot transition a request back to PENDING".to_string()));
            }
            PaymentRequestStatus::Paid => {
                sqlx::query(
                    r#"
                    UPDATE payment_requests
                    SET status = 'PAID', paid_at = ?, updated_at = ?
                    WHERE id = ? AND status = 'PENDING' AND expires_at > ?
                    "#
                )
                .bind(now)
                .bind(now)
                .bind(id)
                .bind(now)
                .execute(&mut *conn)
                .await?
            }
            PaymentRequestStatus::Cancelled => {
                sqlx::query(
                    r#"
                    UPDATE payment_requests
                    SET status = 'CANCELLED', updated_at = ?
                    WHERE id = ? AND status = 'PENDING' AND expires_at > ?
                    "#
                )
                .bind(now)
                .bind(id)
                .bind(now)
                .execute(&mut *conn)
                .await?
            }
            PaymentRequestStatus::Expired => {
                sqlx::query(
                    r#"
                    UPDATE payment_requests
                    SET status = 'EXPIRED', updated_at = ?
                    WHERE id = ? AND status = 'PENDING' AND expires_at <= ?
                    "#
                )
                .bind(now)
                .bind(id)
                .bind(now)
                .execute(&mut *conn)
                .await?
            }
        };

        Ok(result.rows_affected())
    }

    async fn expire_stale(&self, conn: &mut SqliteConnection, now: DateTime<Utc>) -> Result<u64> {
        let now = now.naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE payment_requests
            SET status = 'EXPIRED', updated_at = ?
            WHERE status = 'PENDING' AND expires_at <= ?
            "#
        )
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}
