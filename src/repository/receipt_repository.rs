use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::{
    domain::Receipt,
    error::Result,
    repository::{to_utc, ReceiptRepository},
};

#[derive(FromRow)]
struct ReceiptRow {
    id: i64,
    payment_id: i64,
    or_number: String,
    email_sent: i64,
    sms_sent: i64,
    verification_signature: String,
    created_at: NaiveDateTime,
}

impl From<ReceiptRow> for Receipt {
    fn from(row: ReceiptRow) -> Self {
        Receipt {
            id: row.id,
            payment_id: row.payment_id,
            or_number: row.or_number,
            email_sent: row.email_sent != 0,
            sms_sent: row.sms_sent != 0,
            verification_signature: row.verification_signature,
            created_at: to_utc(row.created_at),
        }
    }
}

const RECEIPT_COLUMNS: &str =
    "id, payment_id, or_number, email_sent, sms_sent, verification_signature, created_at";

pub struct SqliteReceiptRepository {
    pool: SqlitePool,
}

impl SqliteReceiptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReceiptRepository for SqliteReceiptRepository {
    async fn insert(
        &self,
        conn: &mut SqliteConnection,
        payment_id: i64,
        or_number: &str,
        verification_signature: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO receipts (payment_id, or_number, email_sent, sms_sent, verification_signature, created_at)
            VALUES (?, ?, 0, 0, ?, ?)
            "#
        )
        .bind(payment_id)
        .bind(or_number)
        .bind(verification_signature)
        .bind(Utc::now().naive_utc())
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_payment(&self, payment_id: i64) -> Result<Option<Receipt>> {
        let sql = format!("SELECT {} FROM receipts WHERE payment_id = ?", RECEIPT_COLUMNS);
        let row = sqlx::query_as::<_, ReceiptRow>(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }
}
