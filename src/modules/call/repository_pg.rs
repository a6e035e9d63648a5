use uuid::Uuid;

use crate::{
    api::error,
    modules::call::{model::NewCallRecord, repository::CallRepository, schema::CallRecordEntity},
};

#[derive(Clone)]
pub struct CallRepositoryPg {
    pool: sqlx::PgPool,
}

impl CallRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CallRepository for CallRepositoryPg {
    async fn create(&self, record: &NewCallRecord) -> Result<CallRecordEntity, error::SystemError> {
        let entity = sqlx::query_as::<_, CallRecordEntity>(
            r#"
            INSERT INTO call_records
                (id, caller, receiver, participants, kind, outcome, start_time, end_time, duration, created_at)
            VALUES ($1, $2, $3, ARRAY[$2, $3], $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&record.caller)
        .bind(&record.receiver)
        .bind(record.kind)
        .bind(record.outcome)
        .bind(record.start_time)
        .bind(record.end_time)
        .bind(&record.duration)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(entity)
    }

    async fn find_by_participant(
        &self,
        identity: &str,
        limit: usize,
    ) -> Result<Vec<CallRecordEntity>, error::SystemError> {
        let records = sqlx::query_as::<_, CallRecordEntity>(
            r#"
            SELECT *
            FROM call_records
            WHERE $1 = ANY(participants)
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(identity)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
