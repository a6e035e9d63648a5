use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    api::error,
    modules::call::{model::NewCallRecord, repository::CallRepository, schema::CallRecordEntity},
};

#[derive(Default)]
pub struct CallRepositoryMemory {
    records: RwLock<Vec<CallRecordEntity>>,
}

impl CallRepositoryMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CallRepository for CallRepositoryMemory {
    async fn create(&self, record: &NewCallRecord) -> Result<CallRecordEntity, error::SystemError> {
        let entity = CallRecordEntity {
            id: Uuid::now_v7(),
            caller: record.caller.clone(),
            receiver: record.receiver.clone(),
            participants: vec![record.caller.clone(), record.receiver.clone()],
            kind: record.kind,
            outcome: record.outcome,
            start_time: record.start_time,
            end_time: record.end_time,
            duration: record.duration.clone(),
            created_at: record.created_at,
        };
        self.records.write().await.push(entity.clone());
        Ok(entity)
    }

    async fn find_by_participant(
        &self,
        identity: &str,
        limit: usize,
    ) -> Result<Vec<CallRecordEntity>, error::SystemError> {
        let records = self.records.read().await;
        // Insertion order doubles as id order for records with equal timestamps.
        let mut matching: Vec<CallRecordEntity> = records
            .iter()
            .rev()
            .filter(|r| r.participants.iter().any(|p| p == identity))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }
}
