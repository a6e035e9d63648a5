use crate::{
    api::error,
    modules::call::{model::NewCallRecord, schema::CallRecordEntity},
};

#[async_trait::async_trait]
pub trait CallRepository {
    async fn create(&self, record: &NewCallRecord) -> Result<CallRecordEntity, error::SystemError>;

    /// Newest first.
    async fn find_by_participant(
        &self,
        identity: &str,
        limit: usize,
    ) -> Result<Vec<CallRecordEntity>, error::SystemError>;
}
