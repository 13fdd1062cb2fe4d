//! Call record persistence trait

use async_trait::async_trait;

use crate::{CallRecord, Result};

/// Storage for finalized call records
///
/// Failures surface as [`crate::Error::PersistenceFailure`]; callers on the
/// teardown path log and drop them.
#[async_trait]
pub trait CallRecordStore: Send + Sync + 'static {
    /// Persist one finalized call
    async fn store(&self, record: &CallRecord) -> Result<()>;

    /// Most recent records, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<CallRecord>>;

    /// Backend name for logging
    fn backend_name(&self) -> &str;
}
