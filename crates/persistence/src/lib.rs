//! Call log persistence for the receptionist call agent
//!
//! Provides [`CallRecordStore`](receptionist_core::CallRecordStore)
//! implementations:
//! - ScyllaDB call log, partitioned by UTC day
//! - Bounded in-memory call log for development

pub mod call_logs;
pub mod client;
pub mod error;
pub mod memory;
pub mod schema;

pub use call_logs::ScyllaCallLogStore;
pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;
pub use memory::InMemoryCallLogStore;

/// Connect to ScyllaDB and ensure the schema exists
pub async fn init(config: ScyllaConfig) -> Result<PersistenceLayer, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;

    Ok(PersistenceLayer {
        call_logs: ScyllaCallLogStore::new(client),
    })
}

/// Combined persistence layer
pub struct PersistenceLayer {
    pub call_logs: ScyllaCallLogStore,
}
