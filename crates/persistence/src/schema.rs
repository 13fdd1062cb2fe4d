//! ScyllaDB schema creation

use crate::error::PersistenceError;
use scylla::Session;

/// Create the keyspace if it doesn't exist
pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

/// Create all required tables
///
/// Call logs are partitioned by UTC day so "most recent calls" reads a
/// single partition in clustering order.
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    let call_logs_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.call_logs (
            log_date TEXT,
            created_at BIGINT,
            call_id TEXT,
            caller_id TEXT,
            transcript TEXT,
            detected_intent TEXT,
            duration_secs BIGINT,
            PRIMARY KEY ((log_date), created_at, call_id)
        ) WITH CLUSTERING ORDER BY (created_at DESC, call_id ASC)
    "#,
        keyspace
    );

    session
        .query_unpaged(call_logs_table, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create call_logs table: {}", e)))?;

    Ok(())
}
