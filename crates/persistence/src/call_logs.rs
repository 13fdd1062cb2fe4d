//! Call log persistence using ScyllaDB

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};

use receptionist_core::{CallRecord, CallRecordStore};

use crate::{PersistenceError, ScyllaClient};

/// Days scanned backwards when listing recent calls
const RECENT_LOOKBACK_DAYS: u64 = 7;

/// ScyllaDB call log
#[derive(Clone)]
pub struct ScyllaCallLogStore {
    client: ScyllaClient,
}

impl ScyllaCallLogStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    pub async fn insert(&self, record: &CallRecord) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.call_logs (
                log_date, created_at, call_id, caller_id,
                transcript, detected_intent, duration_secs
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );
        let duration_secs = i64::try_from(record.duration_secs)
            .map_err(|_| PersistenceError::InvalidData("duration out of range".to_string()))?;

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    log_date(record.created_at),
                    record.created_at.timestamp_millis(),
                    &record.call_id,
                    &record.caller_id,
                    &record.transcript,
                    &record.detected_intent,
                    duration_secs,
                ),
            )
            .await?;

        tracing::info!(
            call_id = %record.call_id,
            caller_id = %record.caller_id,
            intent = %record.detected_intent,
            "Call log written to ScyllaDB"
        );

        Ok(())
    }

    /// Calls logged on `day`, newest first
    pub async fn list_for_day(
        &self,
        day: NaiveDate,
        limit: usize,
    ) -> Result<Vec<CallRecord>, PersistenceError> {
        let query = format!(
            "SELECT call_id, caller_id, transcript, detected_intent, duration_secs, created_at
             FROM {}.call_logs WHERE log_date = ? LIMIT ?",
            self.client.keyspace()
        );
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);

        let result = self
            .client
            .session()
            .query_unpaged(query, (day.to_string(), limit))
            .await?;

        let mut records = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                records.push(row_to_record(row)?);
            }
        }
        Ok(records)
    }

    /// Most recent calls, newest first, scanning back day by day
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<CallRecord>, PersistenceError> {
        let today = Utc::now().date_naive();
        let mut records = Vec::with_capacity(limit);
        for offset in 0..RECENT_LOOKBACK_DAYS {
            if records.len() >= limit {
                break;
            }
            let Some(day) = today.checked_sub_days(Days::new(offset)) else {
                break;
            };
            let remaining = limit - records.len();
            records.extend(self.list_for_day(day, remaining).await?);
        }
        Ok(records)
    }
}

#[async_trait]
impl CallRecordStore for ScyllaCallLogStore {
    async fn store(&self, record: &CallRecord) -> receptionist_core::Result<()> {
        self.insert(record).await.map_err(Into::into)
    }

    async fn recent(&self, limit: usize) -> receptionist_core::Result<Vec<CallRecord>> {
        self.list_recent(limit).await.map_err(Into::into)
    }

    fn backend_name(&self) -> &str {
        "scylla"
    }
}

/// Partition key: the UTC day of the call
fn log_date(created_at: DateTime<Utc>) -> String {
    created_at.date_naive().to_string()
}

fn row_to_record(row: scylla::frame::response::result::Row) -> Result<CallRecord, PersistenceError> {
    let (call_id, caller_id, transcript, detected_intent, duration_secs, created_at): (
        String,
        String,
        String,
        String,
        i64,
        i64,
    ) = row
        .into_typed()
        .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

    Ok(CallRecord {
        call_id,
        caller_id,
        transcript,
        detected_intent,
        duration_secs: u64::try_from(duration_secs).unwrap_or(0),
        created_at: DateTime::from_timestamp_millis(created_at).ok_or_else(|| {
            PersistenceError::InvalidData(format!("invalid created_at: {}", created_at))
        })?,
    })
}
