//! Persistence errors

use scylla::transport::errors::{NewSessionError, QueryError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<NewSessionError> for PersistenceError {
    fn from(e: NewSessionError) -> Self {
        Self::Connection(e.to_string())
    }
}

impl From<QueryError> for PersistenceError {
    fn from(e: QueryError) -> Self {
        Self::Query(e.to_string())
    }
}

impl From<PersistenceError> for receptionist_core::Error {
    fn from(e: PersistenceError) -> Self {
        receptionist_core::Error::PersistenceFailure(e.to_string())
    }
}
