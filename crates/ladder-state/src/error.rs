//! Error types for ladder-state

use thiserror::Error;

/// Errors that can occur while connecting to or preparing the database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

/// Errors returned by the storage and collaborator traits
#[derive(Error, Debug)]
pub enum StorageError {
    /// No result with this ID
    #[error("result not found: {result_id}")]
    ResultNotFound { result_id: String },

    /// No game with this ID
    #[error("game not found: {game_id}")]
    GameNotFound { game_id: String },

    /// No queued task with this ID
    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },

    /// Compare-and-set patch lost against a concurrent writer
    #[error("version conflict on result {result_id}: expected {expected}, found {actual}")]
    VersionConflict {
        result_id: String,
        expected: u64,
        actual: u64,
    },

    /// Payload could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Underlying backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<StateError> for StorageError {
    fn from(err: StateError) -> Self {
        StorageError::Backend(err.to_string())
    }
}
