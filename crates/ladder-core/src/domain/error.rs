//! Domain-level error taxonomy for Ladder.

use ladder_state::{GameId, ResultId, ResultStatus, StorageError};

/// Ladder domain errors.
#[derive(Debug, thiserror::Error)]
pub enum LadderError {
    #[error("result not found: {0}")]
    ResultNotFound(ResultId),

    #[error("game not found: {0}")]
    GameNotFound(GameId),

    /// The catalog goes past this result's level but has a gap right after it.
    #[error("next map not found: level {level}")]
    NextMapNotFound { level: u32 },

    #[error("map not found: level {level}")]
    MapNotFound { level: u32 },

    #[error("level catalog is empty")]
    EmptyCatalog,

    /// Transition attempted on a result that already finished.
    #[error("result {result_id} is already {status}")]
    Precondition {
        result_id: ResultId,
        status: ResultStatus,
    },

    #[error("invalid level: {0} (levels start at 1)")]
    InvalidLevel(u32),

    #[error("concurrent update: {0}")]
    Conflict(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl LadderError {
    /// Whether this is one of the "something expected is missing" errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LadderError::ResultNotFound(_)
                | LadderError::GameNotFound(_)
                | LadderError::NextMapNotFound { .. }
                | LadderError::MapNotFound { .. }
        )
    }
}

impl From<StorageError> for LadderError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ResultNotFound { result_id } => {
                LadderError::ResultNotFound(ResultId(result_id))
            }
            StorageError::GameNotFound { game_id } => LadderError::GameNotFound(GameId(game_id)),
            conflict @ StorageError::VersionConflict { .. } => {
                LadderError::Conflict(conflict.to_string())
            }
            other => LadderError::Storage(other),
        }
    }
}

/// Result type for Ladder domain operations.
pub type Result<T> = std::result::Result<T, LadderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_display_names_status() {
        let err = LadderError::Precondition {
            result_id: ResultId("r-1".to_string()),
            status: ResultStatus::Completed,
        };
        assert_eq!(err.to_string(), "result r-1 is already completed");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_storage_not_found_maps_to_domain() {
        let err = LadderError::from(StorageError::ResultNotFound {
            result_id: "r-9".to_string(),
        });
        assert!(matches!(err, LadderError::ResultNotFound(ref id) if id.0 == "r-9"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_version_conflict_maps_to_conflict() {
        let err = LadderError::from(StorageError::VersionConflict {
            result_id: "r-2".to_string(),
            expected: 1,
            actual: 2,
        });
        match err {
            LadderError::Conflict(msg) => assert!(msg.contains("r-2")),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_backend_error_stays_storage() {
        let err = LadderError::from(StorageError::Backend("socket closed".to_string()));
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("socket closed"));
    }
}
