//! Storage trait definitions for Ladder
//!
//! These traits define the core storage abstractions:
//! - `ResultStore`: Play-attempt persistence (insert, get, versioned patch, queries)
//! - `GameStore`: Benchmark runs, one per evaluated model
//! - `LevelCatalog`: Level maps, the upper bound of a run
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A board as rows of cell labels.
pub type Grid = Vec<Vec<String>>;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a play attempt
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultId(pub String);

impl ResultId {
    /// Generate a new random ResultId
    pub fn new() -> Self {
        ResultId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ResultId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a game (one benchmark run of one model)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(pub String);

impl GameId {
    /// Generate a new random GameId
    pub fn new() -> Self {
        GameId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

/// One benchmark run for one evaluated model. Never mutated by Ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub model_id: String,
    pub created_at: DateTime<Utc>,
}

/// Game lookup. Games are owned by whoever starts a benchmark run; `create_game`
/// exists so fakes, tooling and tests can seed them.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Register a new game for `model_id`.
    async fn create_game(&self, model_id: &str) -> StorageResult<Game>;

    /// Fetch a game by ID. Returns `None` if absent.
    async fn get_game(&self, game_id: &GameId) -> StorageResult<Option<Game>>;
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Status of a play attempt.
///
/// Transitions are one-way: `InProgress → Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultStatus {
    InProgress,
    Completed,
    Failed,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::InProgress => "inProgress",
            ResultStatus::Completed => "completed",
            ResultStatus::Failed => "failed",
        }
    }

    /// Whether no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResultStatus::InProgress)
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inProgress" => Ok(ResultStatus::InProgress),
            "completed" => Ok(ResultStatus::Completed),
            "failed" => Ok(ResultStatus::Failed),
            other => Err(StorageError::Serialization(format!(
                "unknown result status: {other}"
            ))),
        }
    }
}

/// One attempt at one level within one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: ResultId,
    pub game_id: GameId,
    pub level: u32,
    pub status: ResultStatus,
    /// Meaningful only once `status` is `Completed`.
    pub is_win: bool,
    pub reasoning: String,
    /// Board at the end of the attempt.
    pub map: Grid,
    /// Set only on failure.
    pub error: Option<String>,
    /// Bumped by every successful patch.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ResultRecord {
    /// A fresh attempt: in progress, not a win, empty reasoning and map.
    pub fn in_progress(game_id: GameId, level: u32) -> Self {
        Self {
            id: ResultId::new(),
            game_id,
            level,
            status: ResultStatus::InProgress,
            is_win: false,
            reasoning: String::new(),
            map: Vec::new(),
            error: None,
            version: 1,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Partial update of a result. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPatch {
    pub status: Option<ResultStatus>,
    pub is_win: Option<bool>,
    pub reasoning: Option<String>,
    pub map: Option<Grid>,
    pub error: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ResultPatch {
    /// Patch for `InProgress → Completed`.
    pub fn completed(is_win: bool, reasoning: String, map: Grid) -> Self {
        Self {
            status: Some(ResultStatus::Completed),
            is_win: Some(is_win),
            reasoning: Some(reasoning),
            map: Some(map),
            error: None,
            finished_at: Some(Utc::now()),
        }
    }

    /// Patch for `InProgress → Failed`.
    pub fn failed(error: String) -> Self {
        Self {
            status: Some(ResultStatus::Failed),
            error: Some(error),
            finished_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Apply the set fields onto `record` and bump its version.
    pub fn apply_to(&self, record: &mut ResultRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(is_win) = self.is_win {
            record.is_win = is_win;
        }
        if let Some(reasoning) = &self.reasoning {
            record.reasoning = reasoning.clone();
        }
        if let Some(map) = &self.map {
            record.map = map.clone();
        }
        if let Some(error) = &self.error {
            record.error = Some(error.clone());
        }
        if let Some(finished_at) = self.finished_at {
            record.finished_at = Some(finished_at);
        }
        record.version += 1;
    }
}

/// Play-attempt persistence.
///
/// Guarantees:
/// - `insert_result` stores the record as given and returns its ID.
/// - `patch_result` is a compare-and-set on `version`: it fails with
///   `StorageError::VersionConflict` when the stored version differs, and
///   with `StorageError::ResultNotFound` when the ID is unknown.
/// - `recent_by_status` returns newest first by insertion order.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert a new result, returning its ID.
    async fn insert_result(&self, record: ResultRecord) -> StorageResult<ResultId>;

    /// Fetch a result by ID. Returns `None` if absent.
    async fn get_result(&self, result_id: &ResultId) -> StorageResult<Option<ResultRecord>>;

    /// Patch fields of a result whose version equals `expected_version`,
    /// returning the updated record.
    async fn patch_result(
        &self,
        result_id: &ResultId,
        expected_version: u64,
        patch: ResultPatch,
    ) -> StorageResult<ResultRecord>;

    /// All results of a game, in no particular order.
    async fn results_for_game(&self, game_id: &GameId) -> StorageResult<Vec<ResultRecord>>;

    /// Up to `limit` results with `status`, newest first.
    async fn recent_by_status(
        &self,
        status: ResultStatus,
        limit: usize,
    ) -> StorageResult<Vec<ResultRecord>>;
}

// ---------------------------------------------------------------------------
// LevelCatalog
// ---------------------------------------------------------------------------

/// Definition of one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelMap {
    pub level: u32,
    pub layout: Grid,
}

impl LevelMap {
    pub fn new(level: u32, layout: Grid) -> Self {
        Self { level, layout }
    }
}

/// Read access to the defined levels. The highest `level` is the last one.
#[async_trait]
pub trait LevelCatalog: Send + Sync {
    /// Map for `level`, or `None` if the catalog has no such level.
    async fn map_for_level(&self, level: u32) -> StorageResult<Option<LevelMap>>;

    /// Every defined map.
    async fn list_maps(&self) -> StorageResult<Vec<LevelMap>>;
}
