//! Schema definitions for Ladder SurrealDB tables
//!
//! Tables:
//! - games: One benchmark run per evaluated model
//! - results: Play attempts (one row per level attempt)
//! - maps: Level catalog
//! - rankings: Per-model, per-level win/loss tallies
//! - scores: Per-model win counters
//! - play_tasks: Durable queue of deferred "play level" tasks
//!
//! Rows convert to and from the `storage_traits` types at the boundary.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collaborators::{PlayTask, ScheduledTask, TaskId, TaskStatus};
use crate::error::StorageError;
use crate::storage_traits::{
    Game, GameId, Grid, LevelMap, ResultId, ResultPatch, ResultRecord, ResultStatus,
    StorageResult,
};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let sd = SurrealDatetime::from(*d);
                serde::Serialize::serialize(&Some(sd), serializer)
            }
            None => serde::Serialize::serialize(&None::<SurrealDatetime>, serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

// ---------------------------------------------------------------------------
// games
// ---------------------------------------------------------------------------

/// Game row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Unique game ID (UUID string)
    pub game_id: String,
    /// Model under evaluation
    pub model_id: String,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<&Game> for GameRow {
    fn from(game: &Game) -> Self {
        GameRow {
            id: None,
            game_id: game.id.0.clone(),
            model_id: game.model_id.clone(),
            created_at: game.created_at,
        }
    }
}

impl From<GameRow> for Game {
    fn from(row: GameRow) -> Self {
        Game {
            id: GameId(row.game_id),
            model_id: row.model_id,
            created_at: row.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// results
// ---------------------------------------------------------------------------

/// Result row - one play attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Unique result ID (UUID string)
    pub result_id: String,
    /// Owning game ID
    pub game_id: String,
    pub level: u32,
    /// "inProgress" | "completed" | "failed"
    pub status: String,
    pub is_win: bool,
    pub reasoning: String,
    pub map: Grid,
    pub error: Option<String>,
    /// Compare-and-set counter
    pub version: u64,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "surreal_datetime_opt")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<&ResultRecord> for ResultRow {
    fn from(record: &ResultRecord) -> Self {
        ResultRow {
            id: None,
            result_id: record.id.0.clone(),
            game_id: record.game_id.0.clone(),
            level: record.level,
            status: record.status.as_str().to_string(),
            is_win: record.is_win,
            reasoning: record.reasoning.clone(),
            map: record.map.clone(),
            error: record.error.clone(),
            version: record.version,
            created_at: record.created_at,
            finished_at: record.finished_at,
        }
    }
}

impl TryFrom<ResultRow> for ResultRecord {
    type Error = StorageError;

    fn try_from(row: ResultRow) -> StorageResult<Self> {
        Ok(ResultRecord {
            id: ResultId(row.result_id),
            game_id: GameId(row.game_id),
            level: row.level,
            status: ResultStatus::from_str(&row.status)?,
            is_win: row.is_win,
            reasoning: row.reasoning,
            map: row.map,
            error: row.error,
            version: row.version,
            created_at: row.created_at,
            finished_at: row.finished_at,
        })
    }
}

/// `MERGE` document for a versioned result patch. Unset fields are omitted so
/// they keep their stored value.
#[derive(Debug, Clone, Serialize)]
pub struct ResultPatchRow {
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_win: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<Grid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "surreal_datetime_opt"
    )]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ResultPatchRow {
    /// Build the merge document that moves a row from `expected_version` to
    /// the next version.
    pub fn new(patch: ResultPatch, expected_version: u64) -> Self {
        ResultPatchRow {
            version: expected_version + 1,
            status: patch.status.map(|s| s.as_str().to_string()),
            is_win: patch.is_win,
            reasoning: patch.reasoning,
            map: patch.map,
            error: patch.error,
            finished_at: patch.finished_at,
        }
    }
}

// ---------------------------------------------------------------------------
// maps
// ---------------------------------------------------------------------------

/// Level map row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    pub level: u32,
    pub layout: Grid,
}

impl From<&LevelMap> for MapRow {
    fn from(map: &LevelMap) -> Self {
        MapRow {
            id: None,
            level: map.level,
            layout: map.layout.clone(),
        }
    }
}

impl From<MapRow> for LevelMap {
    fn from(row: MapRow) -> Self {
        LevelMap::new(row.level, row.layout)
    }
}

// ---------------------------------------------------------------------------
// rankings / scores
// ---------------------------------------------------------------------------

/// Win/loss tally of one model on one level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTally {
    pub model_id: String,
    pub level: u32,
    #[serde(default)]
    pub wins: u64,
    #[serde(default)]
    pub losses: u64,
}

/// Total wins of one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelScore {
    pub model_id: String,
    #[serde(default)]
    pub score: u64,
}

// ---------------------------------------------------------------------------
// play_tasks
// ---------------------------------------------------------------------------

/// Queued play task row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayTaskRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Unique task ID (UUID string)
    pub task_id: String,
    pub game_id: String,
    pub model_id: String,
    pub level: u32,
    /// "pending" | "acked"
    pub status: String,
    #[serde(with = "surreal_datetime")]
    pub run_at: DateTime<Utc>,
}

impl From<&ScheduledTask> for PlayTaskRow {
    fn from(task: &ScheduledTask) -> Self {
        PlayTaskRow {
            id: None,
            task_id: task.task_id.0.clone(),
            game_id: task.payload.game_id.0.clone(),
            model_id: task.payload.model_id.clone(),
            level: task.payload.level,
            status: task_status_str(task.status).to_string(),
            run_at: task.run_at,
        }
    }
}

impl TryFrom<PlayTaskRow> for ScheduledTask {
    type Error = StorageError;

    fn try_from(row: PlayTaskRow) -> StorageResult<Self> {
        let status = match row.status.as_str() {
            "pending" => TaskStatus::Pending,
            "acked" => TaskStatus::Acked,
            other => {
                return Err(StorageError::Serialization(format!(
                    "unknown task status: {other}"
                )))
            }
        };
        Ok(ScheduledTask {
            task_id: TaskId(row.task_id),
            payload: PlayTask {
                game_id: GameId(row.game_id),
                model_id: row.model_id,
                level: row.level,
            },
            run_at: row.run_at,
            status,
        })
    }
}

pub(crate) fn task_status_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Acked => "acked",
    }
}
