//! SurrealDB-backed implementation of every Ladder storage and collaborator
//! trait.
//!
//! Uses the row types in `schema` for persistence, converting to/from
//! `storage_traits` types at the boundary.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::debug;

use crate::collaborators::{
    PlayQueue, PlayScheduler, PlayTask, RankingBoard, ScheduledTask, ScoreBoard, TaskId,
    TaskStatus,
};
use crate::error::StorageError;
use crate::handle::{self, StoreTarget};
use crate::schema::{
    task_status_str, GameRow, LevelTally, MapRow, ModelScore, PlayTaskRow, ResultPatchRow,
    ResultRow,
};
use crate::storage_traits::{
    Game, GameId, GameStore, LevelCatalog, LevelMap, ResultId, ResultPatch, ResultRecord,
    ResultStatus, ResultStore, StorageResult,
};

fn backend(e: surrealdb::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// SurrealDB-backed store for games, results, maps, leaderboard tallies and
/// the durable play-task queue.
#[derive(Clone)]
pub struct SurrealStore {
    db: Surreal<Any>,
}

impl SurrealStore {
    /// Wrap an already prepared connection (namespace selected, schema
    /// initialized).
    pub fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    /// Connect to `target` and initialize the schema.
    pub async fn connect(target: &StoreTarget) -> crate::Result<Self> {
        Ok(Self::new(handle::connect(target).await?))
    }

    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> crate::Result<Self> {
        Self::connect(&StoreTarget::Memory).await
    }

    /// Create from environment variables. See [`StoreTarget::from_env`].
    pub async fn from_env() -> crate::Result<Self> {
        Self::connect(&StoreTarget::from_env()).await
    }

    // -- catalog administration ----------------------------------------------

    /// Insert or replace the map for `map.level`.
    pub async fn put_map(&self, map: &LevelMap) -> StorageResult<()> {
        let row = MapRow::from(map);
        debug!(level = map.level, "storing map");

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE maps WHERE level = $level; \
                 CREATE maps CONTENT $row; \
                 COMMIT TRANSACTION;",
            )
            .bind(("level", map.level))
            .bind(("row", row))
            .await
            .map_err(backend)?
            .check()
            .map_err(backend)?;
        Ok(())
    }

    // -- queue administration ------------------------------------------------

    /// Pending tasks, earliest `run_at` first.
    pub async fn pending_tasks(&self) -> StorageResult<Vec<ScheduledTask>> {
        let mut res = self
            .db
            .query("SELECT * FROM play_tasks WHERE status = 'pending' ORDER BY run_at ASC")
            .await
            .map_err(backend)?;
        let rows: Vec<PlayTaskRow> = res.take(0).map_err(backend)?;
        rows.into_iter().map(ScheduledTask::try_from).collect()
    }

    // -- leaderboard reads ---------------------------------------------------

    /// Every model's score, highest first.
    pub async fn scores(&self) -> StorageResult<Vec<ModelScore>> {
        let mut res = self
            .db
            .query("SELECT model_id, score FROM scores ORDER BY score DESC")
            .await
            .map_err(backend)?;
        res.take(0).map_err(backend)
    }

    /// Per-level tallies, by model then level.
    pub async fn tallies(&self) -> StorageResult<Vec<LevelTally>> {
        let mut res = self
            .db
            .query("SELECT model_id, level, wins, losses FROM rankings ORDER BY model_id, level")
            .await
            .map_err(backend)?;
        res.take(0).map_err(backend)
    }

    // -- private helpers -----------------------------------------------------

    /// Fetch a result row by ID (owned string).
    async fn fetch_result(&self, rid: &str) -> StorageResult<Option<ResultRow>> {
        let rid_owned = rid.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM results WHERE result_id = $rid")
            .bind(("rid", rid_owned))
            .await
            .map_err(backend)?;

        let rows: Vec<ResultRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl GameStore for SurrealStore {
    async fn create_game(&self, model_id: &str) -> StorageResult<Game> {
        let game = Game {
            id: GameId::new(),
            model_id: model_id.to_string(),
            created_at: Utc::now(),
        };
        debug!(game_id = %game.id, model_id = %model_id, "creating game");

        let _created: Option<GameRow> = self
            .db
            .create("games")
            .content(GameRow::from(&game))
            .await
            .map_err(backend)?;
        Ok(game)
    }

    async fn get_game(&self, game_id: &GameId) -> StorageResult<Option<Game>> {
        let gid = game_id.0.clone();
        let mut res = self
            .db
            .query("SELECT * FROM games WHERE game_id = $gid")
            .bind(("gid", gid))
            .await
            .map_err(backend)?;
        let rows: Vec<GameRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next().map(Game::from))
    }
}

#[async_trait]
impl ResultStore for SurrealStore {
    async fn insert_result(&self, record: ResultRecord) -> StorageResult<ResultId> {
        debug!(result_id = %record.id, level = record.level, "inserting result");

        let _created: Option<ResultRow> = self
            .db
            .create("results")
            .content(ResultRow::from(&record))
            .await
            .map_err(backend)?;
        Ok(record.id)
    }

    async fn get_result(&self, result_id: &ResultId) -> StorageResult<Option<ResultRecord>> {
        self.fetch_result(&result_id.0)
            .await?
            .map(ResultRecord::try_from)
            .transpose()
    }

    async fn patch_result(
        &self,
        result_id: &ResultId,
        expected_version: u64,
        patch: ResultPatch,
    ) -> StorageResult<ResultRecord> {
        let merge = ResultPatchRow::new(patch, expected_version);
        let rid_owned = result_id.0.clone();

        let mut res = self
            .db
            .query(
                "UPDATE results MERGE $patch \
                 WHERE result_id = $rid AND version = $expected \
                 RETURN AFTER",
            )
            .bind(("patch", merge))
            .bind(("rid", rid_owned))
            .bind(("expected", expected_version))
            .await
            .map_err(backend)?;
        let rows: Vec<ResultRow> = res.take(0).map_err(backend)?;

        if let Some(row) = rows.into_iter().next() {
            return ResultRecord::try_from(row);
        }

        // Nothing matched: either the row is gone or someone else won the race.
        match self.fetch_result(&result_id.0).await? {
            None => Err(StorageError::ResultNotFound {
                result_id: result_id.0.clone(),
            }),
            Some(current) => Err(StorageError::VersionConflict {
                result_id: result_id.0.clone(),
                expected: expected_version,
                actual: current.version,
            }),
        }
    }

    async fn results_for_game(&self, game_id: &GameId) -> StorageResult<Vec<ResultRecord>> {
        let gid = game_id.0.clone();
        let mut res = self
            .db
            .query("SELECT * FROM results WHERE game_id = $gid")
            .bind(("gid", gid))
            .await
            .map_err(backend)?;
        let rows: Vec<ResultRow> = res.take(0).map_err(backend)?;
        rows.into_iter().map(ResultRecord::try_from).collect()
    }

    async fn recent_by_status(
        &self,
        status: ResultStatus,
        limit: usize,
    ) -> StorageResult<Vec<ResultRecord>> {
        let sql = format!(
            "SELECT * FROM results WHERE status = $status ORDER BY created_at DESC LIMIT {limit}"
        );
        let mut res = self
            .db
            .query(sql)
            .bind(("status", status.as_str()))
            .await
            .map_err(backend)?;
        let rows: Vec<ResultRow> = res.take(0).map_err(backend)?;
        rows.into_iter().map(ResultRecord::try_from).collect()
    }
}

#[async_trait]
impl LevelCatalog for SurrealStore {
    async fn map_for_level(&self, level: u32) -> StorageResult<Option<LevelMap>> {
        let mut res = self
            .db
            .query("SELECT * FROM maps WHERE level = $level")
            .bind(("level", level))
            .await
            .map_err(backend)?;
        let rows: Vec<MapRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next().map(LevelMap::from))
    }

    async fn list_maps(&self) -> StorageResult<Vec<LevelMap>> {
        let mut res = self
            .db
            .query("SELECT * FROM maps ORDER BY level ASC")
            .await
            .map_err(backend)?;
        let rows: Vec<MapRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().map(LevelMap::from).collect())
    }
}

#[async_trait]
impl RankingBoard for SurrealStore {
    async fn update_rankings(
        &self,
        model_id: &str,
        level: u32,
        is_win: bool,
    ) -> StorageResult<()> {
        let (win, loss) = if is_win { (1u64, 0u64) } else { (0, 1) };
        self.db
            .query(
                "UPSERT type::thing('rankings', [$model, $level]) SET \
                 model_id = $model, level = $level, \
                 wins = (wins ?? 0) + $win, losses = (losses ?? 0) + $loss",
            )
            .bind(("model", model_id.to_string()))
            .bind(("level", level))
            .bind(("win", win))
            .bind(("loss", loss))
            .await
            .map_err(backend)?
            .check()
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl ScoreBoard for SurrealStore {
    async fn increment_score(&self, model_id: &str) -> StorageResult<()> {
        self.db
            .query(
                "UPSERT type::thing('scores', $model) SET \
                 model_id = $model, score = (score ?? 0) + 1",
            )
            .bind(("model", model_id.to_string()))
            .await
            .map_err(backend)?
            .check()
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl PlayScheduler for SurrealStore {
    async fn run_after(&self, delay: Duration, task: PlayTask) -> StorageResult<TaskId> {
        let scheduled = ScheduledTask::pending(task, delay);
        debug!(
            task_id = %scheduled.task_id,
            game_id = %scheduled.payload.game_id,
            level = scheduled.payload.level,
            "enqueuing play task"
        );

        let _created: Option<PlayTaskRow> = self
            .db
            .create("play_tasks")
            .content(PlayTaskRow::from(&scheduled))
            .await
            .map_err(backend)?;
        Ok(scheduled.task_id)
    }
}

#[async_trait]
impl PlayQueue for SurrealStore {
    async fn due_tasks(&self, now: DateTime<Utc>) -> StorageResult<Vec<ScheduledTask>> {
        Ok(self
            .pending_tasks()
            .await?
            .into_iter()
            .filter(|t| t.is_due(now))
            .collect())
    }

    /// Fails with `TaskNotFound` for unknown IDs.
    async fn ack_task(&self, task_id: &TaskId) -> StorageResult<()> {
        let tid = task_id.0.clone();
        let mut res = self
            .db
            .query("UPDATE play_tasks SET status = $status WHERE task_id = $tid RETURN AFTER")
            .bind(("status", task_status_str(TaskStatus::Acked)))
            .bind(("tid", tid))
            .await
            .map_err(backend)?;
        let rows: Vec<PlayTaskRow> = res.take(0).map_err(backend)?;
        if rows.is_empty() {
            return Err(StorageError::TaskNotFound {
                task_id: task_id.0.clone(),
            });
        }
        Ok(())
    }
}
