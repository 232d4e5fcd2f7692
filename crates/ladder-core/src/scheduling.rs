//! Next-attempt scheduling.
//!
//! The decision ("is this game done, or which level comes next?") is taken
//! from a fresh read of the level catalog and is split from the enqueue so the
//! engine can decide before it patches a result and enqueue afterwards.

use ladder_state::{Game, GameId, GameStore, LevelCatalog, PlayTask, ResultRecord, TaskId};
use tracing::debug;

use crate::domain::{LadderError, NextAttempt, Result};
use crate::lifecycle::ResultEngine;
use crate::metrics::METRICS;
use crate::obs;

/// Decided continuation of a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// The attempt was at or past the last level.
    RunComplete { last_level: u32 },
    /// Play this task next.
    Play(PlayTask),
}

/// Highest level in the catalog, or 0 when the catalog is empty.
pub async fn last_level(catalog: &dyn LevelCatalog) -> Result<u32> {
    let maps = catalog.list_maps().await?;
    Ok(maps.iter().map(|m| m.level).max().unwrap_or(0))
}

/// Decide what follows `record`.
///
/// 1. The owning game must exist (`GameNotFound`).
/// 2. At or past the last level the run is complete.
/// 3. Otherwise the map for `level + 1` must exist (`NextMapNotFound`);
///    a gap in the catalog is never skipped over.
pub async fn plan_next(
    games: &dyn GameStore,
    catalog: &dyn LevelCatalog,
    record: &ResultRecord,
) -> Result<(Game, NextStep)> {
    let game = games
        .get_game(&record.game_id)
        .await?
        .ok_or_else(|| LadderError::GameNotFound(record.game_id.clone()))?;

    let last_level = last_level(catalog).await?;
    if record.level >= last_level {
        debug!(level = record.level, last_level, "no further levels");
        return Ok((game, NextStep::RunComplete { last_level }));
    }

    let next_level = record.level + 1;
    if catalog.map_for_level(next_level).await?.is_none() {
        return Err(LadderError::NextMapNotFound { level: next_level });
    }

    let task = PlayTask {
        game_id: record.game_id.clone(),
        model_id: game.model_id.clone(),
        level: next_level,
    };
    Ok((game, NextStep::Play(task)))
}

impl ResultEngine {
    /// Carry out a decided step: enqueue the play task, or record that the
    /// game's run is complete.
    pub(crate) async fn carry_out(&self, game_id: &GameId, step: NextStep) -> Result<NextAttempt> {
        match step {
            NextStep::RunComplete { last_level } => {
                obs::emit_run_complete(game_id, last_level);
                Ok(NextAttempt::RunComplete)
            }
            NextStep::Play(task) => {
                let level = task.level;
                let task_id = self.enqueue(task).await?;
                Ok(NextAttempt::Scheduled { task_id, level })
            }
        }
    }

    /// Schedule the first attempt of a game: the lowest level in the catalog.
    pub async fn schedule_first_level(&self, game_id: &GameId) -> Result<TaskId> {
        let game = self
            .games
            .get_game(game_id)
            .await?
            .ok_or_else(|| LadderError::GameNotFound(game_id.clone()))?;

        let first_level = self
            .catalog
            .list_maps()
            .await?
            .iter()
            .map(|m| m.level)
            .min()
            .ok_or(LadderError::EmptyCatalog)?;

        self.enqueue(PlayTask {
            game_id: game.id,
            model_id: game.model_id,
            level: first_level,
        })
        .await
    }

    async fn enqueue(&self, task: PlayTask) -> Result<TaskId> {
        let game_id = task.game_id.clone();
        let level = task.level;
        let task_id = self
            .scheduler
            .run_after(self.config.next_attempt_delay, task)
            .await?;
        METRICS.inc_attempts_scheduled();
        obs::emit_attempt_scheduled(&game_id, level, &task_id);
        Ok(task_id)
    }
}
