//! Play driver: turns delivered play tasks into results.
//!
//! For each task the driver creates the initial result, asks the injected
//! [`LevelPlayer`] to play the level and records the outcome, which in turn
//! schedules the next level. Delivery is at-least-once; a duplicate delivery
//! produces another result for the same level.
//!
//! Tasks arrive either through the in-process [`PlayReceiver`] (`run`,
//! `run_until`) or from a durable [`PlayQueue`] (`drain_queue`), where a task
//! is acked only once its result reached a terminal status.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ladder_state::{Game, GameId, LevelMap, PlayQueue, PlayTask, ScheduledTask, TaskId};
use serde::Serialize;
use tracing::{info, warn};

use crate::dispatch::PlayReceiver;
use crate::domain::{LadderError, PlayOutcome, Result, TransitionOutcome};
use crate::lifecycle::ResultEngine;
use crate::metrics::METRICS;

/// The agent under evaluation.
#[async_trait]
pub trait LevelPlayer: Send + Sync {
    /// Play `map` for `game`. `Err` carries the message stored on the failed
    /// result.
    async fn play(&self, game: &Game, map: &LevelMap) -> std::result::Result<PlayOutcome, String>;
}

/// Counters of one `run` or `drain_queue`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriverSummary {
    /// Tasks taken off the receiver or queue.
    pub handled: usize,
    /// Tasks whose handling returned an error.
    pub failed_tasks: usize,
    /// Transitions that ended a game's chain.
    pub runs_completed: usize,
}

pub struct PlayDriver {
    engine: Arc<ResultEngine>,
    player: Arc<dyn LevelPlayer>,
}

impl PlayDriver {
    pub fn new(engine: Arc<ResultEngine>, player: Arc<dyn LevelPlayer>) -> Self {
        Self { engine, player }
    }

    pub fn engine(&self) -> &Arc<ResultEngine> {
        &self.engine
    }

    /// Schedule the first level of a game.
    pub async fn start_game(&self, game_id: &GameId) -> Result<TaskId> {
        self.engine.schedule_first_level(game_id).await
    }

    /// Play one delivered task to a terminal result.
    pub async fn handle(&self, task: &PlayTask) -> Result<TransitionOutcome> {
        let game = self
            .engine
            .game(&task.game_id)
            .await?
            .ok_or_else(|| LadderError::GameNotFound(task.game_id.clone()))?;

        let result_id = self
            .engine
            .create_initial_result(&game.id, task.level)
            .await?;

        let Some(map) = self.engine.catalog.map_for_level(task.level).await? else {
            let missing = LadderError::MapNotFound { level: task.level };
            return self
                .engine
                .fail_result(&result_id, &missing.to_string())
                .await;
        };

        match self.player.play(&game, &map).await {
            Ok(outcome) => {
                self.engine
                    .update_result(&result_id, outcome.is_win, outcome.reasoning, outcome.map)
                    .await
            }
            Err(message) => self.engine.fail_result(&result_id, &message).await,
        }
    }

    /// Handle tasks until the receiver closes.
    pub async fn run(&self, receiver: &mut PlayReceiver) -> DriverSummary {
        self.drive(receiver, None).await
    }

    /// Handle tasks until `runs` game chains have completed or the receiver
    /// closes.
    pub async fn run_until(&self, receiver: &mut PlayReceiver, runs: usize) -> DriverSummary {
        self.drive(receiver, Some(runs)).await
    }

    /// Handle every due task of `queue`, acking each one whose handling
    /// succeeded. Repeats until a pass acks nothing, so levels scheduled
    /// without delay are played in the same call.
    ///
    /// A task whose handling fails stays pending and is not retried before
    /// the next call.
    pub async fn drain_queue(&self, queue: &dyn PlayQueue) -> DriverSummary {
        let mut summary = DriverSummary::default();
        let mut failed: HashSet<TaskId> = HashSet::new();

        loop {
            let due = match queue.due_tasks(Utc::now()).await {
                Ok(due) => due,
                Err(err) => {
                    warn!(error = %err, "reading play queue failed");
                    break;
                }
            };

            let mut acked = 0;
            for scheduled in &due {
                if failed.contains(&scheduled.task_id) {
                    continue;
                }
                if !self.deliver(scheduled, &mut summary).await {
                    failed.insert(scheduled.task_id.clone());
                    continue;
                }
                match queue.ack_task(&scheduled.task_id).await {
                    Ok(()) => acked += 1,
                    Err(err) => {
                        warn!(task_id = %scheduled.task_id, error = %err, "ack failed");
                        failed.insert(scheduled.task_id.clone());
                    }
                }
            }

            if acked == 0 {
                break;
            }
        }

        finish(&summary);
        summary
    }

    async fn drive(&self, receiver: &mut PlayReceiver, stop_after: Option<usize>) -> DriverSummary {
        let mut summary = DriverSummary::default();
        if stop_after == Some(0) {
            finish(&summary);
            return summary;
        }

        while let Some(scheduled) = receiver.recv().await {
            self.deliver(&scheduled, &mut summary).await;
            if stop_after.is_some_and(|n| summary.runs_completed >= n) {
                break;
            }
        }

        finish(&summary);
        summary
    }

    /// Handle one task and count it. Returns whether handling succeeded.
    async fn deliver(&self, scheduled: &ScheduledTask, summary: &mut DriverSummary) -> bool {
        summary.handled += 1;
        match self.handle(&scheduled.payload).await {
            Ok(outcome) => {
                if outcome.next.is_run_complete() {
                    summary.runs_completed += 1;
                }
                true
            }
            Err(err) => {
                summary.failed_tasks += 1;
                warn!(
                    task_id = %scheduled.task_id,
                    game_id = %scheduled.payload.game_id,
                    level = scheduled.payload.level,
                    error = %err,
                    "play task failed"
                );
                false
            }
        }
    }
}

fn finish(summary: &DriverSummary) {
    info!(
        handled = summary.handled,
        failed_tasks = summary.failed_tasks,
        runs_completed = summary.runs_completed,
        "driver stopped"
    );
    METRICS.flush();
}
