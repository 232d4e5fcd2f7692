//! Side-effect collaborators of a finished attempt
//!
//! - `RankingBoard`: per-model, per-level leaderboard updates
//! - `ScoreBoard`: per-model win counter
//! - `PlayScheduler`: deferred "play this level" tasks with at-least-once delivery
//! - `PlayQueue`: consumer side of a durable scheduler

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage_traits::{GameId, StorageResult};

/// Leaderboard update hook.
#[async_trait]
pub trait RankingBoard: Send + Sync {
    /// Record the outcome of `model_id` on `level`.
    async fn update_rankings(&self, model_id: &str, level: u32, is_win: bool)
        -> StorageResult<()>;
}

/// Score counter hook.
#[async_trait]
pub trait ScoreBoard: Send + Sync {
    /// Add one win to `model_id`.
    async fn increment_score(&self, model_id: &str) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// Deferred play tasks
// ---------------------------------------------------------------------------

/// Identifier of an enqueued task
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        TaskId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payload of a deferred "play the next level" task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayTask {
    pub game_id: GameId,
    pub model_id: String,
    pub level: u32,
}

/// Delivery state of a queued task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Acked,
}

/// A task as held by a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: TaskId,
    pub payload: PlayTask,
    /// Earliest time the task may run.
    pub run_at: DateTime<Utc>,
    pub status: TaskStatus,
}

impl ScheduledTask {
    /// A pending task due `delay` from now. Delays past the representable
    /// range saturate to the latest timestamp.
    pub fn pending(payload: PlayTask, delay: Duration) -> Self {
        Self {
            task_id: TaskId::new(),
            payload,
            run_at: due_at(Utc::now(), delay),
            status: TaskStatus::Pending,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Pending && self.run_at <= now
    }
}

fn due_at(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| now.checked_add_signed(delay))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Deferred task submission.
///
/// Guarantees:
/// - `run_after` returns once the task is durably enqueued (or handed to the
///   dispatcher); it never runs the task inline.
/// - Delivery is at-least-once, no earlier than `delay` after submission.
#[async_trait]
pub trait PlayScheduler: Send + Sync {
    /// Enqueue `task` to run after `delay`.
    async fn run_after(&self, delay: Duration, task: PlayTask) -> StorageResult<TaskId>;
}

/// Consumer side of a durable scheduler.
///
/// A task stays pending until acked, so a worker that dies between
/// `due_tasks` and `ack_task` gets it again on the next read.
#[async_trait]
pub trait PlayQueue: Send + Sync {
    /// Pending tasks with `run_at <= now`, oldest first.
    async fn due_tasks(&self, now: DateTime<Utc>) -> StorageResult<Vec<ScheduledTask>>;

    /// Mark a task as done.
    async fn ack_task(&self, task_id: &TaskId) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> PlayTask {
        PlayTask {
            game_id: GameId::new(),
            model_id: "model-a".to_string(),
            level: 2,
        }
    }

    #[test]
    fn pending_task_is_due_after_delay() {
        let before = Utc::now();
        let scheduled = ScheduledTask::pending(task(), Duration::from_secs(30));
        assert!(scheduled.run_at >= before + chrono::Duration::seconds(30));
        assert!(!scheduled.is_due(before));
        assert!(scheduled.is_due(scheduled.run_at));
    }

    #[test]
    fn huge_delay_saturates_instead_of_running_now() {
        let scheduled = ScheduledTask::pending(task(), Duration::MAX);
        assert_eq!(scheduled.run_at, DateTime::<Utc>::MAX_UTC);
        assert!(!scheduled.is_due(Utc::now()));
    }

    #[test]
    fn delay_past_the_calendar_saturates() {
        let now = Utc::now();
        let ten_million_years = Duration::from_secs(60 * 60 * 24 * 365 * 10_000_000);
        assert_eq!(due_at(now, ten_million_years), DateTime::<Utc>::MAX_UTC);
    }
}
