//! Values returned by lifecycle operations and read queries.

use ladder_state::{Game, Grid, ResultRecord, TaskId};
use serde::{Deserialize, Serialize};

/// What the chain does after an attempt ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NextAttempt {
    /// A play task for `level` was enqueued.
    Scheduled { task_id: TaskId, level: u32 },
    /// The finished attempt was at (or past) the last level.
    RunComplete,
}

impl NextAttempt {
    pub fn is_run_complete(&self) -> bool {
        matches!(self, NextAttempt::RunComplete)
    }
}

/// Result of a terminal transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    /// The record after the status patch.
    pub result: ResultRecord,
    pub next: NextAttempt,
}

/// A completed result joined with its game. `game` is `None` when the game
/// no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultWithGame {
    #[serde(flatten)]
    pub result: ResultRecord,
    pub game: Option<Game>,
}

/// What an agent reports after playing a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayOutcome {
    pub is_win: bool,
    pub reasoning: String,
    /// Board at the end of play.
    pub map: Grid,
}
