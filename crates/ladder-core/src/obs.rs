//! Structured observability hooks for the result lifecycle.
//!
//! This module provides:
//! - Emission functions for lifecycle events: created, completed, failed,
//!   next attempt scheduled, run complete, side-effect failure
//!
//! Transitions run inside a `ladder.result` span carrying `result_id`
//! (see `ResultEngine::fail_result`).
//!
//! Events are emitted at `info!` level (filter with `LADDER_LOG`).
//! For JSON output, set `LADDER_LOG_FORMAT=json`.

use ladder_state::{GameId, ResultId, TaskId};
use tracing::{info, warn};

pub fn emit_result_created(result_id: &ResultId, game_id: &GameId, level: u32) {
    info!(event = "result.created", result_id = %result_id, game_id = %game_id, level = level);
}

pub fn emit_result_completed(result_id: &ResultId, level: u32, is_win: bool) {
    info!(
        event = "result.completed",
        result_id = %result_id,
        level = level,
        is_win = is_win,
    );
}

pub fn emit_result_failed(result_id: &ResultId, level: u32, error: &str) {
    info!(event = "result.failed", result_id = %result_id, level = level, error = %error);
}

/// Emit event: a play task for the next level was enqueued.
pub fn emit_attempt_scheduled(game_id: &GameId, level: u32, task_id: &TaskId) {
    info!(
        event = "attempt.scheduled",
        game_id = %game_id,
        level = level,
        task_id = %task_id,
    );
}

/// Emit event: the chain for a game reached the last level.
pub fn emit_run_complete(game_id: &GameId, last_level: u32) {
    info!(event = "game.run_complete", game_id = %game_id, last_level = last_level);
}

/// Emit event: a side effect failed after the status patch was stored
/// (warning level). The result stays terminal without that side effect.
pub fn emit_side_effect_error(result_id: &ResultId, stage: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "transition.side_effect_error",
        result_id = %result_id,
        stage = stage,
        error = %error,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscriber() {
        let result_id = ResultId("r-1".to_string());
        emit_result_created(&result_id, &GameId("g".to_string()), 1);
        emit_side_effect_error(&result_id, "rankings", &"board offline");
    }
}
