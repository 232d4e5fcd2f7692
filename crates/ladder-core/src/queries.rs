//! Read queries over results.

use futures::future::try_join_all;
use ladder_state::{Game, GameId, ResultRecord, ResultStatus};

use crate::config::LAST_COMPLETED_LIMIT;
use crate::domain::{Result, ResultWithGame};
use crate::lifecycle::ResultEngine;

impl ResultEngine {
    /// Every result of a game, highest level first.
    pub async fn get_results(&self, game_id: &GameId) -> Result<Vec<ResultRecord>> {
        let mut results = self.results.results_for_game(game_id).await?;
        results.sort_by(|a, b| b.level.cmp(&a.level));
        Ok(results)
    }

    /// The most recent completed results, newest first, each with its game.
    pub async fn get_last_completed_results(&self) -> Result<Vec<ResultWithGame>> {
        let limit = self.config.recent_limit.min(LAST_COMPLETED_LIMIT);
        let results = self
            .results
            .recent_by_status(ResultStatus::Completed, limit)
            .await?;

        let games = try_join_all(results.iter().map(|r| self.games.get_game(&r.game_id))).await?;

        Ok(results
            .into_iter()
            .zip(games)
            .map(|(result, game)| ResultWithGame { result, game })
            .collect())
    }

    /// Look up a game.
    pub async fn game(&self, game_id: &GameId) -> Result<Option<Game>> {
        Ok(self.games.get_game(game_id).await?)
    }
}
