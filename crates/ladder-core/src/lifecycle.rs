//! Result lifecycle engine.
//!
//! A result is created `InProgress` and moves exactly once to `Completed` or
//! `Failed`. Every terminal transition then hands the chain on to the next
//! level through the [`PlayScheduler`].
//!
//! Ordering of a transition:
//! 1. load the record and require `InProgress`
//! 2. decide the next step (game lookup, catalog read, next-map check)
//! 3. compare-and-set the status patch on the record's version
//! 4. side effects: rankings, score (wins only), enqueue
//!
//! Everything that can be rejected is rejected before step 3. Failures in
//! step 4 are logged and returned; the stored status is not rolled back.

use std::sync::Arc;

use ladder_state::{
    GameId, GameStore, Grid, LevelCatalog, PlayScheduler, RankingBoard, ResultId, ResultPatch,
    ResultRecord, ResultStore, ScoreBoard,
};
use tracing::debug;

use crate::config::EngineConfig;
use crate::domain::{LadderError, Result, TransitionOutcome};
use crate::metrics::METRICS;
use crate::obs;
use crate::scheduling::plan_next;

/// Drives results through their lifecycle against injected collaborators.
pub struct ResultEngine {
    pub(crate) results: Arc<dyn ResultStore>,
    pub(crate) games: Arc<dyn GameStore>,
    pub(crate) catalog: Arc<dyn LevelCatalog>,
    pub(crate) rankings: Arc<dyn RankingBoard>,
    pub(crate) scores: Arc<dyn ScoreBoard>,
    pub(crate) scheduler: Arc<dyn PlayScheduler>,
    pub(crate) config: EngineConfig,
}

impl ResultEngine {
    pub fn new(
        results: Arc<dyn ResultStore>,
        games: Arc<dyn GameStore>,
        catalog: Arc<dyn LevelCatalog>,
        rankings: Arc<dyn RankingBoard>,
        scores: Arc<dyn ScoreBoard>,
        scheduler: Arc<dyn PlayScheduler>,
    ) -> Self {
        Self {
            results,
            games,
            catalog,
            rankings,
            scores,
            scheduler,
            config: EngineConfig::default(),
        }
    }

    /// Build an engine whose storage and leaderboard are one backend (e.g.
    /// `SurrealStore`), with a separate scheduler.
    pub fn from_store<S>(store: Arc<S>, scheduler: Arc<dyn PlayScheduler>) -> Self
    where
        S: ResultStore + GameStore + LevelCatalog + RankingBoard + ScoreBoard + 'static,
    {
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            scheduler,
        )
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Insert a fresh `InProgress` result for `level` of `game_id`.
    ///
    /// The game is not looked up here.
    pub async fn create_initial_result(&self, game_id: &GameId, level: u32) -> Result<ResultId> {
        if level == 0 {
            return Err(LadderError::InvalidLevel(level));
        }
        let record = ResultRecord::in_progress(game_id.clone(), level);
        let result_id = self.results.insert_result(record).await?;

        METRICS.inc_results_created();
        obs::emit_result_created(&result_id, game_id, level);
        Ok(result_id)
    }

    /// Mark an attempt as failed and schedule the next level anyway.
    #[tracing::instrument(name = "ladder.result", skip_all, fields(result_id = %result_id))]
    pub async fn fail_result(
        &self,
        result_id: &ResultId,
        error_message: &str,
    ) -> Result<TransitionOutcome> {
        let record = self.load_in_progress(result_id).await?;
        let (_game, step) = plan_next(&*self.games, &*self.catalog, &record).await?;

        let patch = ResultPatch::failed(error_message.to_string());
        let result = self
            .results
            .patch_result(result_id, record.version, patch)
            .await?;
        METRICS.inc_results_failed();
        obs::emit_result_failed(result_id, result.level, error_message);

        let next = self
            .after_patch(result_id, "schedule", self.carry_out(&result.game_id, step))
            .await?;
        Ok(TransitionOutcome { result, next })
    }

    /// Record the outcome of an attempt, update the leaderboard and schedule
    /// the next level.
    #[tracing::instrument(name = "ladder.result", skip_all, fields(result_id = %result_id))]
    pub async fn update_result(
        &self,
        result_id: &ResultId,
        is_win: bool,
        reasoning: String,
        map: Grid,
    ) -> Result<TransitionOutcome> {
        let record = self.load_in_progress(result_id).await?;
        let (game, step) = plan_next(&*self.games, &*self.catalog, &record).await?;

        let patch = ResultPatch::completed(is_win, reasoning, map);
        let result = self
            .results
            .patch_result(result_id, record.version, patch)
            .await?;
        METRICS.inc_results_completed();
        obs::emit_result_completed(result_id, result.level, is_win);

        self.after_patch(
            result_id,
            "rankings",
            async {
                self.rankings
                    .update_rankings(&game.model_id, result.level, is_win)
                    .await
                    .map_err(LadderError::from)
            },
        )
        .await?;

        if is_win {
            self.after_patch(result_id, "score", async {
                self.scores
                    .increment_score(&game.model_id)
                    .await
                    .map_err(LadderError::from)
            })
            .await?;
        }

        let next = self
            .after_patch(result_id, "schedule", self.carry_out(&game.id, step))
            .await?;
        Ok(TransitionOutcome { result, next })
    }

    /// Fetch a result that may still transition.
    async fn load_in_progress(&self, result_id: &ResultId) -> Result<ResultRecord> {
        let record = self
            .results
            .get_result(result_id)
            .await?
            .ok_or_else(|| LadderError::ResultNotFound(result_id.clone()))?;

        if record.status.is_terminal() {
            debug!(status = %record.status, "transition rejected");
            return Err(LadderError::Precondition {
                result_id: result_id.clone(),
                status: record.status,
            });
        }
        Ok(record)
    }

    /// Run a side effect of an already-stored transition, logging a failure
    /// before returning it.
    async fn after_patch<T>(
        &self,
        result_id: &ResultId,
        stage: &str,
        effect: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        effect.await.inspect_err(|err| {
            obs::emit_side_effect_error(result_id, stage, err);
        })
    }
}
