//! In-memory fakes for storage and collaborator traits (testing only)
//!
//! Provides `MemoryResultStore`, `MemoryGameStore`, `MemoryLevelCatalog`,
//! `MemoryRankingBoard`, `MemoryScoreBoard` and `MemoryPlayScheduler` that
//! satisfy the trait contracts without any external dependencies.
//!
//! Collaborator fakes can share a [`Journal`] so tests can assert the order in
//! which side effects happened across them.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::collaborators::*;
use crate::error::StorageError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// Append-only log of collaborator calls, shared between fakes.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

fn injected(failure: &Mutex<Option<String>>) -> StorageResult<()> {
    match failure.lock().unwrap().as_ref() {
        Some(msg) => Err(StorageError::Backend(msg.clone())),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// MemoryResultStore
// ---------------------------------------------------------------------------

/// In-memory result store. The backing `Vec` keeps insertion order.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    results: Mutex<Vec<ResultRecord>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.results.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn insert_result(&self, record: ResultRecord) -> StorageResult<ResultId> {
        let id = record.id.clone();
        self.results.lock().unwrap().push(record);
        Ok(id)
    }

    async fn get_result(&self, result_id: &ResultId) -> StorageResult<Option<ResultRecord>> {
        let results = self.results.lock().unwrap();
        Ok(results.iter().find(|r| r.id == *result_id).cloned())
    }

    async fn patch_result(
        &self,
        result_id: &ResultId,
        expected_version: u64,
        patch: ResultPatch,
    ) -> StorageResult<ResultRecord> {
        let mut results = self.results.lock().unwrap();
        let record = results
            .iter_mut()
            .find(|r| r.id == *result_id)
            .ok_or_else(|| StorageError::ResultNotFound {
                result_id: result_id.0.clone(),
            })?;
        if record.version != expected_version {
            return Err(StorageError::VersionConflict {
                result_id: result_id.0.clone(),
                expected: expected_version,
                actual: record.version,
            });
        }
        patch.apply_to(record);
        Ok(record.clone())
    }

    async fn results_for_game(&self, game_id: &GameId) -> StorageResult<Vec<ResultRecord>> {
        let results = self.results.lock().unwrap();
        Ok(results
            .iter()
            .filter(|r| r.game_id == *game_id)
            .cloned()
            .collect())
    }

    async fn recent_by_status(
        &self,
        status: ResultStatus,
        limit: usize,
    ) -> StorageResult<Vec<ResultRecord>> {
        let results = self.results.lock().unwrap();
        Ok(results
            .iter()
            .rev()
            .filter(|r| r.status == status)
            .take(limit)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryGameStore
// ---------------------------------------------------------------------------

/// In-memory game store keyed by game ID.
#[derive(Debug, Default)]
pub struct MemoryGameStore {
    games: Mutex<HashMap<String, Game>>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a game, simulating external cleanup.
    pub fn remove(&self, game_id: &GameId) {
        self.games.lock().unwrap().remove(&game_id.0);
    }
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn create_game(&self, model_id: &str) -> StorageResult<Game> {
        let game = Game {
            id: GameId::new(),
            model_id: model_id.to_string(),
            created_at: Utc::now(),
        };
        self.games
            .lock()
            .unwrap()
            .insert(game.id.0.clone(), game.clone());
        Ok(game)
    }

    async fn get_game(&self, game_id: &GameId) -> StorageResult<Option<Game>> {
        Ok(self.games.lock().unwrap().get(&game_id.0).cloned())
    }
}

// ---------------------------------------------------------------------------
// MemoryLevelCatalog
// ---------------------------------------------------------------------------

/// In-memory level catalog keyed by level.
#[derive(Debug, Default)]
pub struct MemoryLevelCatalog {
    maps: Mutex<BTreeMap<u32, LevelMap>>,
}

impl MemoryLevelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with a small placeholder layout for each of `levels`.
    pub fn with_levels(levels: &[u32]) -> Self {
        let catalog = Self::new();
        for &level in levels {
            catalog.put_map(LevelMap::new(level, vec![vec![format!("L{level}")]]));
        }
        catalog
    }

    pub fn put_map(&self, map: LevelMap) {
        self.maps.lock().unwrap().insert(map.level, map);
    }

    pub fn remove_level(&self, level: u32) {
        self.maps.lock().unwrap().remove(&level);
    }
}

#[async_trait]
impl LevelCatalog for MemoryLevelCatalog {
    async fn map_for_level(&self, level: u32) -> StorageResult<Option<LevelMap>> {
        Ok(self.maps.lock().unwrap().get(&level).cloned())
    }

    async fn list_maps(&self) -> StorageResult<Vec<LevelMap>> {
        Ok(self.maps.lock().unwrap().values().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryRankingBoard
// ---------------------------------------------------------------------------

/// One recorded `update_rankings` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingUpdate {
    pub model_id: String,
    pub level: u32,
    pub is_win: bool,
}

/// Records ranking updates; can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryRankingBoard {
    updates: Mutex<Vec<RankingUpdate>>,
    failure: Mutex<Option<String>>,
    journal: Option<Arc<Journal>>,
}

impl MemoryRankingBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Arc<Journal>) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail with `msg`.
    pub fn fail_with(&self, msg: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(msg.into());
    }

    pub fn updates(&self) -> Vec<RankingUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl RankingBoard for MemoryRankingBoard {
    async fn update_rankings(
        &self,
        model_id: &str,
        level: u32,
        is_win: bool,
    ) -> StorageResult<()> {
        injected(&self.failure)?;
        self.updates.lock().unwrap().push(RankingUpdate {
            model_id: model_id.to_string(),
            level,
            is_win,
        });
        if let Some(journal) = &self.journal {
            journal.record(format!("rankings:{model_id}:{level}:{is_win}"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryScoreBoard
// ---------------------------------------------------------------------------

/// Per-model win counter.
#[derive(Debug, Default)]
pub struct MemoryScoreBoard {
    scores: Mutex<HashMap<String, u64>>,
    journal: Option<Arc<Journal>>,
}

impl MemoryScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Arc<Journal>) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    pub fn score(&self, model_id: &str) -> u64 {
        self.scores
            .lock()
            .unwrap()
            .get(model_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ScoreBoard for MemoryScoreBoard {
    async fn increment_score(&self, model_id: &str) -> StorageResult<()> {
        *self
            .scores
            .lock()
            .unwrap()
            .entry(model_id.to_string())
            .or_insert(0) += 1;
        if let Some(journal) = &self.journal {
            journal.record(format!("score:{model_id}"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryPlayScheduler
// ---------------------------------------------------------------------------

/// Captures enqueued tasks without running them.
#[derive(Debug, Default)]
pub struct MemoryPlayScheduler {
    tasks: Mutex<Vec<(Duration, ScheduledTask)>>,
    failure: Mutex<Option<String>>,
    journal: Option<Arc<Journal>>,
}

impl MemoryPlayScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Arc<Journal>) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    /// Make every subsequent enqueue fail with `msg`.
    pub fn fail_with(&self, msg: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(msg.into());
    }

    /// Tasks enqueued so far, oldest first.
    pub fn scheduled(&self) -> Vec<ScheduledTask> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }

    /// Delays requested so far, oldest first.
    pub fn delays(&self) -> Vec<Duration> {
        self.tasks.lock().unwrap().iter().map(|(d, _)| *d).collect()
    }

    /// Remove and return every captured task.
    pub fn drain(&self) -> Vec<ScheduledTask> {
        self.tasks
            .lock()
            .unwrap()
            .drain(..)
            .map(|(_, t)| t)
            .collect()
    }
}

#[async_trait]
impl PlayScheduler for MemoryPlayScheduler {
    async fn run_after(&self, delay: Duration, task: PlayTask) -> StorageResult<TaskId> {
        injected(&self.failure)?;
        if let Some(journal) = &self.journal {
            journal.record(format!("schedule:{}:{}", task.game_id, task.level));
        }
        let scheduled = ScheduledTask::pending(task, delay);
        let task_id = scheduled.task_id.clone();
        self.tasks.lock().unwrap().push((delay, scheduled));
        Ok(task_id)
    }
}

#[async_trait]
impl PlayQueue for MemoryPlayScheduler {
    async fn due_tasks(&self, now: DateTime<Utc>) -> StorageResult<Vec<ScheduledTask>> {
        let mut due: Vec<ScheduledTask> = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .map(|(_, t)| t)
            .filter(|t| t.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|t| t.run_at);
        Ok(due)
    }

    async fn ack_task(&self, task_id: &TaskId) -> StorageResult<()> {
        let mut tasks = self.tasks.lock().unwrap();
        let (_, task) = tasks
            .iter_mut()
            .find(|(_, t)| &t.task_id == task_id)
            .ok_or_else(|| StorageError::TaskNotFound {
                task_id: task_id.0.clone(),
            })?;
        task.status = TaskStatus::Acked;
        Ok(())
    }
}
