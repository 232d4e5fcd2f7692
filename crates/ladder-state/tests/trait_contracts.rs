//! Trait contract tests for ResultStore, GameStore, LevelCatalog and the
//! collaborator traits.
//!
//! Each contract is written once against the trait object and exercised
//! with both the in-memory fakes and `SurrealStore` on `mem://`.

use std::time::Duration;

use ladder_state::fakes::{
    MemoryGameStore, MemoryLevelCatalog, MemoryPlayScheduler, MemoryResultStore,
};
use ladder_state::*;

async fn surreal() -> SurrealStore {
    SurrealStore::in_memory().await.expect("in_memory() failed")
}

// ===========================================================================
// ResultStore contracts
// ===========================================================================

async fn insert_then_get_returns_record(store: &dyn ResultStore) {
    let record = ResultRecord::in_progress(GameId::new(), 1);
    let id = store.insert_result(record.clone()).await.unwrap();

    assert_eq!(id, record.id);
    let fetched = store.get_result(&id).await.unwrap().expect("stored");
    assert_eq!(fetched.status, ResultStatus::InProgress);
    assert!(!fetched.is_win);
    assert!(fetched.reasoning.is_empty());
    assert!(fetched.map.is_empty());
    assert_eq!(fetched.error, None);
    assert_eq!(fetched.version, 1);
}

async fn get_missing_is_none(store: &dyn ResultStore) {
    assert!(store.get_result(&ResultId::new()).await.unwrap().is_none());
}

async fn patch_updates_fields_and_bumps_version(store: &dyn ResultStore) {
    let record = ResultRecord::in_progress(GameId::new(), 2);
    let id = store.insert_result(record).await.unwrap();

    let map = vec![vec!["#".to_string(), ".".to_string()]];
    let patched = store
        .patch_result(
            &id,
            1,
            ResultPatch::completed(true, "found exit".to_string(), map.clone()),
        )
        .await
        .unwrap();

    assert_eq!(patched.status, ResultStatus::Completed);
    assert!(patched.is_win);
    assert_eq!(patched.reasoning, "found exit");
    assert_eq!(patched.map, map);
    assert_eq!(patched.version, 2);
    assert!(patched.finished_at.is_some());

    let fetched = store.get_result(&id).await.unwrap().unwrap();
    assert_eq!(fetched.status, ResultStatus::Completed);
    assert_eq!(fetched.level, 2);
}

async fn patch_preserves_untouched_fields(store: &dyn ResultStore) {
    let record = ResultRecord::in_progress(GameId::new(), 3);
    let game_id = record.game_id.clone();
    let id = store.insert_result(record).await.unwrap();

    let patched = store
        .patch_result(&id, 1, ResultPatch::failed("agent crashed".to_string()))
        .await
        .unwrap();

    assert_eq!(patched.status, ResultStatus::Failed);
    assert_eq!(patched.error.as_deref(), Some("agent crashed"));
    assert_eq!(patched.game_id, game_id);
    assert_eq!(patched.level, 3);
    assert!(patched.reasoning.is_empty());
    assert!(!patched.is_win);
}

async fn stale_patch_is_a_version_conflict(store: &dyn ResultStore) {
    let id = store
        .insert_result(ResultRecord::in_progress(GameId::new(), 1))
        .await
        .unwrap();
    store
        .patch_result(&id, 1, ResultPatch::failed("first".to_string()))
        .await
        .unwrap();

    let err = store
        .patch_result(&id, 1, ResultPatch::failed("second".to_string()))
        .await
        .unwrap_err();
    match err {
        StorageError::VersionConflict {
            expected, actual, ..
        } => {
            assert_eq!(expected, 1);
            assert_eq!(actual, 2);
        }
        other => panic!("expected VersionConflict, got {other:?}"),
    }

    let fetched = store.get_result(&id).await.unwrap().unwrap();
    assert_eq!(fetched.error.as_deref(), Some("first"));
}

async fn patch_missing_is_not_found(store: &dyn ResultStore) {
    let err = store
        .patch_result(&ResultId::new(), 1, ResultPatch::failed("x".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::ResultNotFound { .. }));
}

async fn results_for_game_filters_by_game(store: &dyn ResultStore) {
    let game = GameId::new();
    let other = GameId::new();
    for level in [1, 2, 3] {
        store
            .insert_result(ResultRecord::in_progress(game.clone(), level))
            .await
            .unwrap();
    }
    store
        .insert_result(ResultRecord::in_progress(other, 1))
        .await
        .unwrap();

    let results = store.results_for_game(&game).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.game_id == game));
}

async fn recent_by_status_is_newest_first_and_limited(store: &dyn ResultStore) {
    let game = GameId::new();
    let mut completed = Vec::new();
    for level in 1..=5 {
        let id = store
            .insert_result(ResultRecord::in_progress(game.clone(), level))
            .await
            .unwrap();
        if level != 3 {
            store
                .patch_result(
                    &id,
                    1,
                    ResultPatch::completed(false, String::new(), Vec::new()),
                )
                .await
                .unwrap();
            completed.push(id);
        }
        // Distinct creation timestamps for backends that order by time.
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let recent = store
        .recent_by_status(ResultStatus::Completed, 3)
        .await
        .unwrap();
    let ids: Vec<ResultId> = recent.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, vec![completed[3].clone(), completed[2].clone(), completed[1].clone()]);
    assert!(recent.iter().all(|r| r.status == ResultStatus::Completed));
}

macro_rules! result_store_contracts {
    ($($name:ident),* $(,)?) => {
        mod memory_result_store {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(&MemoryResultStore::new()).await;
                }
            )*
        }

        mod surreal_result_store {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(&surreal().await).await;
                }
            )*
        }
    };
}

result_store_contracts!(
    insert_then_get_returns_record,
    get_missing_is_none,
    patch_updates_fields_and_bumps_version,
    patch_preserves_untouched_fields,
    stale_patch_is_a_version_conflict,
    patch_missing_is_not_found,
    results_for_game_filters_by_game,
    recent_by_status_is_newest_first_and_limited,
);

// ===========================================================================
// GameStore contracts
// ===========================================================================

async fn game_round_trip(store: &dyn GameStore) {
    let game = store.create_game("model-x").await.unwrap();
    let fetched = store.get_game(&game.id).await.unwrap().expect("stored");
    assert_eq!(fetched.model_id, "model-x");
    assert_eq!(fetched.id, game.id);

    assert!(store.get_game(&GameId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn memory_game_round_trip() {
    game_round_trip(&MemoryGameStore::new()).await;
}

#[tokio::test]
async fn surreal_game_round_trip() {
    game_round_trip(&surreal().await).await;
}

// ===========================================================================
// LevelCatalog contracts
// ===========================================================================

#[tokio::test]
async fn memory_catalog_lookup() {
    let catalog = MemoryLevelCatalog::with_levels(&[1, 2, 3]);
    assert_eq!(catalog.list_maps().await.unwrap().len(), 3);
    assert_eq!(catalog.map_for_level(2).await.unwrap().unwrap().level, 2);
    assert!(catalog.map_for_level(4).await.unwrap().is_none());

    catalog.remove_level(2);
    assert!(catalog.map_for_level(2).await.unwrap().is_none());
}

#[tokio::test]
async fn surreal_catalog_lookup_and_replace() {
    let store = surreal().await;
    for level in [3, 1, 2] {
        store
            .put_map(&LevelMap::new(level, vec![vec![format!("L{level}")]]))
            .await
            .unwrap();
    }

    let levels: Vec<u32> = store
        .list_maps()
        .await
        .unwrap()
        .iter()
        .map(|m| m.level)
        .collect();
    assert_eq!(levels, vec![1, 2, 3]);

    let replacement = vec![vec!["S".to_string(), "E".to_string()]];
    store
        .put_map(&LevelMap::new(2, replacement.clone()))
        .await
        .unwrap();
    assert_eq!(store.list_maps().await.unwrap().len(), 3);
    assert_eq!(
        store.map_for_level(2).await.unwrap().unwrap().layout,
        replacement
    );
    assert!(store.map_for_level(9).await.unwrap().is_none());
}

// ===========================================================================
// Collaborator contracts
// ===========================================================================

fn play(level: u32) -> PlayTask {
    PlayTask {
        game_id: GameId::new(),
        model_id: "model-q".to_string(),
        level,
    }
}

#[tokio::test]
async fn memory_scheduler_captures_tasks_in_order() {
    let scheduler = MemoryPlayScheduler::new();
    let a = scheduler.run_after(Duration::ZERO, play(2)).await.unwrap();
    let b = scheduler
        .run_after(Duration::from_secs(5), play(3))
        .await
        .unwrap();

    let tasks = scheduler.scheduled();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].task_id, a);
    assert_eq!(tasks[1].task_id, b);
    assert_eq!(tasks[1].payload.level, 3);
    assert_eq!(
        scheduler.delays(),
        vec![Duration::ZERO, Duration::from_secs(5)]
    );
}

#[tokio::test]
async fn memory_scheduler_failure_is_reported() {
    let scheduler = MemoryPlayScheduler::new();
    scheduler.fail_with("queue offline");
    let err = scheduler
        .run_after(Duration::ZERO, play(2))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("queue offline"));
    assert!(scheduler.scheduled().is_empty());
}

#[tokio::test]
async fn surreal_queue_holds_tasks_until_acked() {
    let store = surreal().await;
    let now_id = store.run_after(Duration::ZERO, play(2)).await.unwrap();
    let later_id = store
        .run_after(Duration::from_secs(3600), play(3))
        .await
        .unwrap();

    let pending = store.pending_tasks().await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].task_id, now_id);

    let due = store.due_tasks(chrono::Utc::now()).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].payload.level, 2);

    store.ack_task(&now_id).await.unwrap();
    let pending = store.pending_tasks().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].task_id, later_id);

    let err = store.ack_task(&TaskId::new()).await.unwrap_err();
    assert!(matches!(err, StorageError::TaskNotFound { .. }));
}

async fn queue_redelivers_until_acked<Q: PlayScheduler + PlayQueue>(queue: &Q) {
    let first = queue.run_after(Duration::ZERO, play(2)).await.unwrap();
    let _later = queue
        .run_after(Duration::from_secs(3600), play(3))
        .await
        .unwrap();

    // Read twice without acking: the same task comes back.
    for _ in 0..2 {
        let due = queue.due_tasks(chrono::Utc::now()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].task_id, first);
    }

    queue.ack_task(&first).await.unwrap();
    assert!(queue.due_tasks(chrono::Utc::now()).await.unwrap().is_empty());

    let far_future = chrono::Utc::now() + chrono::Duration::hours(2);
    let due = queue.due_tasks(far_future).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].payload.level, 3);

    let err = queue.ack_task(&TaskId::new()).await.unwrap_err();
    assert!(matches!(err, StorageError::TaskNotFound { .. }));
}

#[tokio::test]
async fn memory_queue_redelivers_until_acked() {
    queue_redelivers_until_acked(&MemoryPlayScheduler::new()).await;
}

#[tokio::test]
async fn surreal_queue_redelivers_until_acked() {
    queue_redelivers_until_acked(&surreal().await).await;
}

#[tokio::test]
async fn surreal_leaderboard_tallies_and_scores() {
    let store = surreal().await;
    store.update_rankings("m1", 1, true).await.unwrap();
    store.update_rankings("m1", 1, false).await.unwrap();
    store.update_rankings("m1", 2, true).await.unwrap();
    store.increment_score("m1").await.unwrap();
    store.increment_score("m1").await.unwrap();
    store.increment_score("m2").await.unwrap();

    let tallies = store.tallies().await.unwrap();
    assert_eq!(
        tallies,
        vec![
            LevelTally {
                model_id: "m1".to_string(),
                level: 1,
                wins: 1,
                losses: 1
            },
            LevelTally {
                model_id: "m1".to_string(),
                level: 2,
                wins: 1,
                losses: 0
            },
        ]
    );

    let scores = store.scores().await.unwrap();
    assert_eq!(scores[0].model_id, "m1");
    assert_eq!(scores[0].score, 2);
    assert_eq!(scores[1].score, 1);
}

#[tokio::test]
async fn surreal_local_store_writes_to_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("db");
    let store = SurrealStore::connect(&StoreTarget::Local(path.clone()))
        .await
        .expect("open");

    let id = store
        .insert_result(ResultRecord::in_progress(GameId::new(), 7))
        .await
        .unwrap();
    let fetched = store.get_result(&id).await.unwrap().expect("stored");
    assert_eq!(fetched.level, 7);
    assert!(path.exists());
}
