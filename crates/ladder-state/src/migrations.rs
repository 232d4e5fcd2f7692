//! SurrealDB schema migrations and initialization
//!
//! This module provides initialization functions to set up all tables
//! with their indexes.

use crate::error::StateError;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all Ladder tables in SurrealDB
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing Ladder SurrealDB schema");

    init_games_table(db).await?;
    init_results_table(db).await?;
    init_maps_table(db).await?;
    init_leaderboard_tables(db).await?;
    init_play_tasks_table(db).await?;

    info!("Ladder schema initialization complete");
    Ok(())
}

/// Run `sql` and fail if any statement in it failed.
async fn apply(db: &Surreal<Any>, sql: &str) -> Result<()> {
    db.query(sql)
        .await?
        .check()
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    Ok(())
}

async fn init_games_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing games table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS games SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_game_id ON TABLE games COLUMNS game_id UNIQUE;
    "#;

    apply(db, sql).await?;
    Ok(())
}

/// Initialize `results` table
///
/// Schema:
/// ```text
/// TABLE results {
///   result_id:    STRING (unique)
///   game_id:      STRING (indexed with level)
///   level:        INT
///   status:       STRING (enum: inProgress | completed | failed)
///   is_win:       BOOL
///   reasoning:    STRING
///   map:          ARRAY<ARRAY<STRING>>
///   error:        STRING?
///   version:      INT (compare-and-set counter)
///   created_at:   DATETIME
///   finished_at:  DATETIME?
/// }
/// ```
///
/// Status transitions (inProgress → completed | failed) are enforced by the
/// engine and the version check on every patch.
async fn init_results_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing results table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS results AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_result_id ON TABLE results COLUMNS result_id UNIQUE;

        -- Results of one game, by level
        DEFINE INDEX IF NOT EXISTS idx_game_id_level ON TABLE results COLUMNS game_id, level;

        -- Recent results with a given status
        DEFINE INDEX IF NOT EXISTS idx_status_created_at ON TABLE results COLUMNS status, created_at;
    "#;

    apply(db, sql).await?;
    info!("✓ results table initialized");
    Ok(())
}

async fn init_maps_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing maps table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS maps SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_level ON TABLE maps COLUMNS level UNIQUE;
    "#;

    apply(db, sql).await?;
    Ok(())
}

/// `rankings` and `scores` use deterministic record IDs
/// (`rankings:[model_id, level]`, `scores:model_id`) so updates are upserts.
async fn init_leaderboard_tables(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing leaderboard tables");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS rankings SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_model_id ON TABLE rankings COLUMNS model_id;

        DEFINE TABLE IF NOT EXISTS scores SCHEMALESS;
    "#;

    apply(db, sql).await?;
    Ok(())
}

/// Initialize `play_tasks` table (durable deferred-task queue)
///
/// Rows stay `pending` until a consumer acks them, so a crash between
/// delivery and ack re-delivers the task.
async fn init_play_tasks_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing play_tasks table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS play_tasks SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_task_id ON TABLE play_tasks COLUMNS task_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_status_run_at ON TABLE play_tasks COLUMNS status, run_at;
    "#;

    apply(db, sql).await?;
    info!("✓ play_tasks table initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_schema_is_idempotent() {
        let db = surrealdb::engine::any::connect("mem://").await.unwrap();
        db.use_ns("ladder").use_db("main").await.unwrap();
        init_schema(&db).await.unwrap();
        init_schema(&db).await.unwrap();
    }

    #[tokio::test]
    async fn failing_statement_is_reported() {
        let db = surrealdb::engine::any::connect("mem://").await.unwrap();
        db.use_ns("ladder").use_db("main").await.unwrap();
        let err = apply(&db, "DEFINE TABLE games SCHEMALESS; THROW 'bad definition';")
            .await
            .unwrap_err();
        assert!(matches!(err, StateError::SchemaSetup(ref msg) if msg.contains("bad definition")));
    }
}
