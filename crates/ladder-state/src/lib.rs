//! Ladder-State: Persistence and Collaborator Contracts for Ladder
//!
//! This crate provides the persistence layer for the Ladder benchmark runner:
//! the storage traits the lifecycle engine is written against, the side-effect
//! collaborators it calls, in-memory fakes of all of them, and a SurrealDB
//! implementation.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: versioned result records, level catalog reads, and a durable
//! deferred-task queue.
//!
//! ## Key Components
//!
//! - `ResultStore` / `GameStore` / `LevelCatalog`: storage contracts
//! - `RankingBoard` / `ScoreBoard` / `PlayScheduler`: side-effect contracts
//! - `PlayQueue`: due/ack side of the durable task queue
//! - `SurrealStore`: SurrealDB implementation of all of the above

pub mod collaborators;
mod error;
pub mod fakes;
mod handle;
pub mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use collaborators::{
    PlayQueue, PlayScheduler, PlayTask, RankingBoard, ScheduledTask, ScoreBoard, TaskId,
    TaskStatus,
};
pub use error::{StateError, StorageError};
pub use handle::{connect, CloudConfig, StoreTarget};
pub use schema::{GameRow, LevelTally, MapRow, ModelScore, PlayTaskRow, ResultRow};
pub use storage_traits::{
    Game, GameId, GameStore, Grid, LevelCatalog, LevelMap, ResultId, ResultPatch, ResultRecord,
    ResultStatus, ResultStore, StorageResult,
};
pub use surreal_store::SurrealStore;

/// Result type for ladder-state operations
pub type Result<T> = std::result::Result<T, StateError>;
