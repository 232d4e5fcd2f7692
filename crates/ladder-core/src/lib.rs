//! Ladder Core Library
//!
//! The result lifecycle engine of the Ladder benchmark: creates play
//! attempts, moves them to a terminal state, updates the leaderboard and
//! chains the next level through a deferred scheduler.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod driver;
pub mod lifecycle;
pub mod metrics;
pub mod obs;
mod queries;
pub mod scheduling;
pub mod telemetry;

pub use config::{EngineConfig, LAST_COMPLETED_LIMIT};
pub use dispatch::{PlayReceiver, TokioPlayScheduler};
pub use domain::{
    LadderError, NextAttempt, PlayOutcome, Result, ResultWithGame, TransitionOutcome,
};
pub use driver::{DriverSummary, LevelPlayer, PlayDriver};
pub use lifecycle::ResultEngine;
pub use scheduling::{last_level, plan_next, NextStep};

pub use ladder_state::{
    Game, GameId, Grid, LevelMap, PlayTask, ResultId, ResultRecord, ResultStatus, TaskId,
};
