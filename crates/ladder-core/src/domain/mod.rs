//! Domain types for Ladder.
//!
//! - `LadderError`: error taxonomy of the lifecycle engine
//! - `TransitionOutcome` / `NextAttempt`: what a terminal transition did
//! - `ResultWithGame`: read-model row for recent completions
//! - `PlayOutcome`: what an agent reports after playing a level

pub mod error;
pub mod outcome;

pub use error::{LadderError, Result};
pub use outcome::{NextAttempt, PlayOutcome, ResultWithGame, TransitionOutcome};
