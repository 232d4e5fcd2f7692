//! Ladder - benchmark runner CLI
//!
//! The `ladder` command manages games, level maps and play results stored in
//! SurrealDB.
//!
//! ## Commands
//!
//! - `game`: register or inspect a game
//! - `map`: manage the level catalog
//! - `result`: create, fail, complete and list play results
//! - `task`: inspect and acknowledge queued play tasks
//! - `scores`: show the leaderboard

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use ladder_core::telemetry::{init_tracing, LogFormat};
use ladder_core::metrics::METRICS;
use ladder_core::{EngineConfig, ResultEngine, TransitionOutcome};
use ladder_state::{
    GameId, GameStore, Grid, LevelCatalog, LevelMap, PlayQueue, ResultId, SurrealStore, TaskId,
};
use serde::Serialize;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "ladder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-level game benchmark runner", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON log lines and JSON command output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage games
    Game {
        #[command(subcommand)]
        action: GameAction,
    },

    /// Manage the level catalog
    Map {
        #[command(subcommand)]
        action: MapAction,
    },

    /// Manage play results
    Result {
        #[command(subcommand)]
        action: ResultAction,
    },

    /// Inspect the play task queue
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Show per-model scores and per-level tallies
    Scores,
}

#[derive(Subcommand)]
enum GameAction {
    /// Register a game for a model and schedule its first level
    New {
        /// Model under evaluation
        #[arg(short, long)]
        model: String,

        /// Register only; do not enqueue the first level
        #[arg(long)]
        no_start: bool,
    },
    /// Show a game and its results
    Show {
        /// Game ID
        game: String,
    },
}

#[derive(Subcommand)]
enum MapAction {
    /// Insert or replace the map of a level
    Add {
        /// Level number (starting at 1)
        #[arg(short, long)]
        level: u32,

        /// Path to the layout (JSON array of rows of strings)
        #[arg(long)]
        layout: PathBuf,
    },
    /// List every level in the catalog
    List,
}

#[derive(Subcommand)]
enum ResultAction {
    /// Create an in-progress result
    Create {
        #[arg(short, long)]
        game: String,

        #[arg(short, long)]
        level: u32,
    },
    /// Mark a result as failed
    Fail {
        /// Result ID
        result: String,

        #[arg(short, long)]
        error: String,
    },
    /// Mark a result as completed
    Complete {
        /// Result ID
        result: String,

        /// The agent won the level
        #[arg(long)]
        win: bool,

        #[arg(short, long, default_value = "")]
        reasoning: String,

        /// Path to the final board (JSON array of rows of strings)
        #[arg(short, long)]
        map: Option<PathBuf>,
    },
    /// List the results of a game, highest level first
    List {
        #[arg(short, long)]
        game: String,
    },
    /// Show the most recent completed results
    Recent,
}

#[derive(Subcommand)]
enum TaskAction {
    /// List pending play tasks
    List {
        /// Only tasks whose run time has passed
        #[arg(long)]
        due: bool,
    },
    /// Acknowledge a delivered task
    Ack {
        /// Task ID
        task: String,
    },
}

/// Shared state of one invocation.
struct App {
    store: Arc<SurrealStore>,
    engine: ResultEngine,
    json: bool,
}

impl App {
    fn new(store: Arc<SurrealStore>, config: EngineConfig, json: bool) -> Self {
        let engine = ResultEngine::from_store(store.clone(), store.clone()).with_config(config);
        Self {
            store,
            engine,
            json,
        }
    }

    /// Print `value` as pretty JSON when `--json` is set, otherwise run
    /// `human`.
    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(LogFormat::resolve(cli.json), level);

    let config = EngineConfig::from_env().context("Invalid engine configuration")?;
    let store = SurrealStore::from_env()
        .await
        .context("Failed to connect to Ladder database")?;
    let app = App::new(Arc::new(store), config, cli.json);

    let outcome = execute(&app, cli.command).await;
    METRICS.flush();
    outcome
}

async fn execute(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Game { action } => match action {
            GameAction::New { model, no_start } => cmd_game_new(app, &model, !no_start).await,
            GameAction::Show { game } => cmd_game_show(app, &game).await,
        },
        Commands::Map { action } => match action {
            MapAction::Add { level, layout } => cmd_map_add(app, level, &layout).await,
            MapAction::List => cmd_map_list(app).await,
        },
        Commands::Result { action } => match action {
            ResultAction::Create { game, level } => cmd_result_create(app, &game, level).await,
            ResultAction::Fail { result, error } => cmd_result_fail(app, &result, &error).await,
            ResultAction::Complete {
                result,
                win,
                reasoning,
                map,
            } => cmd_result_complete(app, &result, win, reasoning, map.as_deref()).await,
            ResultAction::List { game } => cmd_result_list(app, &game).await,
            ResultAction::Recent => cmd_result_recent(app).await,
        },
        Commands::Task { action } => match action {
            TaskAction::List { due } => cmd_task_list(app, due).await,
            TaskAction::Ack { task } => cmd_task_ack(app, &task).await,
        },
        Commands::Scores => cmd_scores(app).await,
    }
}

fn read_grid(path: &Path) -> Result<Grid> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of rows", path.display()))
}

fn short(id: &str) -> &str {
    &id[..8.min(id.len())]
}

async fn cmd_game_new(app: &App, model: &str, start: bool) -> Result<()> {
    let game = app.store.create_game(model).await?;
    info!(game_id = %game.id, model_id = %game.model_id, "game registered");

    let first_task = if start {
        Some(
            app.engine
                .schedule_first_level(&game.id)
                .await
                .context("Failed to schedule the first level")?,
        )
    } else {
        None
    };

    #[derive(Serialize)]
    struct Created<'a> {
        game: &'a ladder_state::Game,
        first_task: Option<&'a TaskId>,
    }

    app.emit(
        &Created {
            game: &game,
            first_task: first_task.as_ref(),
        },
        |c| {
            println!("Created game {} for model {}", c.game.id, c.game.model_id);
            if let Some(task) = c.first_task {
                println!("Queued first level as task {}", short(&task.0));
            }
        },
    )
}

async fn cmd_game_show(app: &App, game_id: &str) -> Result<()> {
    let game_id = GameId(game_id.to_string());
    let Some(game) = app.engine.game(&game_id).await? else {
        bail!("Game '{}' not found", game_id);
    };
    let results = app.engine.get_results(&game_id).await?;

    #[derive(Serialize)]
    struct Shown<'a> {
        game: &'a ladder_state::Game,
        results: &'a [ladder_state::ResultRecord],
    }

    app.emit(
        &Shown {
            game: &game,
            results: &results,
        },
        |s| {
            println!("game   {}", s.game.id);
            println!("model  {}", s.game.model_id);
            println!("since  {}", s.game.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!();
            print_results(s.results);
        },
    )
}

async fn cmd_map_add(app: &App, level: u32, layout: &Path) -> Result<()> {
    if level == 0 {
        bail!("Levels start at 1");
    }
    let layout = read_grid(layout)?;
    let map = LevelMap::new(level, layout);
    app.store
        .put_map(&map)
        .await
        .with_context(|| format!("Failed to store map for level {level}"))?;

    app.emit(&map, |m| {
        println!("Stored level {} ({} rows)", m.level, m.layout.len())
    })
}

async fn cmd_map_list(app: &App) -> Result<()> {
    let mut maps = app.store.list_maps().await?;
    maps.sort_by_key(|m| m.level);

    app.emit(&maps, |maps| {
        if maps.is_empty() {
            println!("No levels defined. Add one with 'ladder map add'.");
            return;
        }
        for map in maps {
            let width = map.layout.iter().map(Vec::len).max().unwrap_or(0);
            println!("level {:>3}  {}x{}", map.level, map.layout.len(), width);
        }
    })
}

async fn cmd_result_create(app: &App, game_id: &str, level: u32) -> Result<()> {
    let game_id = GameId(game_id.to_string());
    let result_id = app.engine.create_initial_result(&game_id, level).await?;

    app.emit(&result_id, |id| println!("{id}"))
}

async fn cmd_result_fail(app: &App, result_id: &str, error: &str) -> Result<()> {
    let outcome = app
        .engine
        .fail_result(&ResultId(result_id.to_string()), error)
        .await
        .with_context(|| format!("Failed to fail result '{result_id}'"))?;

    app.emit(&outcome, print_outcome)
}

async fn cmd_result_complete(
    app: &App,
    result_id: &str,
    win: bool,
    reasoning: String,
    map: Option<&Path>,
) -> Result<()> {
    let map = match map {
        Some(path) => read_grid(path)?,
        None => Vec::new(),
    };
    let outcome = app
        .engine
        .update_result(&ResultId(result_id.to_string()), win, reasoning, map)
        .await
        .with_context(|| format!("Failed to complete result '{result_id}'"))?;

    app.emit(&outcome, print_outcome)
}

async fn cmd_result_list(app: &App, game_id: &str) -> Result<()> {
    let results = app
        .engine
        .get_results(&GameId(game_id.to_string()))
        .await?;

    app.emit(&results, |r| print_results(r))
}

async fn cmd_result_recent(app: &App) -> Result<()> {
    let recent = app.engine.get_last_completed_results().await?;

    app.emit(&recent, |recent| {
        if recent.is_empty() {
            println!("No completed results yet.");
            return;
        }
        for entry in recent {
            let model = entry
                .game
                .as_ref()
                .map(|g| g.model_id.as_str())
                .unwrap_or("<removed game>");
            let verdict = if entry.result.is_win { "win " } else { "loss" };
            println!(
                "{}  level {:>3}  {}  {}",
                short(&entry.result.id.0),
                entry.result.level,
                verdict,
                model
            );
        }
    })
}

async fn cmd_task_list(app: &App, due: bool) -> Result<()> {
    let tasks = if due {
        app.store.due_tasks(Utc::now()).await?
    } else {
        app.store.pending_tasks().await?
    };

    app.emit(&tasks, |tasks| {
        if tasks.is_empty() {
            println!("No pending tasks.");
            return;
        }
        for task in tasks {
            println!(
                "{}  game {}  level {:>3}  at {}",
                task.task_id,
                short(&task.payload.game_id.0),
                task.payload.level,
                task.run_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    })
}

async fn cmd_task_ack(app: &App, task_id: &str) -> Result<()> {
    let task_id = TaskId(task_id.to_string());
    app.store
        .ack_task(&task_id)
        .await
        .with_context(|| format!("Failed to acknowledge task '{task_id}'"))?;

    app.emit(&task_id, |id| println!("Acknowledged task {id}"))
}

async fn cmd_scores(app: &App) -> Result<()> {
    #[derive(Serialize)]
    struct Board {
        scores: Vec<ladder_state::ModelScore>,
        tallies: Vec<ladder_state::LevelTally>,
    }

    let board = Board {
        scores: app.store.scores().await?,
        tallies: app.store.tallies().await?,
    };

    app.emit(&board, |b| {
        if b.scores.is_empty() && b.tallies.is_empty() {
            println!("No games scored yet.");
            return;
        }
        println!("Scores");
        for s in &b.scores {
            println!("  {:<32} {}", s.model_id, s.score);
        }
        println!();
        println!("Per level");
        for t in &b.tallies {
            println!(
                "  {:<32} level {:>3}  {} won / {} lost",
                t.model_id, t.level, t.wins, t.losses
            );
        }
    })
}

fn print_outcome(outcome: &TransitionOutcome) {
    let r = &outcome.result;
    println!("result {} is now {} (level {})", r.id, r.status, r.level);
    match &outcome.next {
        ladder_core::NextAttempt::Scheduled { task_id, level } => {
            println!("queued level {} as task {}", level, short(&task_id.0))
        }
        ladder_core::NextAttempt::RunComplete => println!("run complete"),
    }
}

fn print_results(results: &[ladder_state::ResultRecord]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    for r in results {
        let detail = match (&r.error, r.status) {
            (Some(err), _) => err.clone(),
            (None, ladder_state::ResultStatus::Completed) => {
                let verdict = if r.is_win { "win" } else { "loss" };
                verdict.to_string()
            }
            (None, _) => String::new(),
        };
        println!(
            "level {:>3}  {:<10}  {}  {}",
            r.level,
            r.status.as_str(),
            short(&r.id.0),
            detail
        );
    }
}
