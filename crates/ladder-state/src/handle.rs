//! SurrealDB connection setup
//!
//! Resolves where Ladder keeps its state and opens a ready-to-use connection
//! (namespace selected, schema initialized). Supports in-memory, local
//! SurrealKV, plain URL and authenticated cloud (WebSocket) targets.

use std::path::PathBuf;

use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::info;

use crate::error::StateError;
use crate::migrations;
use crate::Result;

const DEFAULT_NAMESPACE: &str = "ladder";
const DEFAULT_DATABASE: &str = "main";
const DEFAULT_LOCAL_PATH: &str = ".ladder/db";

/// Credentials for an authenticated (cloud) endpoint.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// WebSocket endpoint, e.g. `wss://xxx.aws-use1.surrealdb.cloud`
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub namespace: String,
    pub database: String,
    /// Sign in as root instead of as a database user
    pub is_root: bool,
}

impl CloudConfig {
    /// Read the cloud credentials from the environment. `None` unless
    /// `SURREALDB_ENDPOINT`, `SURREALDB_USERNAME` and `SURREALDB_PASSWORD`
    /// are all set; `SURREALDB_NAMESPACE`, `SURREALDB_DATABASE` and
    /// `SURREALDB_ROOT` are optional.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(&env_lookup)
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Option<Self> {
        Some(Self {
            endpoint: lookup("SURREALDB_ENDPOINT")?,
            username: lookup("SURREALDB_USERNAME")?,
            password: lookup("SURREALDB_PASSWORD")?,
            namespace: lookup("SURREALDB_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            database: lookup("SURREALDB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            is_root: lookup("SURREALDB_ROOT").is_some_and(|v| v.eq_ignore_ascii_case("true")),
        })
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Where the state lives.
#[derive(Debug, Clone)]
pub enum StoreTarget {
    /// Throwaway `mem://` database
    Memory,
    /// Local SurrealKV directory
    Local(PathBuf),
    /// Unauthenticated URL (any scheme SurrealDB understands)
    Url(String),
    /// Authenticated remote endpoint
    Cloud(CloudConfig),
}

impl StoreTarget {
    /// Resolve the target from the environment.
    ///
    /// Order: full cloud config, then `SURREALDB_URL`, then `LADDER_DB_PATH`,
    /// then local persistence in `.ladder/db`.
    pub fn from_env() -> Self {
        Self::from_lookup(&env_lookup)
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        if let Some(config) = CloudConfig::from_lookup(lookup) {
            return StoreTarget::Cloud(config);
        }
        if let Some(url) = lookup("SURREALDB_URL") {
            return StoreTarget::Url(url);
        }
        let path = lookup("LADDER_DB_PATH").unwrap_or_else(|| DEFAULT_LOCAL_PATH.to_string());
        StoreTarget::Local(PathBuf::from(path))
    }
}

/// Open a connection to `target`, select the namespace and initialize the
/// schema.
pub async fn connect(target: &StoreTarget) -> Result<Surreal<Any>> {
    let (db, namespace, database) = match target {
        StoreTarget::Memory => (
            open("mem://").await?,
            DEFAULT_NAMESPACE,
            DEFAULT_DATABASE,
        ),
        StoreTarget::Local(path) => {
            std::fs::create_dir_all(path).map_err(|e| {
                StateError::Connection(format!(
                    "Failed to create database directory {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let url = format!("surrealkv://{}", path.display());
            info!("Using local persistence: {}", url);
            (open(&url).await?, DEFAULT_NAMESPACE, DEFAULT_DATABASE)
        }
        StoreTarget::Url(url) => (open(url).await?, DEFAULT_NAMESPACE, DEFAULT_DATABASE),
        StoreTarget::Cloud(config) => {
            let db = open(&config.endpoint).await?;
            if config.is_root {
                db.signin(Root {
                    username: &config.username,
                    password: &config.password,
                })
                .await
                .map_err(|e| StateError::Connection(format!("Root auth failed: {e}")))?;
            } else {
                db.signin(Database {
                    namespace: &config.namespace,
                    database: &config.database,
                    username: &config.username,
                    password: &config.password,
                })
                .await
                .map_err(|e| StateError::Connection(format!("DB auth failed: {e}")))?;
            }
            (db, config.namespace.as_str(), config.database.as_str())
        }
    };

    db.use_ns(namespace)
        .use_db(database)
        .await
        .map_err(|e| StateError::Connection(e.to_string()))?;

    migrations::init_schema(&db).await?;
    info!(backend = target_label(target), "SurrealDB connected");
    Ok(db)
}

async fn open(url: &str) -> Result<Surreal<Any>> {
    surrealdb::engine::any::connect(url)
        .await
        .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))
}

fn target_label(target: &StoreTarget) -> &'static str {
    match target {
        StoreTarget::Memory => "memory",
        StoreTarget::Local(_) => "local",
        StoreTarget::Url(_) => "url",
        StoreTarget::Cloud(_) => "cloud",
    }
}
