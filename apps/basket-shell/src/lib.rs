//! # basket-shell
//!
//! Interactive shell over a session cart backed by SQLite.

pub mod commands;
pub mod error;

use std::path::PathBuf;
use std::sync::Arc;

use basket_db::{Database, DbConfig, KeyValueStore, MemoryStore};
use basket_state::{CartConfig, CartContext, CartProvider, CartStore};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use commands::Response;
use error::ShellError;

// =============================================================================
// Arguments
// =============================================================================

#[derive(Debug, Parser)]
#[command(name = "basket-shell")]
#[command(about = "Session cart with write-through persistence", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<ShellCommand>,

    /// Config file path (defaults to the platform config dir)
    #[arg(short, long, global = true, env = "BASKET_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite file holding the cart
    #[arg(long, global = true, env = "BASKET_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Keep the cart in memory only
    #[arg(long, global = true)]
    pub memory: bool,

    /// Print responses as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ShellCommand {
    /// Read cart commands from stdin (default)
    Run,

    /// Print the effective configuration
    ShowConfig,

    /// Write the effective configuration to the config path
    InitConfig,
}

// =============================================================================
// Entry Point
// =============================================================================

/// Runs the shell.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                         Shell Startup                                   │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter                                │
/// │     • Default: info,basket=debug,sqlx=warn; override with RUST_LOG      │
/// │                                                                         │
/// │  2. Load CartConfig ──────────────────────────────────────────────────► │
/// │     • defaults → basket.toml → BASKET_* env                             │
/// │                                                                         │
/// │  3. Open Store ───────────────────────────────────────────────────────► │
/// │     • SQLite (WAL, migrations) or --memory                              │
/// │                                                                         │
/// │  4. Bootstrap Cart ───────────────────────────────────────────────────► │
/// │     • hydrate from the durable snapshot, then accept commands           │
/// │                                                                         │
/// │  5. Read Commands Until quit/EOF ─────────────────────────────────────► │
/// │     • shutdown drains pending snapshot writes                           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(cli: Cli) -> Result<(), ShellError> {
    init_tracing();

    let config = CartConfig::load(cli.config.clone())?;

    match cli.command.clone().unwrap_or(ShellCommand::Run) {
        ShellCommand::ShowConfig => {
            let text = toml_string(&config)?;
            println!("{}", text);
            Ok(())
        }
        ShellCommand::InitConfig => {
            config.save(cli.config.clone())?;
            Ok(())
        }
        ShellCommand::Run => run_session(&cli, &config).await,
    }
}

async fn run_session(cli: &Cli, config: &CartConfig) -> Result<(), ShellError> {
    info!("Starting basket shell");

    let mut db: Option<Arc<Database>> = None;
    let kv: Arc<dyn KeyValueStore> = if cli.memory {
        info!("Using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let db_path = get_database_path(cli.db_path.clone())?;
        info!(?db_path, "Database path determined");
        let database = Arc::new(Database::new(DbConfig::new(db_path)).await?);
        db = Some(Arc::clone(&database));
        database
    };

    let store = CartStore::bootstrap(kv, config).await?;
    let provider = CartProvider::new(store);

    let _changes = provider.store().subscribe(|cart| {
        debug!(
            lines = cart.len(),
            total_quantity = cart.total_quantity(),
            "Cart changed"
        );
    });

    info!(
        session_id = %provider.store().session_id(),
        items = provider.store().items().len(),
        "Cart ready, reading commands"
    );

    let result = command_loop(&provider.context(), cli.json).await;

    provider.store().shutdown().await?;
    if let Some(db) = db {
        db.close().await;
    }

    result
}

async fn command_loop(ctx: &CartContext, json: bool) -> Result<(), ShellError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| ShellError::internal(format!("stdin: {}", e)))?
    {
        let outcome = match commands::parse(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => commands::execute(ctx, command).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(Response::Quit) => break,
            Ok(response) => print_response(&response, json),
            Err(e) => {
                warn!(code = ?e.code, "Command failed: {}", e.message);
                print_error(&e, json);
            }
        }
    }

    Ok(())
}

fn print_response(response: &Response, json: bool) {
    if json {
        match serde_json::to_string(response) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("failed to encode response: {}", e),
        }
    } else {
        println!("{}", response);
    }
}

fn print_error(err: &ShellError, json: bool) {
    if json {
        match serde_json::to_string(err) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("failed to encode error: {}", e),
        }
    } else {
        eprintln!("error: {}", err);
    }
}

fn toml_string(config: &CartConfig) -> Result<String, ShellError> {
    toml::to_string_pretty(config).map_err(|e| ShellError::internal(e.to_string()))
}

// =============================================================================
// Setup Helpers
// =============================================================================

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=basket=trace` - Show trace for basket crates only
/// - Default: info, debug for basket crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,basket=debug,sqlx=warn"));

    // Logs go to stderr so stdout stays parseable in --json mode.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/dev.basket.basket/basket.db`
/// - **Windows**: `%APPDATA%\basket\basket\data\basket.db`
/// - **Linux**: `~/.local/share/basket/basket.db`
///
/// An explicit path (`--db-path` or `BASKET_DB_PATH`) wins.
fn get_database_path(explicit: Option<PathBuf>) -> Result<PathBuf, ShellError> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let proj_dirs = ProjectDirs::from("dev", "basket", "basket")
        .ok_or_else(|| ShellError::internal("Could not determine app data directory"))?;

    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .map_err(|e| ShellError::internal(format!("create {}: {}", data_dir.display(), e)))?;

    Ok(data_dir.join("basket.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_globals() {
        let cli = Cli::parse_from(["basket-shell", "--memory", "--json", "run"]);
        assert!(cli.memory);
        assert!(cli.json);
        assert!(matches!(cli.command, Some(ShellCommand::Run)));
    }

    #[test]
    fn test_explicit_db_path_wins() {
        let path = get_database_path(Some(PathBuf::from("/tmp/cart.db"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/cart.db"));
    }
}
