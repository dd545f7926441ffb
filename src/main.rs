//! # ARDF Manager CLI (`ardf`)
//!
//! The `ardf` binary manages a local catalog of ARDF resources: it syncs
//! remote catalogs into SQLite, ranks resources against free-text queries,
//! and serves the same flows over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! ardf --config ./config/ardf.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ardf init` | Create the SQLite database and run schema migrations |
//! | `ardf add <file>` | Upsert locally authored resources from a JSON file |
//! | `ardf get <resource_id>` | Print one resource as JSON |
//! | `ardf list` | Page through the catalog |
//! | `ardf recommend "<query>"` | Hybrid-ranked shortlist for a query |
//! | `ardf sync <name\|url>` | Pull a remote catalog into the store |
//! | `ardf sources` | Configured and recorded sources |
//! | `ardf serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! ardf init
//! ardf sync primary
//! ardf sync http://localhost:4100 --label "Local MCP"
//! ardf recommend "book a flight" --type tool --limit 5
//! ardf serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ardf_core::ListQuery;
use ardf_manager::search::RecommendRequest;
use ardf_manager::{config, get, ingest, migrate, search, server, sources};

/// ARDF Manager: sync, store and rank ARDF catalog resources.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ardf.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ardf",
    about = "ARDF Manager: sync, store and rank ARDF catalog resources",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ardf.toml")]
    config: PathBuf,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Upsert resources from a JSON file (one object or an array).
    ///
    /// Missing `status` and `version` default to `draft` and `1.0.0`.
    Add {
        /// Path to the resource JSON file.
        file: PathBuf,
    },

    /// Print a resource as JSON.
    Get {
        /// Resource identifier.
        resource_id: String,
    },

    /// List catalog resources, most recently updated first.
    List {
        /// Only list resources of this type (`tool`, `prompt`, `resource`, ...).
        #[arg(long = "type")]
        resource_type: Option<String>,

        /// Substring filter over description, when-to-use, and tags.
        #[arg(long)]
        query: Option<String>,

        /// Maximum number of resources to show (capped at 100).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Rank resources against a free-text query.
    ///
    /// Blends lexical overlap with embedding similarity. If the embedding
    /// provider fails, results fall back to lexical scores.
    Recommend {
        /// The query string.
        query: String,

        /// Only consider resources of this type.
        #[arg(long = "type")]
        resource_type: Option<String>,

        /// Maximum number of recommendations.
        #[arg(long)]
        limit: Option<usize>,

        /// Semantic weight in [0.0, 1.0], overriding `[ranking].alpha`.
        #[arg(long)]
        alpha: Option<f64>,
    },

    /// Sync a remote catalog into the store.
    ///
    /// The target is the name of a `[sources.<name>]` entry or an
    /// `http(s)://` base URL.
    Sync {
        /// Configured source name or base URL.
        target: String,

        /// Display label recorded for the source.
        #[arg(long)]
        label: Option<String>,
    },

    /// List configured and previously synced sources.
    Sources,

    /// Start the HTTP API server on `[server].bind`.
    Serve,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Add { file } => {
            get::run_add(&cfg, &file).await?;
        }
        Commands::Get { resource_id } => {
            get::run_get(&cfg, &resource_id).await?;
        }
        Commands::List {
            resource_type,
            query,
            limit,
        } => {
            search::run_list(
                &cfg,
                ListQuery {
                    resource_type,
                    query,
                    limit,
                },
            )
            .await?;
        }
        Commands::Recommend {
            query,
            resource_type,
            limit,
            alpha,
        } => {
            search::run_recommend(
                &cfg,
                RecommendRequest {
                    query,
                    limit,
                    resource_type,
                    alpha,
                },
            )
            .await?;
        }
        Commands::Sync { target, label } => {
            ingest::run_sync(&cfg, &target, label).await?;
        }
        Commands::Sources => {
            sources::list_sources(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
