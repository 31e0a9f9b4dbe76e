//! # ODCAF CLI (`odcaf`)
//!
//! Serves the Open Database of Cultural and Art Facilities over a REST API
//! and MCP, and queries it from the command line.
//!
//! ## Usage
//!
//! ```bash
//! odcaf [--config ./config/odcaf.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `odcaf serve` | Start the HTTP server (REST, MCP, widget) |
//! | `odcaf search "<query>"` | Free-text search |
//! | `odcaf get <id>` | Show one facility |
//! | `odcaf filter --province ON` | Structured filter |
//! | `odcaf types` | List facility types |
//! | `odcaf provinces` | List provinces with counts |
//! | `odcaf stats` | Dataset statistics |
//!
//! ## Examples
//!
//! ```bash
//! odcaf search "toronto museum" --limit 5
//! odcaf filter --province QC --type gallery
//! DATA_FILE_PATH=/srv/ODCAF_v1.0.csv PORT=8080 odcaf serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use odcaf_core::query::FilterCriteria;
use odcaf_server::traits::ToolContext;
use odcaf_server::{config, dataset, get, search, server, stats};

/// ODCAF server: Canadian cultural and art facilities over REST and MCP.
///
/// Settings come from an optional TOML file, then the `DATA_FILE_PATH`,
/// `HOST`, `PORT`, and `PUBLIC_URL` environment variables.
#[derive(Parser)]
#[command(
    name = "odcaf",
    about = "Serve and query the Open Database of Cultural and Art Facilities (ODCAF)",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Serves the REST API under `/api`, the MCP Streamable HTTP transport
    /// at `/mcp`, the MCP SSE transport at `/sse`, and the widget at
    /// `/widget`. Stops on Ctrl-C or SIGTERM.
    Serve,

    /// Search facilities by name, city, type, province, or subdivision.
    ///
    /// Every whitespace-separated term must match. Results are in dataset
    /// order.
    Search {
        /// The search query.
        query: String,

        /// Maximum number of results to show.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Show one facility by its identifier.
    Get {
        /// Facility identifier (the dataset's `Index` column).
        id: String,
    },

    /// Filter facilities by province, city, and/or type.
    ///
    /// At least one criterion is required. Province is an exact code match;
    /// city and type match substrings, ignoring case.
    Filter {
        /// Province/territory code (e.g. `ON`, `QC`).
        #[arg(long)]
        province: Option<String>,

        /// City name or part of one.
        #[arg(long)]
        city: Option<String>,

        /// Facility type or part of one (e.g. `museum`).
        #[arg(long = "type")]
        facility_type: Option<String>,

        /// Maximum number of results to show.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// List the distinct facility types.
    Types,

    /// List provinces and territories with facility counts.
    Provinces,

    /// Show dataset statistics.
    Stats,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;
    let index = dataset::load_dataset(&cfg)?;

    let ctx = ToolContext::new(index.clone(), cfg.limits.clone());
    match cli.command {
        Commands::Serve => server::run_server(&cfg, index).await,
        Commands::Search { query, limit } => search::run_search(&ctx, &query, limit),
        Commands::Get { id } => get::run_get(&ctx, &id),
        Commands::Filter {
            province,
            city,
            facility_type,
            limit,
        } => {
            let criteria = FilterCriteria {
                province,
                city,
                facility_type,
            };
            search::run_filter(&ctx, criteria, limit)
        }
        Commands::Types => stats::run_types(&ctx),
        Commands::Provinces => stats::run_provinces(&ctx),
        Commands::Stats => stats::run_stats(&ctx),
    }
}
