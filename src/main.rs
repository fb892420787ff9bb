use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use trackseek::index::SearchIndex;
use trackseek::index::stats::show_stats;
use trackseek::output::print_response;
use trackseek::query::{Query, execute_query};
use trackseek::server::{QueryClient, run_foreground};
use trackseek::utils::SearchConfig;

#[derive(Parser)]
#[command(name = "trackseek")]
#[command(about = "Album/artist lookups over an indexed track catalogue")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Index file, overrides the config
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// Dataset file, overrides the config
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve queries on the named pipes until interrupted
    Serve,
    /// Send a query to the running server
    Query {
        album: String,
        artist: String,
        /// Case-insensitive song title filter
        song: Option<String>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Answer a query directly from the files, without a server
    Lookup {
        album: String,
        artist: String,
        song: Option<String>,

        #[arg(long)]
        no_color: bool,
    },
    /// Walk every chain and report occupancy and integrity
    Stats {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trackseek=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = SearchConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(index) = cli.index {
        config.index_path = index;
    }
    if let Some(dataset) = cli.dataset {
        config.dataset_path = dataset;
    }

    // Commands that open the index are validated by `SearchIndex::open`
    match cli.command {
        Commands::Serve => {
            run_foreground(config)?;
        }
        Commands::Query {
            album,
            artist,
            song,
            no_color,
        } => {
            config.validate().context("Invalid configuration")?;
            let query = Query::new(album, artist, song.unwrap_or_default())?;
            let response = QueryClient::new(&config).send(&query)?;
            print_response(&response, !no_color)?;
        }
        Commands::Lookup {
            album,
            artist,
            song,
            no_color,
        } => {
            let query = Query::new(album, artist, song.unwrap_or_default())?;
            let index = SearchIndex::open(&config)?;
            let response = execute_query(&index, &config, &query);
            print_response(&response, !no_color)?;
        }
        Commands::Stats { json } => {
            let index = SearchIndex::open(&config)?;
            show_stats(&index, json)?;
        }
    }

    Ok(())
}
