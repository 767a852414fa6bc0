//! Squidread CLI - manage the reading library from the command line

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "squidread")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Library data directory (shared with the server)
    #[arg(
        long,
        global = true,
        env = "SQUIDREAD_DATA_DIR",
        default_value = "./squidread_data"
    )]
    data_dir: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import EPUB files into the library
    Import {
        /// EPUB files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List books, most recently used first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Open a book and print where reading resumes
    Open {
        /// Book id; defaults to the last opened book
        id: Option<String>,
    },

    /// Save a reading location for a book
    Locate {
        /// Book id
        id: String,

        /// Location token, usually an epubcfi(...) string
        token: String,
    },

    /// Write a book's EPUB bytes to a file
    Export {
        /// Book id
        id: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Remove a book from the library
    Delete {
        /// Book id
        id: String,
    },

    /// Print the library id files would get, without importing them
    Id {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "squidread_cli=debug,squidread_core=debug"
    } else {
        "squidread_cli=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let ctx = commands::Context::new(&cli.data_dir);
    match cli.command {
        Commands::Import { files } => commands::import(&ctx, &files).await,
        Commands::List { json } => commands::list(&ctx, json).await,
        Commands::Open { id } => commands::open(&ctx, id.as_deref()).await,
        Commands::Locate { id, token } => commands::locate(&ctx, &id, &token).await,
        Commands::Export { id, output } => commands::export(&ctx, &id, &output).await,
        Commands::Delete { id } => commands::delete(&ctx, &id).await,
        Commands::Id { files } => commands::id(&files),
    }
}
