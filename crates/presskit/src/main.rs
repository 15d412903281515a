//! presskit - edit press-kit drafts with auto-save.
//!
//! This is the main entry point for the presskit CLI.

mod commands;
mod draft;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use commands::{handle_edit, handle_field, init_logging, show_config, show_draft, Context};
use presskit_autosave::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "presskit")]
#[command(author, version, about = "Press-kit draft editor with auto-save", long_about = None)]
struct Cli {
    /// Log to stderr at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory drafts are stored in
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit a draft, reading commands from stdin
    Edit {
        /// Draft name
        draft: String,
    },
    /// Commit a single field on every line read from stdin
    Field {
        /// Draft name
        draft: String,
        /// Field to edit (title, bio or genre)
        field: String,
    },
    /// Print a stored draft
    Show {
        /// Draft name
        draft: String,
    },
    /// Show the effective auto-save configuration
    Config,
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        print_version();
        return Ok(());
    }

    let cwd = std::env::current_dir()?;
    let (config, sources) = Config::load(Some(&cwd)).await?;

    if let Some(log_file) = init_logging(cli.verbose, config.log_level.as_deref()) {
        tracing::debug!(path = %log_file.display(), "Logging to file");
    }

    let data_dir = cli
        .data_dir
        .or_else(|| config.data_dir.clone())
        .or_else(presskit_util::path::data_dir)
        .context("Could not determine a data directory, pass --data-dir")?;
    let autosave = config.autosave()?;

    let ctx = Context {
        data_dir,
        autosave,
        config,
        sources,
    };

    match cli.command {
        Commands::Edit { draft } => handle_edit(&ctx, &draft).await,
        Commands::Field { draft, field } => handle_field(&ctx, &draft, &field).await,
        Commands::Show { draft } => show_draft(&ctx, &draft).await,
        Commands::Config => show_config(&ctx),
        Commands::Version => Ok(()),
    }
}

fn print_version() {
    println!("presskit {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Press-kit drafts that save themselves.");
}
