use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fit_sheets::cli::{commands, OutputFormat};
use fit_sheets::config::Settings;
use fit_sheets::storage::Tab;
use fit_sheets::sync::DEFAULT_SYNC_DAYS;

#[derive(Parser)]
#[command(name = "fit-sheets")]
#[command(author, version, about = "Sync fitness metrics into spreadsheet tabs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the stored tabs
    #[arg(long, global = true, env = "FIT_SHEETS_STORE")]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch recent days and merge them into the stored tabs
    Sync {
        /// Number of local days to fetch, ending today
        #[arg(long, default_value_t = DEFAULT_SYNC_DAYS)]
        days: u32,
        /// Sync a single tab (activity or sleep)
        #[arg(long)]
        tab: Option<Tab>,
        /// Merge without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Stored tab commands
    Tab {
        #[command(subcommand)]
        command: TabCommands,
    },
    /// Merge two table files offline and print the result
    Merge {
        /// Table currently stored
        #[arg(long)]
        existing: PathBuf,
        /// Freshly fetched batch
        #[arg(long)]
        new: PathBuf,
    },
}

#[derive(Subcommand)]
enum TabCommands {
    /// Print a stored tab
    Show {
        /// Tab to print (activity or sleep)
        tab: Tab,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

async fn run(cli: Cli) -> fit_sheets::Result<()> {
    match cli.command {
        Commands::Sync { days, tab, dry_run } => {
            let settings = Settings::from_env(cli.store)?;
            commands::sync_run(&settings, days, tab, dry_run).await
        }
        Commands::Tab { command } => match command {
            TabCommands::Show { tab, format } => {
                let settings = Settings::from_env(cli.store)?;
                commands::show_tab(&settings, tab, format).await
            }
        },
        Commands::Merge { existing, new } => commands::merge_files(&existing, &new).await,
    }
}

#[tokio::main]
async fn main() -> fit_sheets::Result<()> {
    let cli = Cli::parse();
    fit_sheets::logging::init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", fit_sheets::error::format_user_error(&e));
        std::process::exit(1);
    }

    Ok(())
}
