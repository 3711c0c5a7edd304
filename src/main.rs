mod app;
mod backup;
mod clipboard;
mod config;
mod error;
mod prompt;
mod repository;
mod search;
mod storage;
mod ui;
mod view;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use tracing_subscriber::EnvFilter;

use app::App;
use config::Config;
use prompt::PromptDraft;
use repository::PromptRepository;
use storage::{JsonFileStore, PromptStorage};
use view::ListView;

#[derive(Parser)]
#[command(name = "promptbox", about = "Keep, search and copy your prompts")]
struct Cli {
    /// Directory holding storage.json and the log file
    #[arg(long, global = true, env = "PROMPTBOX_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// Where backups are written
    #[arg(long, global = true, env = "PROMPTBOX_EXPORT_DIR")]
    export_dir: Option<PathBuf>,
    /// Copy through the terminal (OSC 52) instead of the system clipboard
    #[arg(long, global = true, env = "PROMPTBOX_OSC52")]
    osc52_clipboard: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the prompt popup (default when no subcommand is given)
    Ui,
    /// Print prompts, newest first
    List {
        #[arg(long, short, default_value = "")]
        query: String,
    },
    /// Save a new prompt
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Comma-separated, `、` also accepted
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Delete a prompt by id
    Delete { id: i64 },
    /// Write prompt-backup-YYYY-MM-DD.json to the export directory
    Export,
    /// Merge a backup file into the collection
    Import { file: PathBuf },
    /// Print the popup markup for the current list
    Render {
        #[arg(long, short, default_value = "")]
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = Config::resolve(cli.data_dir, cli.export_dir);
    let command = cli.command.unwrap_or(Command::Ui);
    init_tracing(&config, matches!(command, Command::Ui))?;

    let store = JsonFileStore::new(config.storage_path());
    tracing::debug!(path = %store.path().display(), "Opening prompt storage");
    let repository = PromptRepository::open(PromptStorage::new(store))
        .await
        .wrap_err("failed to load prompts")?;

    match command {
        Command::Ui => {
            let clipboard = clipboard::open(cli.osc52_clipboard);
            let mut app = App::new(repository, clipboard, config.export_dir).await?;
            ui::run(&mut app).await?;
        }
        Command::List { query } => {
            let prompts = repository.list().await?;
            let list_view = ListView::build(&prompts, &query);
            if let Some(message) = list_view.message() {
                println!("{message}");
            }
            for p in list_view.items() {
                println!("{}  {}  [{}]", p.id, p.title, p.tags.join(", "));
                println!("    {}", view::preview(&p.content, 76));
            }
        }
        Command::Add {
            title,
            content,
            tags,
        } => {
            let prompt = repository
                .create(&PromptDraft::new(title, content, tags))
                .await?;
            println!("Saved prompt {}", prompt.id);
        }
        Command::Delete { id } => {
            if repository.delete(id).await? {
                println!("Deleted prompt {id}");
            } else {
                println!("No prompt with id {id}");
            }
        }
        Command::Export => {
            let prompts = repository.list().await?;
            let path = backup::export(&prompts, &config.export_dir, Utc::now()).await?;
            println!("{}", path.display());
        }
        Command::Import { file } => {
            let incoming = backup::read_backup(&file).await?;
            let summary = repository.import(incoming).await?;
            println!(
                "Imported {} prompts ({} duplicates, {} invalid skipped)",
                summary.added, summary.duplicates, summary.invalid
            );
        }
        Command::Render { query } => {
            let prompts = repository.list().await?;
            print!("{}", view::render_html(&ListView::build(&prompts, &query)));
        }
    }

    Ok(())
}

const DEFAULT_LOG_FILTER: &str = "promptbox=info";

/// `PROMPTBOX_LOG` when it parses, `promptbox=info` otherwise.
fn log_filter(from_env: Option<&str>) -> EnvFilter {
    from_env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// The popup owns the terminal, so it logs to a file; the other commands
/// log to stderr.
fn init_tracing(config: &Config, to_file: bool) -> Result<()> {
    let from_env = std::env::var("PROMPTBOX_LOG").ok();
    let filter = || log_filter(from_env.as_deref());

    if to_file {
        std::fs::create_dir_all(&config.data_dir).wrap_err_with(|| {
            format!("failed to create data directory {}", config.data_dir.display())
        })?;
        let log_path = config.log_path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .wrap_err_with(|| format!("failed to open log file {}", log_path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}
