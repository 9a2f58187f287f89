//! # softcon CLI
//!
//! ## Usage
//!
//! ```bash
//! softcon --config ./config/softcon.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `softcon init` | Create the SQLite schema |
//! | `softcon upload` | Migrate the exported project array into the store |
//! | `softcon author create\|ensure\|link-user-id` | Maintain the author document |
//! | `softcon get <uid>` | Print a stored project |
//! | `softcon view <uid>` | Render a stored project as an HTML page |
//! | `softcon download <uid> <fileId>` | Save one attached file |
//! | `softcon serve` | Start the HTTP server |
//!
//! Logs go to stderr. `SOFTCON_LOG` takes an `EnvFilter` directive,
//! `SOFTCON_LOG_FORMAT=json` switches to JSON lines.

use std::env;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use softcon::config::{self, Config};
use softcon::progress::ProgressMode;
use softcon::{author, get, migrate, resolve, server, upload};

const DEFAULT_CONFIG: &str = "./config/softcon.toml";

#[derive(Parser)]
#[command(
    name = "softcon",
    about = "Migrate softcon project data and render stored projects",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/softcon.toml`; built-in defaults are used when
    /// that file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the SQLite schema. Idempotent.
    Init,

    /// Upload the exported project array.
    ///
    /// Writes the author document, then one normalized project per entry
    /// with a `uid`, in input order. Failed writes are reported and skipped.
    Upload {
        /// Input JSON file. Defaults to `[upload].input`.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Show counts without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr. Defaults to `human` on a TTY.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Maintain the author document.
    Author {
        #[command(subcommand)]
        action: AuthorAction,
    },

    /// Print a stored project.
    Get {
        /// Project uid.
        uid: String,
    },

    /// Render a stored project as an HTML page.
    View {
        uid: String,

        /// Write the page here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Open the preview dialog for this file id (e.g. `img-0`).
        #[arg(long)]
        preview: Option<String>,
    },

    /// Save one attached file of a stored project.
    Download {
        uid: String,
        /// File id (e.g. `img-0`).
        file_id: String,

        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum AuthorAction {
    /// Write the author document, replacing any existing one.
    Create,
    /// Write the author document only if it does not exist.
    Ensure,
    /// Set `userId` on the existing author document.
    LinkUserId,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SOFTCON_LOG")
        .unwrap_or_else(|_| EnvFilter::new("softcon=info,warn"));

    let format = env::var("SOFTCON_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn load(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => config::load_config(&path),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG);
            if path.exists() {
                config::load_config(&path)
            } else {
                tracing::debug!(path = DEFAULT_CONFIG, "no config file, using defaults");
                Ok(Config::default())
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = load(cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Upload {
            input,
            dry_run,
            progress,
        } => {
            upload::run_upload_cmd(&cfg, input.as_deref(), dry_run, progress).await?;
        }
        Commands::Author { action } => match action {
            AuthorAction::Create => author::run_author_create(&cfg).await?,
            AuthorAction::Ensure => author::run_author_ensure(&cfg).await?,
            AuthorAction::LinkUserId => author::run_author_link_user_id(&cfg).await?,
        },
        Commands::Get { uid } => {
            get::run_get(&cfg, &uid).await?;
        }
        Commands::View { uid, out, preview } => {
            resolve::run_view(&cfg, &uid, out.as_deref(), preview.as_deref()).await?;
        }
        Commands::Download {
            uid,
            file_id,
            out_dir,
        } => {
            resolve::run_download(&cfg, &uid, &file_id, &out_dir).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
