//! Leadline CLI - serve the lead capture API and inspect what it stored

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use leadline::config::{self, LeadlineConfig};
use leadline::storage::SqliteStore;
use leadline::ui::{self, Icons};
use leadline::Provisioner;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "leadline")]
#[command(version)]
#[command(about = "Lead capture backend - stores form submissions with graceful fallback")]
#[command(long_about = r#"
Leadline receives the site's enquiry, popup and brochure forms and stores each
submission in SQLite, falling back to a JSON file when the database is
unavailable. Visitors are never shown a storage error.

Example usage:
  leadline init
  leadline serve --port 3000
  leadline provision
  leadline submissions --limit 20
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,
    },

    /// Create the submissions table if it does not exist
    Provision,

    /// Show the most recent stored submissions
    Submissions {
        /// Maximum number of rows
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    match cli.command.unwrap_or(Commands::Serve { port: None, host: None }) {
        Commands::Serve { port, host } => {
            let mut cfg = config::resolve_config(Some(&config_path))?;
            if let Some(port) = port {
                cfg.server.port = port;
            }
            if let Some(host) = host {
                cfg.server.host = host;
            }
            log_startup(&cfg);
            leadline::server::start_server(&cfg).await?;
        }

        Commands::Provision => {
            let cfg = config::resolve_config(Some(&config_path))?;
            if !cfg.database.enabled {
                ui::warn("Database is disabled in the configuration, nothing to provision");
                return Ok(());
            }

            config::ensure_db_dir(&cfg.database.path)?;
            let store = SqliteStore::open(cfg.database.pool_config());
            ui::header("Provisioning form_submissions");
            ui::info(Icons::DATABASE, "Database", &cfg.database.path.display().to_string());

            match Provisioner::new(Some(store.clone())).ensure_schema().await {
                Ok(()) => {
                    let count = store.count_submissions().await?;
                    ui::success(&format!("Table ready ({} submissions stored)", count));
                }
                Err(e) => {
                    ui::error(&format!("Provisioning failed: {}", e));
                    anyhow::bail!("provisioning failed");
                }
            }
        }

        Commands::Submissions { limit, format } => {
            let cfg = config::resolve_config(Some(&config_path))?;
            if !cfg.database.enabled {
                anyhow::bail!("database is disabled in the configuration");
            }

            let store = SqliteStore::open(cfg.database.pool_config());
            let rows = store.recent_submissions(limit).await?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("{} No submissions stored.", Icons::EMPTY);
            } else {
                ui::section(&format!(" {} Latest {} submissions ", Icons::INBOX, rows.len()));
                println!("{}", ui::submissions_table(&rows));
                println!(
                    "{}",
                    ui::dim(&format!("Fallback file: {}", cfg.fallback.path.display()))
                );
            }
        }

        Commands::Init { force } => {
            config::write_config(&config_path, &LeadlineConfig::default(), force)?;
            ui::success(&format!("Wrote {}", config_path.display()));
        }
    }

    Ok(())
}

fn log_startup(cfg: &LeadlineConfig) {
    tracing::info!("Starting leadline v{}", env!("CARGO_PKG_VERSION"));
    if cfg.database.enabled {
        tracing::info!("Database: {}", cfg.database.path.display());
    } else {
        tracing::warn!("Database: disabled, submissions go to the fallback file");
    }
    tracing::info!("Fallback file: {}", cfg.fallback.path.display());
    if let Some(dir) = &cfg.server.static_dir {
        tracing::info!("Static assets: {}", dir.display());
    }
}
