mod commands;
mod config;
mod logging;
mod offline;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    cmd_day, cmd_delete, cmd_edit, cmd_log, cmd_offline_activate, cmd_offline_fetch,
    cmd_offline_install, cmd_offline_list, cmd_template_add, cmd_template_list, cmd_week,
};
use crate::config::Config;
use mealbook_core::service::MealService;

#[derive(Parser)]
#[command(
    name = "mealbook",
    version,
    about = "A weekly meal journal with a JSON API and offline asset cache"
)]
struct Cli {
    /// Directory holding week files and templates (default: platform data dir)
    #[arg(long, global = true, env = "MEALBOOK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "3006")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Directory of static client files served for non-API paths
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Log a meal
    Log {
        /// Time of day (HH:MM)
        time: String,
        /// What was eaten
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
        /// Date to log for (YYYY-MM-DD, today, yesterday; default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show meals for one day
    Day {
        /// Date (YYYY-MM-DD, today, yesterday; default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show meals for the week containing a date
    Week {
        /// Any date in the week (default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace a logged meal
    Edit {
        /// Date the meal is logged under
        date: String,
        /// Position of the meal within the day (see `day`)
        index: usize,
        /// New time of day (HH:MM)
        time: String,
        /// New description
        description: String,
        /// Move the meal to another date
        #[arg(long)]
        to: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a logged meal
    Delete {
        /// Date the meal is logged under
        date: String,
        /// Position of the meal within the day (see `day`)
        index: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage meal templates
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },
    /// Manage the offline asset cache
    Offline {
        /// Origin the client assets are served from
        #[arg(long, global = true, default_value = "http://localhost:3006/")]
        origin: String,
        /// Name of the current cache container
        #[arg(long, global = true, default_value = offline::CACHE_NAME)]
        cache: String,
        #[command(subcommand)]
        action: OfflineAction,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// Save a template (overwrites an existing one with the same name)
    Add {
        name: String,
        description: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved templates, most used first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum OfflineAction {
    /// Download every precached asset into the current cache
    Install {
        #[arg(long)]
        json: bool,
    },
    /// Delete every cache except the current one
    Activate {
        #[arg(long)]
        json: bool,
    },
    /// Fetch an asset, cache-first, and write its body to stdout
    Fetch {
        /// Path relative to the origin (e.g. ./index.html)
        path: String,
        /// Print response metadata as JSON instead of the body
        #[arg(long)]
        json: bool,
    },
    /// List caches and the entries of the current one
    List {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let level = if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    logging::init(level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.data_dir)?;
    let service = || MealService::open(&config.data_dir);

    match cli.command {
        Commands::Serve {
            port,
            bind,
            static_dir,
        } => {
            tracing::info!(data_dir = %config.data_dir.display(), "using data directory");
            server::start_server(service()?, port, &bind, static_dir).await
        }
        Commands::Log {
            time,
            description,
            date,
            json,
        } => cmd_log(&service()?, &time, &description.join(" "), date.as_deref(), json),
        Commands::Day { date, json } => cmd_day(&service()?, date.as_deref(), json),
        Commands::Week { date, json } => cmd_week(&service()?, date.as_deref(), json),
        Commands::Edit {
            date,
            index,
            time,
            description,
            to,
            json,
        } => cmd_edit(&service()?, &date, index, &time, &description, to.as_deref(), json),
        Commands::Delete { date, index, json } => cmd_delete(&service()?, &date, index, json),
        Commands::Template { action } => match action {
            TemplateAction::Add {
                name,
                description,
                json,
            } => cmd_template_add(&service()?, &name, &description, json),
            TemplateAction::List { json } => cmd_template_list(&service()?, json),
        },
        Commands::Offline {
            origin,
            cache,
            action,
        } => match action {
            OfflineAction::Install { json } => {
                cmd_offline_install(&config, &origin, &cache, json).await
            }
            OfflineAction::Activate { json } => {
                cmd_offline_activate(&config, &origin, &cache, json).await
            }
            OfflineAction::Fetch { path, json } => {
                cmd_offline_fetch(&config, &origin, &cache, &path, json).await
            }
            OfflineAction::List { json } => cmd_offline_list(&config, &origin, &cache, json).await,
        },
    }
}
