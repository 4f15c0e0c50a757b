use std::fs::File;
use std::io::{self, BufReader, Write};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ct_cli::commands::{ack, export, import, sessions, start, status, stop, tags, watch};
use ct_cli::{Cli, Commands, Config};
use ct_core::{SystemClock, TimerService};
use ct_db::Database;

/// Open the configured database, ensuring the parent directory exists.
fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Open the timer service, resuming any session left active in the log.
fn open_service(config: &Config) -> Result<TimerService<Database, SystemClock>> {
    let db = open_database(config)?;
    let mut service = TimerService::open(db, SystemClock).context("failed to read event log")?;
    if config.bell {
        service.on_alarm(|_| {
            print!("\x07");
            let _ = io::stdout().flush();
        });
    }
    Ok(service)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Start(args) => {
            let mut service = open_service(&config)?;
            start::run(&mut out, &mut service, args, &config)?;
        }
        Commands::Status => {
            let mut service = open_service(&config)?;
            status::run(&mut out, &mut service)?;
        }
        Commands::Watch => {
            let mut service = open_service(&config)?;
            watch::run(&mut out, &mut service, config.poll_interval())?;
        }
        Commands::Stop => {
            let mut service = open_service(&config)?;
            stop::run(&mut out, &mut service)?;
        }
        Commands::Ack => {
            let mut service = open_service(&config)?;
            ack::run(&mut out, &mut service)?;
        }
        Commands::Sessions { json } => {
            let service = open_service(&config)?;
            sessions::run(&mut out, &service, *json, &Local)?;
        }
        Commands::Tags => {
            let service = open_service(&config)?;
            tags::run(&mut out, &service)?;
        }
        Commands::Export => {
            let db = open_database(&config)?;
            export::run(&mut out, &db)?;
        }
        Commands::Import { path } => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            let mut db = open_database(&config)?;
            import::run(&mut out, BufReader::new(file), &mut db)?;
        }
    }

    out.flush()?;
    Ok(())
}
