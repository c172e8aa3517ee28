//! Command-line front end for the hopper engine.
//!
//! Every command opens the service under `--root`, runs one operation,
//! prints the result and drains pending writes before exiting.

use clap::{Parser, Subcommand};
use hopper_core::{init_logging, start_ticker, HopperConfig, HopperService, SharedService, Task};
use log::error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "hopper")]
#[command(about = "Daily hopper and streak tracker")]
struct Cli {
    /// Directory holding `data/`, `uploads/` and `logs/`.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current state as JSON
    Status,
    /// Create a task
    Create {
        name: String,
        /// Managed upload reference (`/uploads/<file>`)
        #[arg(long)]
        thumbnail: Option<String>,
    },
    /// Add to a task's hopper (negative amounts withdraw)
    Add {
        id: String,
        #[arg(allow_negative_numbers = true)]
        amount: f64,
    },
    /// Rename a task
    Rename { id: String, name: String },
    /// Replace or clear a task thumbnail
    Thumbnail {
        id: String,
        /// Omit to clear
        reference: Option<String>,
    },
    /// Delete a task
    Delete { id: String },
    /// Manage the background image
    Background {
        #[command(subcommand)]
        action: BackgroundAction,
    },
    /// Run one rollover pass
    Tick,
    /// Run the background ticker for a while
    Watch {
        #[arg(long, default_value_t = 60)]
        seconds: u64,
    },
}

#[derive(Subcommand)]
enum BackgroundAction {
    Set { reference: String },
    Clear,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let root = absolute_root(&cli.root)?;
    let config = HopperConfig::from_env(&root).map_err(|err| err.to_string())?;
    init_logging(&config.log_level, &config.log_dir)?;
    std::fs::create_dir_all(&config.upload_dir)
        .map_err(|err| format!("cannot create {}: {err}", config.upload_dir.display()))?;

    let service = HopperService::open(&config).map_err(|err| {
        error!("event=cli_open module=cli status=error error={}", err);
        err.to_string()
    })?;
    execute(service, cli.command, &config)
}

/// Runs `command` and drains pending writes, even when the command fails.
fn execute(
    mut service: HopperService,
    command: Commands,
    config: &HopperConfig,
) -> Result<(), String> {
    let result = match command {
        Commands::Status => {
            let state = service.state();
            serde_json::to_string_pretty(&state)
                .map(|json| println!("{json}"))
                .map_err(|err| err.to_string())
        }
        Commands::Create { name, thumbnail } => service
            .create_task(&name, thumbnail.as_deref())
            .map(|task| print_task(&task))
            .map_err(|err| err.to_string()),
        Commands::Add { id, amount } => service
            .add_to_hopper(&id, amount)
            .map(|outcome| {
                print_task(&outcome.task);
                if outcome.secured {
                    println!("day secured");
                }
            })
            .map_err(|err| err.to_string()),
        Commands::Rename { id, name } => service
            .rename_task(&id, &name)
            .map(|task| print_task(&task))
            .map_err(|err| err.to_string()),
        Commands::Thumbnail { id, reference } => service
            .set_thumbnail(&id, reference.as_deref())
            .map(|task| print_task(&task))
            .map_err(|err| err.to_string()),
        Commands::Delete { id } => service
            .delete_task(&id)
            .map(|()| println!("deleted {id}"))
            .map_err(|err| err.to_string()),
        Commands::Background {
            action: BackgroundAction::Set { reference },
        } => service
            .set_background(&reference)
            .map(|()| println!("background set"))
            .map_err(|err| err.to_string()),
        Commands::Background {
            action: BackgroundAction::Clear,
        } => {
            service.clear_background();
            println!("background cleared");
            Ok(())
        }
        Commands::Tick => {
            let changed = service.advance_all();
            println!("today={} changed={changed}", service.today());
            Ok(())
        }
        Commands::Watch { seconds } => {
            return watch(Arc::new(Mutex::new(service)), config.tick_interval, seconds);
        }
    };
    service.shutdown();
    result
}

fn watch(service: SharedService, interval: Duration, seconds: u64) -> Result<(), String> {
    let ticker = start_ticker(Arc::clone(&service), interval).map_err(|err| err.to_string())?;
    println!("ticking every {}s for {seconds}s", interval.as_secs());
    std::thread::sleep(Duration::from_secs(seconds));
    ticker.stop();

    match service.lock() {
        Ok(mut guard) => {
            guard.shutdown();
            Ok(())
        }
        Err(_) => Err("service lock poisoned".to_string()),
    }
}

fn print_task(task: &Task) {
    println!(
        "{} name={:?} hopper={} streak={} day={} secured={}",
        task.id, task.name, task.hopper, task.streak, task.day_key, task.secured_today
    );
}

fn absolute_root(root: &Path) -> Result<PathBuf, String> {
    if root.is_absolute() {
        return Ok(root.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(root))
        .map_err(|err| format!("cannot resolve working directory: {err}"))
}
