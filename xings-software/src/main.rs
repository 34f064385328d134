//! xings-update-notifier: watches for updates for the running session.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;

use xings_software::config::Settings;
use xings_software::packagekit::Client;
use xings_software::scheduler::Plan;
use xings_software::state::State;
use xings_software::updates_manager::{self, UpdatesManager};
use xings_software::{cli, logging};

#[derive(Debug, Parser)]
#[command(name = "xings-update-notifier")]
#[command(about = "Notify about available software updates", version)]
struct Args {
    #[command(flatten)]
    common: cli::CommonArgs,

    /// Settings file to use instead of the default one
    #[arg(long)]
    settings: Option<PathBuf>,

    /// State file to use instead of the default one
    #[arg(long)]
    state: Option<PathBuf>,

    /// Check once, print what was found and exit
    #[arg(long)]
    check: bool,
}

async fn check_now(settings_path: PathBuf, state_path: PathBuf) -> Result<()> {
    let settings = Settings::load_from(&settings_path)?;
    let mut state = State::load_from(&state_path)?;
    let client = Client::connect().await?;

    let plan = Plan {
        refresh_cache: true,
    };
    let outcome = updates_manager::check_once(&client, &settings, &mut state, plan, Utc::now()).await?;
    state.save_to(&state_path)?;

    println!("{}", outcome.updates.summary_body());
    for update in &outcome.updates.packages {
        println!("{:<12} {}", update.info, update.id.printable());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.common.verbose);

    let settings_path = args.settings.unwrap_or_else(Settings::default_path);
    let state_path = args.state.unwrap_or_else(State::default_path);

    let result = if args.check {
        check_now(settings_path, state_path).await
    } else {
        match UpdatesManager::new(settings_path, state_path).await {
            Ok(manager) => manager.run().await,
            Err(e) => Err(e),
        }
    };
    cli::finish(result)
}
