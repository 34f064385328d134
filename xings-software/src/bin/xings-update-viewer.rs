//! xings-update-viewer: review and apply pending updates.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use xings_software::backend::PackageBackend;
use xings_software::config::Settings;
use xings_software::error::Error;
use xings_software::install::{additional_packages, Confirmation, Verb};
use xings_software::packagekit::transaction::{Options, UpdateDetail};
use xings_software::packagekit::{Client, Filters, Restart};
use xings_software::policy::{download_flags, install_flags, simulate_flags};
use xings_software::session::SessionManager;
use xings_software::updates::UpdateInfo;
use xings_software::{cli, logging};

#[derive(Debug, Parser)]
#[command(name = "xings-update-viewer")]
#[command(about = "Review and install software updates", version)]
struct Args {
    #[command(flatten)]
    common: cli::CommonArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List pending updates, most important first
    List {
        /// Wait for Enter before exiting, for a terminal opened just for this
        #[arg(long)]
        wait: bool,
    },
    /// Show the advisory text for updates
    Details {
        /// Package names or package ids
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Install updates
    Apply {
        /// Only update these packages
        #[arg(long, num_args = 1..)]
        only: Vec<String>,

        /// Download now and install during the next reboot
        #[arg(long)]
        offline: bool,
    },
}

async fn pending(client: &Client, refresh: bool) -> Result<UpdateInfo> {
    let options = Options::interactive();
    if refresh {
        client.refresh_cache(false, &options).await?;
    }
    let results = client.get_updates(Filters::NONE, &options).await?;
    Ok(UpdateInfo::from_packages(results.packages))
}

async fn list(client: &Client) -> Result<()> {
    let updates = pending(client, false).await?;
    if !updates.has_updates() {
        println!("Your software is up to date.");
        return Ok(());
    }
    println!("{}", updates.summary_body());
    for update in &updates.packages {
        println!("{:<12} {:<40} {}", update.info, update.id.printable(), update.summary);
    }
    Ok(())
}

fn print_detail(detail: &UpdateDetail) {
    println!("{}", detail.package_id.printable());
    if !detail.update_text.is_empty() {
        println!("\n{}\n", detail.update_text.trim());
    }
    if detail.restart.needs_reboot() {
        println!("  Requires a restart");
    } else if detail.restart.needs_logout() {
        println!("  Requires logging out");
    }
    if !detail.issued.is_empty() {
        println!("  Issued:   {}", detail.issued);
    }
    if !detail.updated.is_empty() {
        println!("  Updated:  {}", detail.updated);
    }
    for (label, urls) in [
        ("Vendor", &detail.vendor_urls),
        ("Bug", &detail.bugzilla_urls),
        ("CVE", &detail.cve_urls),
    ] {
        for url in urls {
            println!("  {:<9} {}", format!("{}:", label), url);
        }
    }
    if !detail.changelog.is_empty() {
        println!("\nChangelog:\n{}", detail.changelog.trim());
    }
    println!();
}

async fn details(client: &Client, packages: &[String]) -> Result<()> {
    let updates = pending(client, false).await?;
    let (ids, missing) = updates.select(packages);
    if !missing.is_empty() {
        return Err(Error::NotFound(missing).into());
    }
    let results = client.get_update_detail(&ids, &Options::interactive()).await?;
    for detail in &results.update_details {
        print_detail(detail);
    }
    Ok(())
}

async fn apply(client: &Client, common: &cli::CommonArgs, only: &[String], offline: bool) -> Result<()> {
    let settings = Settings::load();
    let updates = pending(client, true).await?;
    if !updates.has_updates() {
        println!("Your software is up to date.");
        return Ok(());
    }

    let ids = if only.is_empty() {
        updates.package_ids()
    } else {
        let (ids, missing) = updates.select(only);
        if !missing.is_empty() {
            return Err(Error::NotFound(missing).into());
        }
        ids
    };

    let simulated = client
        .update_packages(simulate_flags(&settings), &ids, &Options::interactive())
        .await?;
    let confirmation = Confirmation {
        verb: Verb::Install,
        requested: vec![format!("{} update(s)", ids.len())],
        additional: additional_packages(&simulated, &ids),
    };
    if !common.confirmer().confirm(&confirmation) {
        return Err(Error::Declined.into());
    }

    let (options, printer) = cli::interactive_options();
    let result = if offline {
        client.update_packages(download_flags(&settings), &ids, &options).await
    } else {
        client.update_packages(install_flags(&settings), &ids, &options).await
    };
    drop(options);
    let _ = printer.await;
    let results = result?;

    if offline {
        client.offline().await?.trigger("reboot").await?;
        println!("Updates will be installed during the next restart.");
        return Ok(());
    }

    let restart = results.restart_required();
    if !restart.needs_reboot() && !restart.needs_logout() {
        println!("Updates installed.");
        return Ok(());
    }
    offer_restart(common, restart).await
}

async fn offer_restart(common: &cli::CommonArgs, restart: Restart) -> Result<()> {
    let session = SessionManager::detect().await?;
    if restart.needs_reboot() {
        eprintln!("The computer needs to restart to finish installing updates.");
        if common.assume_yes || cli::ask("Restart now?") {
            session.reboot().await?;
        }
    } else if restart.needs_logout() {
        eprintln!("You need to log out to finish installing updates.");
        if common.assume_yes || cli::ask("Log out now?") {
            session.logout().await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let Args { common, command } = Args::parse();
    logging::init(common.verbose);

    let command = command.unwrap_or(Command::List { wait: false });
    let wait = matches!(command, Command::List { wait: true });
    let result = async {
        let client = Client::connect().await?;
        match command {
            Command::List { .. } => list(&client).await,
            Command::Details { packages } => details(&client, &packages).await,
            Command::Apply { only, offline } => apply(&client, &common, &only, offline).await,
        }
    }
    .await;
    let code = cli::finish(result);
    if wait {
        cli::pause("Press Enter to close.");
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_can_wait_for_the_user() {
        let args = Args::try_parse_from(["xings-update-viewer", "list", "--wait"]).unwrap();
        assert!(matches!(args.command, Some(Command::List { wait: true })));

        let args = Args::try_parse_from(["xings-update-viewer"]).unwrap();
        assert!(args.command.is_none());
    }
}
