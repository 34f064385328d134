//! xings-install-flatpakref: install an application from a `.flatpakref` file.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use xings_software::error::Error;
use xings_software::flatpak::{default_arch, FlatpakInstaller, FlatpakRef, Installation};
use xings_software::{cli, logging};

#[derive(Debug, Parser)]
#[command(name = "xings-install-flatpakref")]
#[command(about = "Install an application from a .flatpakref file", version)]
struct Args {
    #[command(flatten)]
    common: cli::CommonArgs,

    /// Install for the current user only
    #[arg(long)]
    user: bool,

    /// The .flatpakref file
    file: PathBuf,
}

fn describe(flatpak_ref: &FlatpakRef) {
    eprintln!("{}", flatpak_ref.display_name());
    if let Some(comment) = &flatpak_ref.comment {
        eprintln!("  {}", comment);
    }
    eprintln!("  Ref:    {}", flatpak_ref.ref_string(default_arch()));
    eprintln!("  Source: {}", flatpak_ref.url);
    if let Some(homepage) = &flatpak_ref.homepage {
        eprintln!("  Web:    {}", homepage);
    }
    if flatpak_ref.gpg_key.is_none() {
        eprintln!("  Warning: the repository is not signed.");
    }
}

async fn run(args: &Args) -> Result<()> {
    let flatpak_ref = FlatpakRef::load(&args.file)?;
    describe(&flatpak_ref);

    let question = format!("Install {}?", flatpak_ref.display_name());
    if !args.common.assume_yes && !cli::ask(&question) {
        return Err(Error::Declined.into());
    }

    let installation = if args.user {
        Installation::User
    } else {
        Installation::System
    };
    let installed = FlatpakInstaller::new(installation)
        .install(&args.file, &flatpak_ref)
        .await?;
    if installed {
        println!("Installed {}.", flatpak_ref.display_name());
    } else {
        println!("{} is already installed.", flatpak_ref.display_name());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.common.verbose);
    cli::finish(run(&args).await)
}
