//! xings-install-file: install local package files.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use xings_software::config::Settings;
use xings_software::install::Installer;
use xings_software::packagekit::Client;
use xings_software::{cli, logging};

#[derive(Debug, Parser)]
#[command(name = "xings-install-file")]
#[command(about = "Install local package files", version)]
struct Args {
    #[command(flatten)]
    common: cli::CommonArgs,

    /// Package files such as .rpm or .deb
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.common.verbose);

    let settings = Settings::load();
    let confirm = args.common.confirmer();
    let result = async {
        let client = Client::connect().await?;
        let (options, printer) = cli::interactive_options();
        let result = Installer::new(&client, &settings)
            .with_options(options)
            .install_files(&args.files, confirm.as_ref())
            .await;
        let _ = printer.await;
        result.map(|_| println!("Installed {} file(s).", args.files.len()))
    }
    .await;
    cli::finish(result)
}
