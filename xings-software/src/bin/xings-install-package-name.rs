//! xings-install-package-name: install packages by name.

use std::process::ExitCode;

use clap::Parser;

use xings_software::config::Settings;
use xings_software::install::Installer;
use xings_software::packagekit::Client;
use xings_software::{cli, logging};

#[derive(Debug, Parser)]
#[command(name = "xings-install-package-name")]
#[command(about = "Install packages by name", version)]
struct Args {
    #[command(flatten)]
    common: cli::CommonArgs,

    /// Package names to install
    #[arg(required = true)]
    names: Vec<String>,
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
            .install_package_names(&args.names, confirm.as_ref())
            .await;
        let _ = printer.await;
        result.map(|_| println!("Installed {}.", args.names.join(", ")))
    }
    .await;
    cli::finish(result)
}
