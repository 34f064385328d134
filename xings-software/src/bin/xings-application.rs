//! xings-application: find, inspect, install and remove packages.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use xings_software::backend::PackageBackend;
use xings_software::config::Settings;
use xings_software::error::Error;
use xings_software::install::Installer;
use xings_software::packagekit::transaction::{Details, Options};
use xings_software::packagekit::{Client, Filters, PackageId};
use xings_software::{cli, logging};

#[derive(Debug, Parser)]
#[command(name = "xings-application")]
#[command(about = "Add or remove software", version)]
struct Args {
    #[command(flatten)]
    common: cli::CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SearchKind {
    Name,
    File,
    Details,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search for packages
    Search {
        #[arg(value_enum)]
        kind: SearchKind,
        #[arg(required = true)]
        terms: Vec<String>,
        /// Only show installed packages
        #[arg(long, conflicts_with = "available")]
        installed: bool,
        /// Only show packages that are not installed
        #[arg(long)]
        available: bool,
    },
    /// Describe packages
    Info {
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// List what packages depend on
    Depends {
        #[arg(required = true)]
        packages: Vec<String>,
        #[arg(long)]
        recursive: bool,
    },
    /// Install packages by name
    Install {
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Remove installed packages
    Remove {
        #[arg(required = true)]
        packages: Vec<String>,
    },
}

fn search_filters(installed: bool, available: bool) -> Filters {
    let mut filters = Filters::NEWEST;
    if installed {
        filters |= Filters::INSTALLED;
    } else if available {
        filters |= Filters::NOT_INSTALLED;
    }
    filters
}

async fn search(client: &Client, kind: SearchKind, terms: &[String], filters: Filters) -> Result<()> {
    let options = Options::interactive();
    let results = match kind {
        SearchKind::Name => client.search_names(filters, terms, &options).await?,
        SearchKind::File => client.search_files(filters, terms, &options).await?,
        SearchKind::Details => client.search_details(filters, terms, &options).await?,
    };
    if results.packages.is_empty() {
        return Err(Error::NotFound(terms.to_vec()).into());
    }
    cli::print_packages(&results.packages);
    Ok(())
}

async fn resolve(client: &Client, names: &[String]) -> Result<Vec<PackageId>> {
    let results = client
        .resolve(Filters::NEWEST, names, &Options::interactive())
        .await?;
    let missing: Vec<String> = names
        .iter()
        .filter(|name| !results.packages.iter().any(|p| &p.id.name == *name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(Error::NotFound(missing).into());
    }
    Ok(results.packages.into_iter().map(|p| p.id).collect())
}

fn print_details(details: &Details) {
    if let Some(id) = &details.package_id {
        println!("{}", id.printable());
    }
    println!("  Summary:  {}", details.summary);
    if !details.license.is_empty() {
        println!("  License:  {}", details.license);
    }
    if !details.url.is_empty() {
        println!("  URL:      {}", details.url);
    }
    if details.size > 0 {
        println!("  Size:     {} bytes", details.size);
    }
    if details.download_size > 0 {
        println!("  Download: {} bytes", details.download_size);
    }
    if !details.description.is_empty() {
        println!("\n{}", details.description.trim());
    }
    println!();
}

async fn info(client: &Client, names: &[String]) -> Result<()> {
    let ids = resolve(client, names).await?;
    let results = client.get_details(&ids, &Options::interactive()).await?;
    for details in &results.details {
        print_details(details);
    }
    Ok(())
}

async fn depends(client: &Client, names: &[String], recursive: bool) -> Result<()> {
    let ids = resolve(client, names).await?;
    let results = client
        .depends_on(Filters::NEWEST, &ids, recursive, &Options::interactive())
        .await?;
    cli::print_packages(&results.packages);
    Ok(())
}

async fn change(client: &Client, common: &cli::CommonArgs, names: &[String], install: bool) -> Result<()> {
    let settings = Settings::load();
    let confirm = common.confirmer();
    let (options, printer) = cli::interactive_options();
    let result = {
        let installer = Installer::new(client, &settings).with_options(options);
        if install {
            installer.install_package_names(names, confirm.as_ref()).await
        } else {
            installer.remove_packages(names, confirm.as_ref()).await
        }
    };
    let _ = printer.await;
    result?;
    println!("{}", if install { "Installed." } else { "Removed." });
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let Args { common, command } = Args::parse();
    logging::init(common.verbose);

    let result = async {
        let client = Client::connect().await?;
        match command {
            Command::Search {
                kind,
                terms,
                installed,
                available,
            } => search(&client, kind, &terms, search_filters(installed, available)).await,
            Command::Info { packages } => info(&client, &packages).await,
            Command::Depends { packages, recursive } => depends(&client, &packages, recursive).await,
            Command::Install { packages } => change(&client, &common, &packages, true).await,
            Command::Remove { packages } => change(&client, &common, &packages, false).await,
        }
    }
    .await;
    cli::finish(result)
}
