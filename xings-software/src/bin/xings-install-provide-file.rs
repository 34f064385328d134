//! xings-install-provide-file: install whatever package ships a file, or
//! provides a capability such as a codec, font or mime type handler.

use std::process::ExitCode;

use clap::Parser;

use xings_software::config::Settings;
use xings_software::install::{font_provide, gstreamer_provide, mimetype_provide, Installer};
use xings_software::packagekit::Client;
use xings_software::{cli, logging};

#[derive(Debug, Parser)]
#[command(name = "xings-install-provide-file")]
#[command(about = "Install the package that provides a file", version)]
struct Args {
    #[command(flatten)]
    common: cli::CommonArgs,

    /// Treat arguments as mime types
    #[arg(long, group = "kind")]
    mime_type: bool,

    /// Treat arguments as font languages, e.g. `ja`
    #[arg(long, group = "kind")]
    font: bool,

    /// Treat arguments as GStreamer codecs, e.g. `decoder-audio/mpeg`
    #[arg(long, group = "kind")]
    codec: bool,

    /// Absolute paths, or the values selected above
    #[arg(required = true)]
    values: Vec<String>,
}

impl Args {
    fn provides(&self) -> Option<Vec<String>> {
        let convert: fn(&str) -> String = if self.mime_type {
            mimetype_provide
        } else if self.font {
            font_provide
        } else if self.codec {
            gstreamer_provide
        } else {
            return None;
        };
        Some(self.values.iter().map(|v| convert(v)).collect())
    }
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
        let installer = Installer::new(&client, &settings).with_options(options);
        let result = match args.provides() {
            Some(provides) => installer.install_what_provides(&provides, confirm.as_ref()).await,
            None => installer.install_provide_files(&args.values, confirm.as_ref()).await,
        };
        drop(installer);
        let _ = printer.await;
        result.map(|_| println!("Installed."))
    }
    .await;
    cli::finish(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_become_provide_strings() {
        let args = Args::try_parse_from(["xings-install-provide-file", "--font", "ja", "ko"]).unwrap();
        assert_eq!(
            args.provides(),
            Some(vec!["font(:lang=ja)".to_string(), "font(:lang=ko)".to_string()])
        );

        let args = Args::try_parse_from(["xings-install-provide-file", "/usr/bin/convert"]).unwrap();
        assert_eq!(args.provides(), None);

        assert!(Args::try_parse_from(["xings-install-provide-file", "--font", "--codec", "x"]).is_err());
    }
}
