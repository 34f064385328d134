//! Log setup shared by every binary.

use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "xings_software=debug"
    } else {
        "xings_software=info"
    }
}

/// Logs go to stderr so command output stays clean on stdout.
///
/// `RUST_LOG` wins over `verbose`. Calling this twice is harmless.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish()
        .try_init();
}
