//! Log output

use tracing_subscriber::EnvFilter;

use crate::cli::GlobalOpts;

/// Default filter for the verbosity flags; `RUST_LOG` overrides it
pub fn default_filter(global: &GlobalOpts) -> &'static str {
    if global.verbose {
        "zaphod=debug"
    } else if global.quiet {
        "zaphod=warn"
    } else {
        "zaphod=info"
    }
}

/// Install the stderr log subscriber
pub fn init_logging(global: &GlobalOpts) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(global)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
