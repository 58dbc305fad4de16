//! Log output for the CLI
//!
//! Task progress is emitted as `tracing` events and written to stderr so
//! stdout stays free for command output. `RUST_LOG` takes precedence over the
//! verbosity flags.

use std::env;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Picks the level implied by `--verbose` and `--quiet`
pub fn level_for(verbose: bool, quiet: bool) -> Level {
    match (verbose, quiet) {
        (true, _) => Level::DEBUG,
        (false, true) => Level::ERROR,
        (false, false) => Level::INFO,
    }
}

/// Installs the global subscriber; later calls are ignored
pub fn init(verbose: bool, quiet: bool) {
    let level = level_for(verbose, quiet);

    let filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(format!("assetpipe={}", level))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(verbose)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_wins_over_quiet() {
        assert_eq!(level_for(true, true), Level::DEBUG);
        assert_eq!(level_for(false, true), Level::ERROR);
        assert_eq!(level_for(false, false), Level::INFO);
    }

    #[test]
    fn init_twice_is_harmless() {
        init(false, true);
        init(true, false);
    }
}
