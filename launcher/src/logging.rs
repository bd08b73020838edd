//! Diagnostic tracing for debugging the launcher itself.
//!
//! Tracing is for whoever maintains the launcher: it goes to stderr, is off
//! (`warn`) unless asked for, and never replaces the operator narration that
//! [`crate::console::Console`] prints. `RUST_LOG` always wins over `--verbose`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("warn,launcher=debug")
    } else {
        EnvFilter::new("warn")
    }
}

/// Install the global subscriber (compact, stderr).
///
/// ```bash
/// RUST_LOG=launcher::io::process=debug launcher start
/// ```
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .compact(),
        )
        .init();
}
