//! Logging setup. Library crates only emit `tracing` events; the subscriber
//! is installed here.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. Logs always go to stderr so stdout stays
/// a clean JSON document.
///
/// `verbosity`: 0 = WARN, 1 = DEBUG, 2+ = TRACE. `RUST_LOG` is honored and
/// the flag adds directives on top of it.
pub fn init(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if verbosity > 0 {
        for target in ["sourcefiles_core", "sourcefiles"] {
            if let Ok(directive) = format!("{target}={level}").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
