//! Logging bootstrap for binaries embedding the wallet core

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` (default `info`). `CSPO_LOG_JSON=1`
/// switches to JSON lines. Output goes to stderr so stdout stays free for
/// reports. Calling this more than once is harmless.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var("CSPO_LOG_JSON")
        .map(|value| value == "1")
        .unwrap_or(false);

    if use_json {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
