use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable holding a `tracing` filter directive, e.g. `PWSUM_LOG=debug`.
pub const LOG_ENV: &str = "PWSUM_LOG";

/// Installs a stderr subscriber so that stdout carries nothing but the report.
///
/// `PWSUM_LOG` takes precedence over `verbose`. Calling this more than once is a no-op.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
