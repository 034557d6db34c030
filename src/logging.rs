use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter, e.g. `PADD_LOG=padd=debug`
pub const LOG_ENV: &str = "PADD_LOG";

/// Install the stderr subscriber. `PADD_LOG` wins over `default_directive`;
/// an unparseable directive falls back to `warn`. Calling this twice is
/// harmless.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
