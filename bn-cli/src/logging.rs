use std::io;
use tracing_subscriber::EnvFilter;

/// Install the stderr logger. Without `-v` flags the filter comes from `RUST_LOG`,
/// falling back to `error`.
pub fn set_log_level(verbosity: u8) {
    let log_string = if verbosity == 0 {
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| "error".to_owned())
    } else {
        match verbosity {
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        }
        .to_owned()
    };
    tracing_log::LogTracer::init().ok();
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(log_string))
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}
