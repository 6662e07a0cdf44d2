//! `tracing` subscriber setup for Lambda functions.
//!
//! Everything written to stdout ends up in CloudWatch Logs. The filter comes
//! from `RUST_LOG`, falling back to the function's configured
//! `AWS_LAMBDA_LOG_LEVEL`, then to `info`. `AWS_LAMBDA_LOG_FORMAT=JSON`
//! switches to one JSON object per line.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::runtime::Config;

/// Installs the global subscriber from the process environment.
///
/// Calling it more than once is harmless; only the first call installs.
pub fn init() {
    init_with(&Config::from_env());
}

/// Installs the global subscriber using `config` for level and format.
pub fn init_with(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    // Lambda prefixes every line with its own timestamp.
    let registry = tracing_subscriber::registry().with(filter);
    let res = if config.json_logs() {
        registry
            .with(fmt::layer().json().without_time().with_current_span(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().without_time().with_ansi(false))
            .try_init()
    };

    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn default_directive(config: &Config) -> String {
    config
        .log_level()
        .map(|l| l.to_ascii_lowercase())
        .unwrap_or_else(|| "info".to_owned())
}
