//! `tracing-subscriber` installation (spec §10.1).

use crate::config::LogFormat;
use tracing_subscriber::EnvFilter;

pub fn init(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt().with_env_filter(filter).json().with_current_span(true).init();
        }
        LogFormat::Human => {
            tracing_subscriber::fmt().with_env_filter(filter).compact().init();
        }
    }
}
