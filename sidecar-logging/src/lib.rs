// Copyright (c) 2021 MASSA LABS <info@massa.net>
//! Log setup and structured trace lines shared by the sidecar crates

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Trace a named event with a JSON payload: `sidecar_trace:<event>:<json>`
#[macro_export]
macro_rules! sidecar_trace {
    ($evt:expr, $params:tt) => {
        tracing::trace!("sidecar_trace:{}:{}", $evt, serde_json::json!($params));
    };
}

/// Verbosity from the `logging.level` setting: 0 error, 1 warn, 2 info,
/// 3 debug, 4 and above trace
pub fn level_filter(level: usize) -> LevelFilter {
    match level {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::WARN,
        2 => LevelFilter::INFO,
        3 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// `RUST_LOG` if set and valid, `level` otherwise
pub fn env_filter(level: usize) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_filter(level).to_string()))
}

/// Install the global fmt subscriber. Fails if one is already installed.
pub fn init_tracing(
    level: usize,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_thread_names(true)
        .try_init()
}
