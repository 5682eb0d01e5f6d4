//! Diagnostics for cbot via tracing-subscriber.
//!
//! Answers go to stdout so they can be piped into a shell; every log line
//! goes to stderr. The configured level (`log_level` / `CBOT_LOG_LEVEL`)
//! applies to cbot itself, while the HTTP and TLS stacks stay at `warn`
//! unless `RUST_LOG` asks for more.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Crates whose debug output drowns out cbot's own at `debug`/`trace`.
const QUIET_DEPENDENCIES: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Install the global subscriber. Call once, after config is loaded.
pub fn init(level: &str) -> Result<(), AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(level, rust_log.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// `RUST_LOG` wins when it parses; otherwise the configured `level`, with
/// the noisy dependencies capped at `warn`.
fn build_filter(level: &str, rust_log: Option<&str>) -> Result<EnvFilter, AppError> {
    let level = parse_level(level)?;

    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return Ok(filter);
        }
    }

    EnvFilter::try_new(directives_for(level))
        .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))
}

fn directives_for(level: LevelFilter) -> String {
    let mut directives = level.to_string().to_lowercase();
    if level > LevelFilter::WARN {
        for krate in QUIET_DEPENDENCIES {
            directives.push_str(&format!(",{krate}=warn"));
        }
    }
    directives
}

/// Validate a `log_level` value from config or the environment.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.trim().is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
