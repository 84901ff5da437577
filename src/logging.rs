use std::env;
use tracing::Level;

pub const LOG_ENV_VAR: &str = "CEMENT_MICROGEN_LOG";

/// Initializes logging based on the CEMENT_MICROGEN_LOG environment variable.
/// - `true` enables info-level output, a level name (`error` .. `trace`) picks that level.
/// - `false`, an unset variable or an unknown value leaves logging off.
/// - To see logs in tests, run: CEMENT_MICROGEN_LOG=debug cargo test -- --nocapture
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging() {
    let level = env::var(LOG_ENV_VAR).ok().and_then(|value| parse_level(&value));
    if let Some(level) = level {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .try_init();
    }
}

fn parse_level(value: &str) -> Option<Level> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "info" => Some(Level::INFO),
        "error" => Some(Level::ERROR),
        "warn" => Some(Level::WARN),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
