use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Maps a `LOG_LEVEL` value onto a filter directive. Unknown levels mean `info`.
pub fn parse_log_level(level: &str) -> &'static str {
    match level.trim().to_lowercase().as_str() {
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Installs the global subscriber once. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(parse_log_level(level)));
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_levels() {
        assert_eq!(parse_log_level("DEBUG"), "debug");
        assert_eq!(parse_log_level("warning"), "warn");
        assert_eq!(parse_log_level("error"), "error");
        assert_eq!(parse_log_level("verbose"), "info");
        assert_eq!(parse_log_level(""), "info");
    }
}
