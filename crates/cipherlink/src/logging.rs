//! Diagnostic logging setup shared by the three binaries.
//!
//! Diagnostics always go to stderr: the engine's stdout carries protocol
//! replies and the coordinator's stdout is the user's terminal.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Env var selecting the diagnostic level when `RUST_LOG` is unset.
pub const LOG_LEVEL_ENV: &str = "CIPHERLINK_LOG";

fn level_from(value: Option<&str>) -> &'static str {
    match value {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("error") => "error",
        _ => "warn",
    }
}

fn filter_directives(level: &str) -> String {
    format!(
        "cipherlink={level},cipherlink_engine={level},cipherlink_logger={level}",
        level = level
    )
}

/// Initialize tracing with CIPHERLINK_LOG and LOG_FORMAT support.
pub fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = level_from(std::env::var(LOG_LEVEL_ENV).ok().as_deref());
        EnvFilter::new(filter_directives(level))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_defaults_to_warn() {
        assert_eq!(level_from(None), "warn");
        assert_eq!(level_from(Some("verbose")), "warn");
        assert_eq!(level_from(Some("debug")), "debug");
    }

    #[test]
    fn directives_cover_every_binary() {
        insta::assert_snapshot!(
            filter_directives("info"),
            @"cipherlink=info,cipherlink_engine=info,cipherlink_logger=info"
        );
    }
}
