//! Structured logging and tracing for Tempest.
//!
//! Console output with uptime timestamps and module paths, plus JSON file
//! logging in debug builds for post-mortem analysis. The configured log level
//! applies unless `RUST_LOG` is set.

use std::path::Path;

use tempest_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names a level.
///
/// rapier's internal parry crate is noisy at debug level.
pub const DEFAULT_FILTER: &str = "info,parry3d=warn";

/// File name of the JSON log written in debug builds.
pub const LOG_FILE_NAME: &str = "tempest.log";

/// Initialize the tracing subscriber.
///
/// Installs, in order:
/// - an `EnvFilter` built from `RUST_LOG`, falling back to [`filter_from_config`]
/// - a console layer stamped with time since startup
/// - in debug builds, a JSON layer writing `<log_dir>/tempest.log`
///
/// Directory or file creation failures drop the file layer silently; the
/// console layer is always installed. Calling this twice panics, as with any
/// global subscriber.
///
/// # Arguments
///
/// * `log_dir` - Optional directory for JSON log files (debug builds only)
/// * `debug_build` - Whether this is a debug build (enables file logging)
/// * `config` - Optional configuration to use for log level override
///
/// # Examples
///
/// ```no_run
/// use tempest_log::init_logging;
/// use tempest_config::Config;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = filter_from_config(config);

    // RUST_LOG beats the configured level.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true) // headless runs stay on "main"
        .with_level(true)
        .with_timer(fmt::time::uptime()); // seconds since the scene started

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    // One JSON object per event, truncated on every start.
    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE_NAME))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false) // escape codes would break the JSON
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// Resolve the filter string from the config's `debug.log_level`.
///
/// The configured level is widened with `parry3d=warn` so a `debug` run is
/// not flooded by collision-detection internals. An empty level means
/// [`DEFAULT_FILTER`].
pub fn filter_from_config(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.is_empty() => {
            format!("{},parry3d=warn", config.debug.log_level)
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Create an `EnvFilter` with the default filter string.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn test_default_log_level() {
        let filter_str = format!("{}", default_env_filter());
        assert!(filter_str.contains("info"));
        assert!(filter_str.contains("parry3d=warn"));
    }

    #[test]
    fn test_filter_from_config() {
        let mut config = Config::default();
        config.debug.log_level = "debug".to_string();
        assert_eq!(filter_from_config(Some(&config)), "debug,parry3d=warn");

        config.debug.log_level.clear();
        assert_eq!(filter_from_config(Some(&config)), DEFAULT_FILTER);
        assert_eq!(filter_from_config(None), DEFAULT_FILTER);
    }

    #[test]
    fn test_env_filter_parsing() {
        let valid_filters = [
            "info",
            "debug,tempest_particles=trace",
            "warn,tempest_physics=debug",
            "error",
        ];

        for filter_str in &valid_filters {
            let result = EnvFilter::try_from(*filter_str);
            assert!(result.is_ok(), "Failed to parse filter: {}", filter_str);
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for SharedBuf {
        type Writer = SharedBuf;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_json_layer_emits_structured_fields() {
        let buf = SharedBuf::default();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(buf.clone())
                .with_ansi(false)
                .json(),
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(spawned = 160, "particle frame");
        });

        let bytes = buf.0.lock().unwrap().clone();
        let line = String::from_utf8(bytes).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["fields"]["spawned"], 160);
        assert_eq!(value["fields"]["message"], "particle frame");
    }
}
