//! Logger setup for hosts embedding the clock.

use std::sync::Once;

/// `env_filter` uses `env_logger` filter syntax, e.g. `"analog_clock=debug"`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Installs `env_logger` as the global logger. Later calls are ignored.
///
/// An explicit filter wins over `RUST_LOG`; with neither, `warn` is used.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        match config.env_filter.or_else(|| std::env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(log::LevelFilter::Warn);
            }
        }
        builder.write_style(config.write_style);
        if builder.try_init().is_err() {
            // Another logger was installed by the host first.
            return;
        }
        log::debug!("logging initialized");
    });
}
