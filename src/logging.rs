//! Logging setup
//!
//! The library only emits through the `log` facade. Hosts that do not bring
//! their own logger can call [`init`].

use log::LevelFilter;

/// Install an `env_logger` writing to stderr.
///
/// `RUST_LOG` takes precedence; otherwise glpidesk logs at `debug` when
/// `debug` is set and `warn` otherwise.
/// Calling this twice, or after another logger is set, is a no-op.
pub fn init(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module("glpidesk", level)
        .format_timestamp_millis()
        .parse_default_env();

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
