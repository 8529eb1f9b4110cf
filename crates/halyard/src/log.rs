//! # Log Surface
//!
//! Thin funnel from the drivers onto `tracing`, gated by the per-call
//! [`Config::log_level`] threshold. Nothing here is process-global; the
//! configuration travels with the call.
//!
//! [`Config::log_level`]: halyard_core::Config

use halyard_core::{Config, LogLevel};

/// Emit `message` at `level` if the configuration lets it through.
///
/// `Notice` has no native `tracing` level and is carried on the info
/// channel with a marker field.
pub(crate) fn emit(config: &Config, level: LogLevel, message: &str) {
    if !config.logs(level) {
        return;
    }
    match level {
        LogLevel::Debug => tracing::debug!("{message}"),
        LogLevel::Info => tracing::info!("{message}"),
        LogLevel::Notice => tracing::info!(notice = true, "{message}"),
        LogLevel::Warning => tracing::warn!("{message}"),
        LogLevel::Error => tracing::error!("{message}"),
        LogLevel::Silent => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_level_is_never_emitted() {
        // Nothing observable; this is a no-panic check for the funnel.
        let cfg = Config::new();
        emit(&cfg, LogLevel::Silent, "dropped");
        emit(&cfg, LogLevel::Error, "kept");
    }
}
