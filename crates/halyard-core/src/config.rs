//! # Runtime Configuration
//!
//! The per-call configuration record. Nothing in halyard is process-global:
//! two concurrent invocations with distinct configurations share no state.
//!
//! ## Log surface
//!
//! The library reports through [`tracing`]; [`Config::log_level`] is the
//! minimum severity the library will emit for a given call. `Silent`
//! suppresses the surface entirely. The `Notice` severity sits between
//! `Info` and `Warning` and is emitted on the `tracing` info channel with
//! a notice marker, since `tracing` has no native notice level.
//!
//! [`tracing`]: https://docs.rs/tracing

use bitflags::bitflags;

/// Severity of a log line, ordered from chattiest to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Internal state transitions, event-by-event detail.
    Debug,
    /// Progress of an operation.
    Info,
    /// Something unusual but harmless, e.g. an ignored extra document.
    Notice,
    /// Recoverable problems, e.g. an unknown key that was skipped.
    Warning,
    /// Failures; always accompanied by an error return.
    Error,
    /// Suppress the log surface entirely.
    Silent,
}

bitflags! {
    /// Behavioural switches on a [`Config`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConfigFlags: u32 {
        /// Keys not described by the mapping schema are consumed and
        /// dropped instead of failing the load.
        const IGNORE_UNKNOWN_KEYS = 1 << 0;
        /// Log a warning whenever a key is ignored.
        const IGNORED_KEY_WARNING = 1 << 1;
        /// Compare mapping keys, enum names, flag names and bit names
        /// case-insensitively unless the schema value overrides.
        const CASE_INSENSITIVE = 1 << 2;
        /// Disable anchor recording; any alias in the input fails the
        /// load with [`Error::AliasUnsupported`].
        ///
        /// [`Error::AliasUnsupported`]: crate::Error::AliasUnsupported
        const NO_ALIAS = 1 << 3;
        /// Enable schema extensions, currently the mapping union
        /// discriminant.
        const EXTENDED = 1 << 4;
    }
}

/// Per-call configuration for load, save, copy and free operations.
#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum severity that reaches the log surface.
    pub log_level: LogLevel,
    /// Behavioural switches.
    pub flags: ConfigFlags,
}

impl Config {
    /// A configuration with warnings and errors logged and no flags set.
    pub fn new() -> Self {
        Self {
            log_level: LogLevel::Warning,
            flags: ConfigFlags::empty(),
        }
    }

    /// Replace the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Replace the flag set.
    #[must_use]
    pub fn with_flags(mut self, flags: ConfigFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Whether a log line of `level` passes the configured threshold.
    pub fn logs(&self, level: LogLevel) -> bool {
        self.log_level != LogLevel::Silent && level >= self.log_level
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_is_warning() {
        let cfg = Config::default();
        assert!(cfg.logs(LogLevel::Warning));
        assert!(cfg.logs(LogLevel::Error));
        assert!(!cfg.logs(LogLevel::Info));
    }

    #[test]
    fn test_silent_suppresses_everything() {
        let cfg = Config::new().with_log_level(LogLevel::Silent);
        assert!(!cfg.logs(LogLevel::Error));
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Notice);
        assert!(LogLevel::Notice < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }
}
