//! Runtime configuration.
//!
//! Hosted builds read their configuration from the environment the first
//! time a violation fires. Kernels and loaders have no environment and
//! build a [`TrapConfig`] directly through the embedding API.

use std::str::FromStr;

/// Environment variable controlling [`TrapConfig::panic_on_violation`].
pub const PANIC_ON_VIOLATION_VAR: &str = "UBTRAP_PANIC_ON_VIOLATION";

/// Environment variable selecting the hosted diagnostic sink.
pub const SINK_VAR: &str = "UBTRAP_SINK";

/// Error reading configuration from the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: expected a boolean (1/0, true/false, yes/no, on/off), got `{value}`")]
    InvalidBool { var: &'static str, value: String },

    #[error("{var}: unknown sink `{value}`, expected `stderr` or `tracing`")]
    UnknownSink { var: &'static str, value: String },
}

/// Where hosted builds write report lines.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum SinkKind {
    /// One line per report on standard error.
    #[default]
    Stderr,
    /// `tracing::error!` events, for hosts that already collect tracing.
    Tracing,
}

impl FromStr for SinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stderr" => Ok(SinkKind::Stderr),
            "tracing" => Ok(SinkKind::Tracing),
            _ => Err(ConfigError::UnknownSink {
                var: SINK_VAR,
                value: s.to_owned(),
            }),
        }
    }
}

/// Configuration a [`TrapRuntime`](crate::TrapRuntime) is built from.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TrapConfig {
    /// Halt after reporting violations that are not fatal by definition.
    pub panic_on_violation: bool,
    /// Sink used by hosted runtimes.
    pub sink: SinkKind,
}

impl Default for TrapConfig {
    fn default() -> Self {
        TrapConfig {
            panic_on_violation: true,
            sink: SinkKind::Stderr,
        }
    }
}

impl TrapConfig {
    /// Report and continue for every non-fatal kind.
    pub fn continue_on_violation() -> Self {
        TrapConfig {
            panic_on_violation: false,
            ..TrapConfig::default()
        }
    }

    #[must_use]
    pub fn with_panic_on_violation(mut self, panic_on_violation: bool) -> Self {
        self.panic_on_violation = panic_on_violation;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: SinkKind) -> Self {
        self.sink = sink;
        self
    }

    /// Read configuration from the process environment.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = TrapConfig::default();
        if let Some(value) = lookup(PANIC_ON_VIOLATION_VAR) {
            config.panic_on_violation = parse_bool(PANIC_ON_VIOLATION_VAR, &value)?;
        }
        if let Some(value) = lookup(SINK_VAR) {
            config.sink = value.parse()?;
        }
        Ok(config)
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
