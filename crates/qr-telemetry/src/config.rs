//! Logging configuration.

use std::env;

/// Shape of the log stream on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human-readable lines, for the serial console and journal.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
    /// Filter installed, nothing written.
    Off,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter directives used when `RUST_LOG` is unset,
    /// e.g. `info,qr_05_lottery_client=debug`.
    pub log_level: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl TelemetryConfig {
    /// Read `QR_LOG_LEVEL`, `QR_JSON_LOGS` and `QR_CONSOLE_OUTPUT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key).map(|value| {
                matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes"
                )
            })
        };

        let format = if flag("QR_CONSOLE_OUTPUT") == Some(false) {
            LogFormat::Off
        } else if flag("QR_JSON_LOGS") == Some(true) {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };

        let log_level = lookup("QR_LOG_LEVEL")
            .map(|level| level.trim().to_string())
            .filter(|level| !level.is_empty())
            .unwrap_or_else(|| "info".to_string());

        Self { log_level, format }
    }
}
