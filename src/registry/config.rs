/*!
 * Registry Configuration
 *
 * Snapshot strategy selection and leak logging, from code or environment
 */

use crate::core::errors::ConfigError;
use crate::snapshot::{BacktraceService, LocationService, SnapshotService};

/// Selects the snapshot service (`location` or `backtrace`)
pub const CAPTURE_ENV: &str = "RESGUARD_CAPTURE";
/// Enables/disables `tracing` output for leaks at teardown
pub const LOG_LEAKS_ENV: &str = "RESGUARD_LOG_LEAKS";

/// What a handle captures when it is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Creation site only
    Location,
    /// Creation site plus forced backtrace
    Backtrace,
}

impl CaptureMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "location" => Some(Self::Location),
            "backtrace" => Some(Self::Backtrace),
            _ => None,
        }
    }

    /// Instantiate the matching snapshot service
    pub fn service(self) -> Box<dyn SnapshotService> {
        match self {
            Self::Location => Box::new(LocationService),
            Self::Backtrace => Box::new(BacktraceService),
        }
    }
}

/// Leak registry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Snapshot strategy
    pub capture: CaptureMode,
    /// Emit one `tracing` error event per leak at teardown
    pub log_leaks: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capture: CaptureMode::Backtrace,
            log_leaks: true,
        }
    }
}

impl RegistryConfig {
    /// Location-only capture, for hot test loops
    pub const fn lightweight() -> Self {
        Self {
            capture: CaptureMode::Location,
            log_leaks: true,
        }
    }

    /// Read overrides from `RESGUARD_CAPTURE` and `RESGUARD_LOG_LEAKS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(CAPTURE_ENV) {
            config.capture = CaptureMode::parse(&raw).ok_or(ConfigError::InvalidValue {
                var: CAPTURE_ENV,
                value: raw,
                expected: "`location` or `backtrace`",
            })?;
        }

        if let Some(raw) = lookup(LOG_LEAKS_ENV) {
            config.log_leaks = match raw.trim() {
                "1" | "true" => true,
                "0" | "false" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: LOG_LEAKS_ENV,
                        value: raw,
                        expected: "`0`, `1`, `true` or `false`",
                    })
                }
            };
        }

        Ok(config)
    }
}
