//! Arena configuration.
//!
//! Header checking is set via the `TINYARENA_CHECKS` environment variable:
//! - `strict` (default): every header is canary-validated before its links
//!   are trusted. A mismatch fails the operation with a corruption error.
//! - `off`: canaries are maintained but never checked. Region bounds are
//!   still enforced on every access.
//!
//! Lifecycle records are kept unless `TINYARENA_LIFECYCLE_LOG` is set to
//! `0`, `off`, `false` or `no`.

use std::sync::OnceLock;

/// Header validation level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckLevel {
    /// Validate canaries on every header read that was not just written.
    #[default]
    Strict,
    /// Maintain canaries without checking them.
    Off,
}

impl CheckLevel {
    /// Parse from string (case-insensitive). Unknown values mean strict.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "strict" | "on" | "full" | "default" => Self::Strict,
            "off" | "none" | "disabled" => Self::Off,
            _ => Self::Strict,
        }
    }

    /// Returns true if canaries are checked on read.
    #[must_use]
    pub const fn validates_canaries(self) -> bool {
        matches!(self, Self::Strict)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Off => "off",
        }
    }
}

/// Per-arena settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    pub check_level: CheckLevel,
    /// Record lifecycle events for each operation.
    pub lifecycle_log: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            check_level: CheckLevel::Strict,
            lifecycle_log: true,
        }
    }
}

impl ArenaConfig {
    /// Read settings from the environment (uncached).
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("TINYARENA_CHECKS").ok().as_deref(),
            std::env::var("TINYARENA_LIFECYCLE_LOG").ok().as_deref(),
        )
    }

    fn from_vars(checks: Option<&str>, lifecycle_log: Option<&str>) -> Self {
        Self {
            check_level: checks.map(CheckLevel::from_str_loose).unwrap_or_default(),
            lifecycle_log: lifecycle_log.is_none_or(|raw| {
                !matches!(
                    raw.to_ascii_lowercase().as_str(),
                    "0" | "off" | "false" | "no"
                )
            }),
        }
    }

    /// Process-wide settings (reads the environment on first call, caches thereafter).
    #[must_use]
    pub fn global() -> Self {
        *GLOBAL_CONFIG.get_or_init(Self::from_env)
    }

    #[must_use]
    pub const fn with_check_level(mut self, check_level: CheckLevel) -> Self {
        self.check_level = check_level;
        self
    }

    #[must_use]
    pub const fn with_lifecycle_log(mut self, enabled: bool) -> Self {
        self.lifecycle_log = enabled;
        self
    }
}

static GLOBAL_CONFIG: OnceLock<ArenaConfig> = OnceLock::new();
