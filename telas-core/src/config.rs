//! Configuration constants and settings for the cutting core.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TelasError};

/// Floating-point comparison epsilon (meters).
///
/// Absorbs representation noise from summing stored lengths only; a shortfall
/// of any real size, even a fraction of a millimeter, is not covered.
pub const EPS: f64 = 1e-9;

/// A roll whose clean remainder after a cut is at or below this length
/// (meters) is retired from circulation.
pub const RETENTION_THRESHOLD_M: f64 = 15.0;

/// Conversion factor: yard to meter.
pub const METERS_PER_YARD: f64 = 0.9144;

/// Decimal places the record service stores for lengths.
pub const METRAJE_DECIMALS: i32 = 2;

/// Quiescent window for free-text search inputs.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default record service location.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest per-call timeout accepted by [`ServiceConfig::validate`].
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60);

/// Unit of length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Meters,
    Yards,
}

impl Unit {
    /// Parse a unit from a column name or command-line value.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "m" | "meters" | "metros" | "metraje" => Some(Unit::Meters),
            "yd" | "yards" | "yardas" => Some(Unit::Yards),
            _ => None,
        }
    }

    /// Factor that converts a length in this unit to meters.
    pub fn to_meters_factor(&self) -> f64 {
        match self {
            Unit::Meters => 1.0,
            Unit::Yards => METERS_PER_YARD,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unit::Meters => write!(f, "m"),
            Unit::Yards => write!(f, "yd"),
        }
    }
}

/// Connection settings for the record service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Base URL, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    /// Create a configuration for the given base URL with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Replace the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL without trailing slashes.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    /// Check the URL scheme and the timeout range.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(self.normalized_base_url()).map_err(|e| {
            TelasError::invalid_input("base_url", format!("'{}' is not a URL: {}", self.base_url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(TelasError::invalid_input(
                "base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if self.timeout < Duration::from_secs(1) || self.timeout > MAX_TIMEOUT {
            return Err(TelasError::invalid_input(
                "timeout",
                format!(
                    "{}s is outside 1..={}s",
                    self.timeout.as_secs_f64(),
                    MAX_TIMEOUT.as_secs()
                ),
            ));
        }

        Ok(())
    }
}

/// Utility functions for floating-point comparisons.
pub mod float_cmp {
    use super::EPS;

    /// Check if `a` is at most `b`, with epsilon tolerance.
    #[inline]
    pub fn approx_le(a: f64, b: f64) -> bool {
        a <= b + EPS
    }

    /// Check if `a` is at least `b`, with epsilon tolerance.
    #[inline]
    pub fn approx_ge(a: f64, b: f64) -> bool {
        a + EPS >= b
    }
}
