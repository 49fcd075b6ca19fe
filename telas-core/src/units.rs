//! Conversions between meters and yards.

use serde::{Deserialize, Serialize};

use crate::config::{Unit, METERS_PER_YARD, METRAJE_DECIMALS};
use crate::error::{Result, TelasError};

fn check_length(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(TelasError::invalid_input(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(TelasError::invalid_input(
            field,
            format!("must be non-negative, got {}", value),
        ));
    }
    Ok(value)
}

/// Convert yards to meters.
pub fn yards_to_meters(yards: f64) -> Result<f64> {
    to_meters(yards, Unit::Yards)
}

/// Convert meters to yards.
pub fn meters_to_yards(meters: f64) -> Result<f64> {
    Ok(check_length("meters", meters)? / METERS_PER_YARD)
}

/// Convert a length in `unit` to meters.
pub fn to_meters(value: f64, unit: Unit) -> Result<f64> {
    let field = match unit {
        Unit::Meters => "meters",
        Unit::Yards => "yards",
    };
    Ok(check_length(field, value)? * unit.to_meters_factor())
}

/// Round a length to the precision the record service stores.
pub fn round_to_storage(meters: f64) -> f64 {
    let scale = 10f64.powi(METRAJE_DECIMALS);
    (meters * scale).round() / scale
}

/// A length typed in either unit.
///
/// Entering one unit clears the other, so at most one is ever set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LengthEntry {
    meters: Option<f64>,
    yards: Option<f64>,
}

impl LengthEntry {
    /// Entry holding a value in meters.
    pub fn meters(value: f64) -> Self {
        let mut entry = Self::default();
        entry.set_meters(value);
        entry
    }

    /// Entry holding a value in yards.
    pub fn yards(value: f64) -> Self {
        let mut entry = Self::default();
        entry.set_yards(value);
        entry
    }

    pub fn set_meters(&mut self, value: f64) {
        self.meters = Some(value);
        self.yards = None;
    }

    pub fn set_yards(&mut self, value: f64) {
        self.yards = Some(value);
        self.meters = None;
    }

    pub fn clear(&mut self) {
        self.meters = None;
        self.yards = None;
    }

    pub fn is_empty(&self) -> bool {
        self.meters.is_none() && self.yards.is_none()
    }

    /// The entered unit and value, if any.
    pub fn raw(&self) -> Option<(f64, Unit)> {
        match (self.meters, self.yards) {
            (Some(m), _) => Some((m, Unit::Meters)),
            (None, Some(y)) => Some((y, Unit::Yards)),
            (None, None) => None,
        }
    }

    /// The entered length in meters, or `None` when nothing was entered.
    pub fn to_meters(&self) -> Result<Option<f64>> {
        self.raw().map(|(value, unit)| to_meters(value, unit)).transpose()
    }
}
