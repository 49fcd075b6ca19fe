//! Validation logic for requests, new rolls and cut leftovers.

use crate::config::float_cmp;
use crate::error::{Result, TelasError};
use crate::model::{CutRequest, NewRoll};
use crate::session::Selection;

/// Validation result with warnings.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Whether validation passed.
    pub passed: bool,
    /// Warning messages.
    pub warnings: Vec<String>,
    /// Error messages.
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Create a passing result.
    pub fn ok() -> Self {
        Self {
            passed: true,
            ..Default::default()
        }
    }

    /// Add a warning.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Add an error.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.passed = false;
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
        if !other.passed {
            self.passed = false;
        }
    }
}

/// Why a roll's entered leftovers are rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeftoverIssue {
    /// A leftover is NaN or infinite.
    NotFinite,
    /// Clean remainder below zero.
    NegativeClean(f64),
    /// Dirty remainder below zero.
    NegativeDirty(f64),
    /// Clean plus dirty exceeds what the roll had before the cut.
    ExceedsBasis { total: f64, basis: f64 },
}

impl std::fmt::Display for LeftoverIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeftoverIssue::NotFinite => write!(f, "leftovers must be finite numbers"),
            LeftoverIssue::NegativeClean(v) => write!(f, "resto_limpio {} is negative", v),
            LeftoverIssue::NegativeDirty(v) => write!(f, "resto_sucio {} is negative", v),
            LeftoverIssue::ExceedsBasis { total, basis } => write!(
                f,
                "resto_limpio + resto_sucio = {:.2} m exceeds the {:.2} m available",
                total, basis
            ),
        }
    }
}

/// Check entered leftovers against the roll's usable length before the edit.
pub fn check_leftovers(
    resto_limpio: f64,
    resto_sucio: f64,
    basis: f64,
) -> std::result::Result<(), LeftoverIssue> {
    if !resto_limpio.is_finite() || !resto_sucio.is_finite() {
        return Err(LeftoverIssue::NotFinite);
    }
    if resto_limpio < 0.0 {
        return Err(LeftoverIssue::NegativeClean(resto_limpio));
    }
    if resto_sucio < 0.0 {
        return Err(LeftoverIssue::NegativeDirty(resto_sucio));
    }
    let total = resto_limpio + resto_sucio;
    if !float_cmp::approx_le(total, basis) {
        return Err(LeftoverIssue::ExceedsBasis { total, basis });
    }
    Ok(())
}

/// Validate every selected roll's leftovers.
pub fn validate_selection(selection: &Selection) -> ValidationResult {
    let mut result = ValidationResult::ok();

    for entry in selection.iter() {
        if let Err(issue) = entry.check() {
            result.add_error(format!("Roll {}: {}", entry.roll_id, issue));
        }
        if entry.numero_rollo.trim().is_empty() {
            result.add_warning(format!("Roll {}: numero_rollo is empty", entry.roll_id));
        }
    }

    result
}

/// Validate a cut request.
pub fn validate_request(request: &CutRequest) -> Result<()> {
    if request.cliente_id <= 0 {
        return Err(TelasError::invalid_input(
            "cliente_id",
            format!("{} is not a valid client", request.cliente_id),
        ));
    }
    if !request.metros_requeridos.is_finite() || request.metros_requeridos <= 0.0 {
        return Err(TelasError::invalid_input(
            "metros_requeridos",
            format!(
                "must be a positive number of meters, got {}",
                request.metros_requeridos
            ),
        ));
    }
    Ok(())
}

/// Trim a client name and reject it when empty.
pub fn validate_client_name(nombre: &str) -> Result<String> {
    let trimmed = nombre.trim();
    if trimmed.is_empty() {
        return Err(TelasError::invalid_input("nombre", "client name is required"));
    }
    Ok(trimmed.to_string())
}

/// Validate a roll before it is sent for creation.
pub fn validate_new_roll(roll: &NewRoll) -> ValidationResult {
    let mut result = ValidationResult::ok();

    if roll.cliente_id <= 0 {
        result.add_error(format!("cliente_id {} is not a valid client", roll.cliente_id));
    }

    if !roll.metraje.is_finite() || roll.metraje < 0.0 {
        result.add_error(format!("metraje {} must be a non-negative number", roll.metraje));
    } else {
        result.merge(validate_remainders(roll));
    }

    if roll.tipo_tela.trim().is_empty() {
        result.add_warning("tipo_tela is empty; the roll will match every fabric query");
    }
    if roll.color.trim().is_empty() {
        result.add_warning("color is empty; the roll will match every color query");
    }

    result
}

/// Check a new roll's remainders against its metraje.
fn validate_remainders(roll: &NewRoll) -> ValidationResult {
    let mut result = ValidationResult::ok();
    match check_leftovers(roll.resto_limpio, roll.resto_sucio, roll.metraje) {
        Ok(()) => {}
        Err(LeftoverIssue::ExceedsBasis { total, basis }) => result.add_error(format!(
            "remainders ({:.2} m) exceed metraje ({:.2} m)",
            total, basis
        )),
        Err(issue) => result.add_error(issue.to_string()),
    }
    result
}

/// Reject a new roll with [`TelasError::InvalidInput`] when validation fails.
pub fn ensure_new_roll(roll: &NewRoll) -> Result<()> {
    let result = validate_new_roll(roll);
    for warning in &result.warnings {
        tracing::warn!("Roll '{}': {}", roll.numero_rollo, warning);
    }
    if !result.passed {
        return Err(TelasError::invalid_input("roll", result.errors.join("; ")));
    }
    Ok(())
}
