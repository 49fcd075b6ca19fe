//! Header and record parsers for the bulk-import format.

use chrono::NaiveDate;

use crate::config::Unit;
use crate::error::{Result, TelasError};
use crate::model::{ClientId, NewRoll};
use crate::units::{round_to_storage, to_meters};
use crate::validation::ensure_new_roll;

use super::LengthColumn;

/// Split text into trimmed, non-empty records.
pub fn split_records(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Split a record into trimmed fields.
pub fn split_fields(record: &str) -> Vec<&str> {
    record.split(',').map(str::trim).collect()
}

/// Column positions resolved from the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    pub numero_rollo: usize,
    pub lote: usize,
    pub tipo_tela: usize,
    pub color: usize,
    pub fecha: usize,
    pub disponible: usize,
    /// Length column and the unit it is read in.
    pub length: (usize, Unit),
    pub resto_limpio: Option<usize>,
    pub resto_sucio: Option<usize>,
    /// Number of header fields, trailing empty ones excluded; every record
    /// must match it.
    pub width: usize,
}

fn find_column(tokens: &[String], name: &str) -> Option<usize> {
    tokens.iter().position(|t| t.contains(name))
}

fn require_column(tokens: &[String], name: &str, missing: &mut Vec<String>) -> usize {
    find_column(tokens, name).unwrap_or_else(|| {
        missing.push(name.to_string());
        0
    })
}

/// Resolve the required columns by case-insensitive substring match.
///
/// Fails with [`TelasError::Header`] listing every required name that no
/// header token contains.
pub fn parse_header(line: &str, length_column: LengthColumn) -> Result<HeaderMap> {
    let mut tokens: Vec<String> = split_fields(line).iter().map(|t| t.to_lowercase()).collect();
    while tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }
    let mut missing = Vec::new();

    let numero_rollo = require_column(&tokens, "numero_rollo", &mut missing);
    let lote = require_column(&tokens, "lote", &mut missing);
    let tipo_tela = require_column(&tokens, "tipo_tela", &mut missing);
    let color = require_column(&tokens, "color", &mut missing);
    let fecha = require_column(&tokens, "fecha", &mut missing);

    let metraje = find_column(&tokens, "metraje");
    let yards = find_column(&tokens, "yards");
    let length = match (length_column, metraje, yards) {
        (LengthColumn::Metraje, Some(i), _) | (LengthColumn::Auto, Some(i), _) => {
            Some((i, Unit::Meters))
        }
        (LengthColumn::Yards, _, Some(i)) | (LengthColumn::Auto, None, Some(i)) => {
            Some((i, Unit::Yards))
        }
        _ => None,
    };
    if length.is_none() {
        missing.push(length_column.required_name().to_string());
    }

    let disponible = require_column(&tokens, "disponible", &mut missing);

    if !missing.is_empty() {
        return Err(TelasError::Header { missing });
    }

    Ok(HeaderMap {
        numero_rollo,
        lote,
        tipo_tela,
        color,
        fecha,
        disponible,
        length: length.unwrap_or((0, Unit::Meters)),
        resto_limpio: find_column(&tokens, "resto_limpio"),
        resto_sucio: find_column(&tokens, "resto_sucio"),
        width: tokens.len(),
    })
}

/// Parse a length field in `unit` as meters.
///
/// Yards are converted and rounded to storage precision; meters are kept
/// as written.
pub fn parse_length(field: &str, value: &str, unit: Unit) -> Result<f64> {
    let parsed: f64 = value.parse().map_err(|_| {
        TelasError::invalid_input(field, format!("'{}' is not a number", value))
    })?;
    let meters = to_meters(parsed, unit)?;
    Ok(match unit {
        Unit::Yards => round_to_storage(meters),
        Unit::Meters => meters,
    })
}

/// Parse an ISO calendar date.
pub fn parse_fecha(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        TelasError::invalid_input("fecha", format!("'{}' is not a YYYY-MM-DD date", value))
    })
}

/// `true` for `true` in any case or `1`; anything else is `false`.
pub fn parse_disponible(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Build a roll from one record, owned by `cliente_id`.
///
/// Empty fields past the header's width are ignored, so a record exported
/// with a trailing comma still matches.
pub fn parse_record(record: &str, header: &HeaderMap, cliente_id: ClientId) -> Result<NewRoll> {
    let mut fields = split_fields(record);
    while fields.len() > header.width && fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    if fields.len() != header.width {
        return Err(TelasError::invalid_input(
            "record",
            format!(
                "expected {} fields, found {} (values may not contain commas)",
                header.width,
                fields.len()
            ),
        ));
    }

    let (length_index, unit) = header.length;
    let optional_length = |index: Option<usize>, field: &str| -> Result<f64> {
        match index.map(|i| fields[i]) {
            Some(value) if !value.is_empty() => parse_length(field, value, Unit::Meters),
            _ => Ok(0.0),
        }
    };

    let roll = NewRoll {
        cliente_id,
        numero_rollo: fields[header.numero_rollo].to_string(),
        lote: fields[header.lote].to_string(),
        tipo_tela: fields[header.tipo_tela].to_string(),
        color: fields[header.color].to_string(),
        fecha: parse_fecha(fields[header.fecha])?,
        metraje: parse_length("metraje", fields[length_index], unit)?,
        disponible: parse_disponible(fields[header.disponible]),
        resto_limpio: optional_length(header.resto_limpio, "resto_limpio")?,
        resto_sucio: optional_length(header.resto_sucio, "resto_sucio")?,
    };
    ensure_new_roll(&roll)?;
    Ok(roll)
}
