//! Fabric roll record and its write payloads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::client::ClientId;
use super::lenient::{f64_from_any, string_or_null};

/// Identifier assigned by the record service.
pub type RollId = i64;

/// Length a roll can still contribute to a cut.
///
/// A recorded clean remainder replaces the nominal length as the roll's
/// working length.
#[inline]
pub fn usable_metraje(metraje: f64, resto_limpio: f64) -> f64 {
    if resto_limpio > 0.0 {
        resto_limpio
    } else {
        metraje
    }
}

/// A physical bolt of fabric owned by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roll {
    pub id: RollId,
    /// Owning client. Never changes after creation.
    #[serde(alias = "cliente")]
    pub cliente_id: ClientId,
    /// Free-form label, editable at cut time.
    #[serde(default, deserialize_with = "string_or_null")]
    pub numero_rollo: String,
    /// Lot or invoice label, carried verbatim.
    #[serde(default, deserialize_with = "string_or_null")]
    pub lote: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub tipo_tela: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub color: String,
    #[serde(default)]
    pub fecha: Option<NaiveDate>,
    /// Nominal length in meters. Never changes after creation.
    #[serde(deserialize_with = "f64_from_any")]
    pub metraje: f64,
    /// Whether the roll is in circulation for future cuts.
    #[serde(default)]
    pub disponible: bool,
    /// Clean remainder left by earlier cuts, reusable.
    #[serde(default, deserialize_with = "f64_from_any")]
    pub resto_limpio: f64,
    /// Dirty remainder, accounted for but not reusable.
    #[serde(default, deserialize_with = "f64_from_any")]
    pub resto_sucio: f64,
}

impl Roll {
    /// See [`usable_metraje`].
    pub fn usable_metraje(&self) -> f64 {
        usable_metraje(self.metraje, self.resto_limpio)
    }

    /// Case-insensitive substring match on fabric type and color.
    ///
    /// Queries are matched as typed, surrounding whitespace included.
    pub fn matches(&self, tipo_tela: &str, color: &str) -> bool {
        self.tipo_tela
            .to_lowercase()
            .contains(&tipo_tela.to_lowercase())
            && self.color.to_lowercase().contains(&color.to_lowercase())
    }
}

/// Fields for creating a roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRoll {
    pub cliente_id: ClientId,
    pub numero_rollo: String,
    pub lote: String,
    pub tipo_tela: String,
    pub color: String,
    pub fecha: NaiveDate,
    pub metraje: f64,
    pub disponible: bool,
    #[serde(default)]
    pub resto_limpio: f64,
    #[serde(default)]
    pub resto_sucio: f64,
}

impl NewRoll {
    /// Materialize the record the service would store.
    pub fn into_roll(self, id: RollId) -> Roll {
        Roll {
            id,
            cliente_id: self.cliente_id,
            numero_rollo: self.numero_rollo,
            lote: self.lote,
            tipo_tela: self.tipo_tela,
            color: self.color,
            fecha: Some(self.fecha),
            metraje: self.metraje,
            disponible: self.disponible,
            resto_limpio: self.resto_limpio,
            resto_sucio: self.resto_sucio,
        }
    }
}

/// Partial update of a roll.
///
/// There is no `metraje` or `cliente_id` field: both are fixed once the
/// roll exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero_rollo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_tela: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disponible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resto_limpio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resto_sucio: Option<f64>,
}

impl RollPatch {
    /// Apply the set fields to a stored roll.
    pub fn apply_to(&self, roll: &mut Roll) {
        if let Some(v) = &self.numero_rollo {
            roll.numero_rollo = v.clone();
        }
        if let Some(v) = &self.lote {
            roll.lote = v.clone();
        }
        if let Some(v) = &self.tipo_tela {
            roll.tipo_tela = v.clone();
        }
        if let Some(v) = &self.color {
            roll.color = v.clone();
        }
        if let Some(v) = self.fecha {
            roll.fecha = Some(v);
        }
        if let Some(v) = self.disponible {
            roll.disponible = v;
        }
        if let Some(v) = self.resto_limpio {
            roll.resto_limpio = v;
        }
        if let Some(v) = self.resto_sucio {
            roll.resto_sucio = v;
        }
    }
}
