//! In-memory snapshot of one client's rolls.
//!
//! The catalog answers every read a cut needs (candidates, usable length,
//! suggestion values, dashboard counts) without touching the record
//! service. It is refreshed explicitly.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{CandidateQuery, ClientId, Roll, RollId};
use crate::repository::RollRepository;

/// Roll counts for a client dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStats {
    pub total: usize,
    pub disponibles: usize,
    pub usados: usize,
    /// Share of available rolls, rounded to whole percent.
    pub availability_pct: u8,
}

impl ClientStats {
    pub fn from_rolls(rolls: &[Roll]) -> Self {
        let total = rolls.len();
        let disponibles = rolls.iter().filter(|r| r.disponible).count();
        let availability_pct = if total == 0 {
            0
        } else {
            ((disponibles as f64 / total as f64) * 100.0).round() as u8
        };
        Self {
            total,
            disponibles,
            usados: total - disponibles,
            availability_pct,
        }
    }
}

/// Snapshot of the rolls owned by one client.
#[derive(Debug, Clone)]
pub struct RollCatalog {
    cliente_id: ClientId,
    rolls: Vec<Roll>,
    loaded_at: Option<DateTime<Utc>>,
}

impl RollCatalog {
    /// Empty, never-loaded catalog.
    pub fn new(cliente_id: ClientId) -> Self {
        Self {
            cliente_id,
            rolls: Vec::new(),
            loaded_at: None,
        }
    }

    /// Catalog over rolls already in hand. Rolls of other clients are dropped.
    pub fn from_rolls(cliente_id: ClientId, rolls: Vec<Roll>) -> Self {
        let mut catalog = Self::new(cliente_id);
        catalog.replace(rolls);
        catalog
    }

    /// Fetch a fresh catalog for a client.
    pub async fn load(repo: &dyn RollRepository, cliente_id: ClientId) -> Result<Self> {
        let mut catalog = Self::new(cliente_id);
        catalog.refresh(repo).await?;
        Ok(catalog)
    }

    /// Re-fetch the client's rolls.
    ///
    /// The snapshot is only replaced when the fetch succeeds.
    pub async fn refresh(&mut self, repo: &dyn RollRepository) -> Result<()> {
        let rolls = repo.list_client_rolls(self.cliente_id, None).await?;
        tracing::debug!(
            cliente_id = self.cliente_id,
            rolls = rolls.len(),
            "Catalog refreshed"
        );
        self.replace(rolls);
        Ok(())
    }

    /// Swap in a new snapshot.
    pub fn replace(&mut self, rolls: Vec<Roll>) {
        let cliente_id = self.cliente_id;
        self.rolls = rolls
            .into_iter()
            .filter(|r| r.cliente_id == cliente_id)
            .collect();
        self.loaded_at = Some(Utc::now());
    }

    pub fn cliente_id(&self) -> ClientId {
        self.cliente_id
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn rolls(&self) -> &[Roll] {
        &self.rolls
    }

    pub fn len(&self) -> usize {
        self.rolls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rolls.is_empty()
    }

    pub fn get(&self, id: RollId) -> Option<&Roll> {
        self.rolls.iter().find(|r| r.id == id)
    }

    /// Available rolls matching the query, longest nominal metraje first,
    /// ties by ascending id.
    pub fn candidates(&self, query: &CandidateQuery) -> Vec<&Roll> {
        let mut found: Vec<&Roll> = self
            .rolls
            .iter()
            .filter(|r| r.disponible && r.matches(&query.tipo_tela, &query.color))
            .collect();
        found.sort_by(|a, b| b.metraje.total_cmp(&a.metraje).then(a.id.cmp(&b.id)));
        found
    }

    /// Length a roll can still contribute.
    pub fn usable_metraje(roll: &Roll) -> f64 {
        roll.usable_metraje()
    }

    /// Sum of usable length over some rolls.
    pub fn total_usable<'a>(rolls: impl IntoIterator<Item = &'a Roll>) -> f64 {
        rolls.into_iter().map(Self::usable_metraje).sum()
    }

    /// Distinct non-empty fabric types, sorted.
    pub fn distinct_tipos_tela(&self) -> Vec<String> {
        distinct(self.rolls.iter().map(|r| r.tipo_tela.as_str()))
    }

    /// Distinct non-empty colors, sorted.
    pub fn distinct_colores(&self) -> Vec<String> {
        distinct(self.rolls.iter().map(|r| r.color.as_str()))
    }

    /// Fabric types containing the typed text. Empty input suggests nothing.
    pub fn suggest_tipos_tela(&self, input: &str) -> Vec<String> {
        suggest(self.distinct_tipos_tela(), input)
    }

    /// Colors containing the typed text. Empty input suggests nothing.
    pub fn suggest_colores(&self, input: &str) -> Vec<String> {
        suggest(self.distinct_colores(), input)
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats::from_rolls(&self.rolls)
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn suggest(values: Vec<String>, input: &str) -> Vec<String> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    values
        .into_iter()
        .filter(|v| v.to_lowercase().contains(&needle))
        .collect()
}
