//! Turning a selection into roll updates.

use serde::{Deserialize, Serialize};

use super::selection::{SelectedRoll, Selection};
use crate::config::RETENTION_THRESHOLD_M;
use crate::error::ErrorCode;
use crate::model::{ClientId, RollId, RollPatch};

/// Whether a roll with this clean remainder stays in circulation.
#[inline]
pub fn stays_available(resto_limpio: f64) -> bool {
    resto_limpio > RETENTION_THRESHOLD_M
}

/// The update a commit issues for one selected roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPatch {
    pub roll_id: RollId,
    pub patch: RollPatch,
    /// `true` when the roll leaves circulation.
    pub retired: bool,
    /// Meters the cut takes from the roll.
    pub consumed: f64,
}

impl PlannedPatch {
    /// Apply the retention rule to one selected roll.
    ///
    /// Metraje is never part of the patch.
    pub fn for_roll(entry: &SelectedRoll) -> Self {
        let resto_limpio = if entry.resto_limpio.is_finite() {
            entry.resto_limpio
        } else {
            0.0
        };
        let disponible = stays_available(resto_limpio);
        Self {
            roll_id: entry.roll_id,
            patch: RollPatch {
                numero_rollo: Some(entry.numero_rollo.clone()),
                disponible: Some(disponible),
                resto_limpio: Some(resto_limpio),
                resto_sucio: Some(entry.resto_sucio),
                ..Default::default()
            },
            retired: !disponible,
            consumed: entry.consumed(),
        }
    }
}

/// Patches for a whole selection, in pick order.
pub fn plan_patches(selection: &Selection) -> Vec<PlannedPatch> {
    selection.iter().map(PlannedPatch::for_roll).collect()
}

/// Result of patching one roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub roll_id: RollId,
    pub patch: RollPatch,
    pub retired: bool,
    /// Kind of the failure, `None` on success.
    pub error_code: Option<ErrorCode>,
    /// Human-readable failure, `None` on success.
    pub error: Option<String>,
}

impl RollOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-roll results of a commit, in pick order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub cliente_id: ClientId,
    pub metros_requeridos: f64,
    pub outcomes: Vec<RollOutcome>,
}

impl CommitSummary {
    pub fn ok_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.ok_count()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(RollOutcome::is_ok)
    }

    pub fn retired_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.is_ok() && o.retired)
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RollOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(resto_limpio: f64, resto_sucio: f64) -> SelectedRoll {
        SelectedRoll {
            roll_id: 1,
            numero_rollo: "12-B".into(),
            resto_limpio,
            resto_sucio,
            basis: 100.0,
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert!(stays_available(15.01));
        assert!(!stays_available(15.0));
        assert!(!stays_available(0.0));
    }

    #[test]
    fn test_plan_keeps_roll_above_threshold() {
        let planned = PlannedPatch::for_roll(&entry(20.0, 0.0));
        assert_eq!(
            planned,
            PlannedPatch {
                roll_id: 1,
                patch: RollPatch {
                    numero_rollo: Some("12-B".into()),
                    disponible: Some(true),
                    resto_limpio: Some(20.0),
                    resto_sucio: Some(0.0),
                    ..Default::default()
                },
                retired: false,
                consumed: 80.0,
            }
        );
    }

    #[test]
    fn test_plan_retires_roll_at_or_below_threshold() {
        let planned = PlannedPatch::for_roll(&entry(10.0, 2.0));
        assert!(planned.retired);
        assert_eq!(planned.patch.disponible, Some(false));
        assert_eq!(planned.patch.resto_limpio, Some(10.0));
        assert_eq!(planned.patch.resto_sucio, Some(2.0));
        assert_eq!(planned.consumed, 88.0);
    }

    #[test]
    fn test_summary_counts() {
        let ok = RollOutcome {
            roll_id: 1,
            patch: RollPatch::default(),
            retired: true,
            error_code: None,
            error: None,
        };
        let failed = RollOutcome {
            roll_id: 2,
            error_code: Some(ErrorCode::Network),
            error: Some("timeout".into()),
            ..ok.clone()
        };
        let summary = CommitSummary {
            cliente_id: 1,
            metros_requeridos: 10.0,
            outcomes: vec![ok, failed],
        };
        assert_eq!(summary.ok_count(), 1);
        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.retired_count(), 1);
        assert!(!summary.is_complete());
        assert_eq!(summary.failures().next().unwrap().roll_id, 2);
    }
}
