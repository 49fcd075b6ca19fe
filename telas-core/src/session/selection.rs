//! Rolls picked for a cut, with the operator's per-roll edits.

use serde::{Deserialize, Serialize};

use crate::model::{Roll, RollId};
use crate::validation::{check_leftovers, LeftoverIssue};

/// A picked roll and the values the operator entered for it.
///
/// Holds a copy of what it needs from the catalog, never a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedRoll {
    pub roll_id: RollId,
    /// Edited label.
    pub numero_rollo: String,
    /// Entered clean remainder, meters.
    pub resto_limpio: f64,
    /// Entered dirty remainder, meters.
    pub resto_sucio: f64,
    /// Usable length of the roll before this cut.
    pub basis: f64,
}

impl SelectedRoll {
    fn from_roll(roll: &Roll) -> Self {
        Self {
            roll_id: roll.id,
            numero_rollo: roll.numero_rollo.clone(),
            resto_limpio: roll.resto_limpio,
            resto_sucio: roll.resto_sucio,
            basis: roll.usable_metraje(),
        }
    }

    /// Check the entered leftovers against the basis.
    pub fn check(&self) -> Result<(), LeftoverIssue> {
        check_leftovers(self.resto_limpio, self.resto_sucio, self.basis)
    }

    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    /// Length the cut consumes from this roll.
    pub fn consumed(&self) -> f64 {
        (self.basis - self.resto_limpio - self.resto_sucio).max(0.0)
    }
}

/// Ordered set of picked rolls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    entries: Vec<SelectedRoll>,
}

impl Selection {
    /// Add the roll if absent, remove it if present.
    ///
    /// Returns `true` when the roll was added.
    pub fn toggle(&mut self, roll: &Roll) -> bool {
        if let Some(pos) = self.position(roll.id) {
            self.entries.remove(pos);
            false
        } else {
            self.entries.push(SelectedRoll::from_roll(roll));
            true
        }
    }

    fn position(&self, roll_id: RollId) -> Option<usize> {
        self.entries.iter().position(|e| e.roll_id == roll_id)
    }

    pub fn get(&self, roll_id: RollId) -> Option<&SelectedRoll> {
        self.entries.iter().find(|e| e.roll_id == roll_id)
    }

    /// Set the edited label. Returns `false` when the roll is not selected.
    pub fn set_numero_rollo(&mut self, roll_id: RollId, numero_rollo: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|e| e.roll_id == roll_id) {
            Some(entry) => {
                entry.numero_rollo = numero_rollo.into();
                true
            }
            None => false,
        }
    }

    /// Set the entered leftovers. Returns `false` when the roll is not selected.
    pub fn set_leftovers(&mut self, roll_id: RollId, resto_limpio: f64, resto_sucio: f64) -> bool {
        match self.entries.iter_mut().find(|e| e.roll_id == roll_id) {
            Some(entry) => {
                entry.resto_limpio = resto_limpio;
                entry.resto_sucio = resto_sucio;
                true
            }
            None => false,
        }
    }

    /// Selected rolls in the order they were picked.
    pub fn iter(&self) -> impl Iterator<Item = &SelectedRoll> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the usable length of every selected roll.
    pub fn total_usable(&self) -> f64 {
        self.entries.iter().map(|e| e.basis).sum()
    }

    /// Rolls whose entered leftovers are rejected.
    pub fn issues(&self) -> Vec<(RollId, LeftoverIssue)> {
        self.entries
            .iter()
            .filter_map(|e| e.check().err().map(|issue| (e.roll_id, issue)))
            .collect()
    }

    pub fn all_valid(&self) -> bool {
        self.entries.iter().all(SelectedRoll::is_valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roll(id: RollId, metraje: f64, resto_limpio: f64) -> Roll {
        Roll {
            id,
            cliente_id: 1,
            numero_rollo: format!("N{}", id),
            lote: String::new(),
            tipo_tela: "lino".into(),
            color: "crudo".into(),
            fecha: None,
            metraje,
            disponible: true,
            resto_limpio,
            resto_sucio: 0.0,
        }
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut selection = Selection::default();
        assert!(selection.toggle(&roll(1, 50.0, 0.0)));
        assert!(selection.get(1).is_some());
        assert!(!selection.toggle(&roll(1, 50.0, 0.0)));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_toggle_initializes_overrides_from_roll() {
        let mut selection = Selection::default();
        selection.toggle(&roll(3, 100.0, 40.0));
        let entry = selection.get(3).unwrap();
        assert_eq!(entry.numero_rollo, "N3");
        assert_eq!(entry.resto_limpio, 40.0);
        assert_eq!(entry.resto_sucio, 0.0);
        assert_eq!(entry.basis, 40.0);
    }

    #[test]
    fn test_order_is_pick_order() {
        let mut selection = Selection::default();
        selection.toggle(&roll(5, 10.0, 0.0));
        selection.toggle(&roll(2, 10.0, 0.0));
        selection.toggle(&roll(9, 10.0, 0.0));
        selection.toggle(&roll(2, 10.0, 0.0));
        selection.toggle(&roll(2, 10.0, 0.0));
        let ids: Vec<RollId> = selection.iter().map(|e| e.roll_id).collect();
        assert_eq!(ids, vec![5, 9, 2]);
    }

    #[test]
    fn test_total_uses_usable_metraje() {
        let mut selection = Selection::default();
        selection.toggle(&roll(1, 100.0, 0.0));
        selection.toggle(&roll(2, 100.0, 30.0));
        assert_eq!(selection.total_usable(), 130.0);
    }

    #[test]
    fn test_edits_on_unselected_roll_are_refused() {
        let mut selection = Selection::default();
        assert!(!selection.set_leftovers(4, 1.0, 1.0));
        assert!(!selection.set_numero_rollo(4, "x"));
    }

    #[test]
    fn test_issues_and_consumed() {
        let mut selection = Selection::default();
        selection.toggle(&roll(1, 100.0, 40.0));
        selection.set_leftovers(1, 30.0, 15.0);
        assert!(!selection.all_valid());
        assert_eq!(selection.issues().len(), 1);

        selection.set_leftovers(1, 30.0, 5.0);
        assert!(selection.all_valid());
        assert_eq!(selection.get(1).unwrap().consumed(), 5.0);
    }
}
