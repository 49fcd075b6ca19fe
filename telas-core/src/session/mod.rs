//! Cut session: one cutting operation from request to committed roll updates.
//!
//! The session is a single tagged state:
//!
//! ```text
//! Idle --evaluate--> CandidatesReady <--toggle--> Selecting --> Sufficient --commit--> Committed --> Idle
//! ```
//!
//! `Selecting` becomes `Sufficient` as soon as the picked rolls cover the
//! requested length and every picked roll has valid leftovers, and falls
//! back when either stops holding. Any state returns to `Idle` on
//! [`CutSession::reset`].

mod commit;
mod selection;

pub use commit::{plan_patches, stays_available, CommitSummary, PlannedPatch, RollOutcome};
pub use selection::{SelectedRoll, Selection};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::RollCatalog;
use crate::config::float_cmp;
use crate::error::{Result, TelasError};
use crate::model::{ClientId, CutRequest, Roll, RollId};
use crate::repository::RollRepository;
use crate::units::LengthEntry;
use crate::validation::{validate_request, validate_selection, LeftoverIssue};

/// Candidates computed for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub request: CutRequest,
    /// Candidate roll ids in catalog order.
    pub candidates: Vec<RollId>,
    /// Usable length over all candidates.
    pub available: f64,
    /// Whether the candidates can cover the request at all.
    pub feasible: bool,
}

/// State of a cut session, with the data each state carries.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    CandidatesReady(Evaluation),
    Selecting(Evaluation, Selection),
    Sufficient(Evaluation, Selection),
    Committed(CommitSummary),
}

/// Name of a [`SessionState`] without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    CandidatesReady,
    Selecting,
    Sufficient,
    Committed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::CandidatesReady => "candidates_ready",
            SessionPhase::Selecting => "selecting",
            SessionPhase::Sufficient => "sufficient",
            SessionPhase::Committed => "committed",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::CandidatesReady(_) => SessionPhase::CandidatesReady,
            SessionState::Selecting(..) => SessionPhase::Selecting,
            SessionState::Sufficient(..) => SessionPhase::Sufficient,
            SessionState::Committed(_) => SessionPhase::Committed,
        }
    }

    /// Pick the selection state the data supports.
    fn classify(evaluation: Evaluation, selection: Selection) -> Self {
        if selection.is_empty() {
            SessionState::CandidatesReady(evaluation)
        } else if selection.all_valid()
            && float_cmp::approx_ge(
                selection.total_usable(),
                evaluation.request.metros_requeridos,
            )
        {
            SessionState::Sufficient(evaluation, selection)
        } else {
            SessionState::Selecting(evaluation, selection)
        }
    }
}

/// One cutting operation for one client.
///
/// Owns the client's [`RollCatalog`]; writes go through the repository
/// only.
pub struct CutSession {
    repo: Arc<dyn RollRepository>,
    catalog: RollCatalog,
    state: SessionState,
    /// Set after a commit: the catalog no longer reflects the service.
    stale: bool,
}

impl CutSession {
    /// New session for a client; the catalog is loaded on first evaluation.
    pub fn new(repo: Arc<dyn RollRepository>, cliente_id: ClientId) -> Self {
        Self::with_catalog(repo, RollCatalog::new(cliente_id))
    }

    /// New session over an existing catalog.
    pub fn with_catalog(repo: Arc<dyn RollRepository>, catalog: RollCatalog) -> Self {
        let stale = !catalog.is_loaded();
        Self {
            repo,
            catalog,
            state: SessionState::Idle,
            stale,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn catalog(&self) -> &RollCatalog {
        &self.catalog
    }

    /// Whether the catalog must be re-fetched before the next evaluation.
    pub fn needs_refresh(&self) -> bool {
        self.stale
    }

    pub fn evaluation(&self) -> Option<&Evaluation> {
        match &self.state {
            SessionState::CandidatesReady(ev)
            | SessionState::Selecting(ev, _)
            | SessionState::Sufficient(ev, _) => Some(ev),
            SessionState::Idle | SessionState::Committed(_) => None,
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        match &self.state {
            SessionState::Selecting(_, sel) | SessionState::Sufficient(_, sel) => Some(sel),
            _ => None,
        }
    }

    /// Candidate rolls of the current evaluation, in catalog order.
    pub fn candidates(&self) -> Vec<&Roll> {
        self.evaluation()
            .map(|ev| {
                ev.candidates
                    .iter()
                    .filter_map(|id| self.catalog.get(*id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Usable length of the picked rolls.
    pub fn selected_total(&self) -> f64 {
        self.selection().map_or(0.0, Selection::total_usable)
    }

    /// Picked rolls whose leftovers are currently rejected.
    pub fn open_issues(&self) -> Vec<(RollId, LeftoverIssue)> {
        self.selection().map(Selection::issues).unwrap_or_default()
    }

    /// Re-fetch the catalog from the repository.
    pub async fn refresh(&mut self) -> Result<()> {
        self.catalog.refresh(self.repo.as_ref()).await?;
        self.stale = false;
        Ok(())
    }

    /// Validate a request and compute its candidates.
    ///
    /// Any current selection is discarded first. An invalid request leaves
    /// the session `Idle`. The catalog is re-fetched when stale or when the
    /// request names another client.
    pub async fn evaluate(&mut self, request: CutRequest) -> Result<Evaluation> {
        self.reset();

        if let Err(e) = validate_request(&request) {
            tracing::warn!(error = %e, "Invalid cut request");
            return Err(e);
        }

        if request.cliente_id != self.catalog.cliente_id() {
            self.catalog = RollCatalog::new(request.cliente_id);
            self.stale = true;
        }
        if self.stale {
            self.refresh().await?;
        }

        let found = self.catalog.candidates(&request.query());
        let available = RollCatalog::total_usable(found.iter().copied());
        let candidates: Vec<RollId> = found.iter().map(|r| r.id).collect();
        let feasible = float_cmp::approx_ge(available, request.metros_requeridos);

        if candidates.is_empty() {
            tracing::warn!(
                tipo_tela = %request.tipo_tela_query,
                color = %request.color_query,
                "No available rolls match the filters"
            );
        } else if !feasible {
            tracing::warn!(
                "Only {:.2} m available for {:.2} m requested",
                available,
                request.metros_requeridos
            );
        }
        tracing::info!(
            candidates = candidates.len(),
            available,
            feasible,
            "Cut request evaluated"
        );

        let evaluation = Evaluation {
            request,
            candidates,
            available,
            feasible,
        };
        self.state = SessionState::CandidatesReady(evaluation.clone());
        Ok(evaluation)
    }

    /// Run an edit against the selection and re-derive the state.
    fn edit_selection<F>(&mut self, action: &'static str, edit: F) -> Result<SessionPhase>
    where
        F: FnOnce(&RollCatalog, &Evaluation, &mut Selection) -> Result<()>,
    {
        let before = self.phase();
        let (evaluation, mut selection) =
            match std::mem::replace(&mut self.state, SessionState::Idle) {
                SessionState::CandidatesReady(ev) => (ev, Selection::default()),
                SessionState::Selecting(ev, sel) | SessionState::Sufficient(ev, sel) => (ev, sel),
                other => {
                    self.state = other;
                    return Err(TelasError::IllegalTransition {
                        state: before.as_str(),
                        action,
                    });
                }
            };

        let result = edit(&self.catalog, &evaluation, &mut selection);
        self.state = SessionState::classify(evaluation, selection);

        let after = self.phase();
        if after != before {
            tracing::info!(from = %before, to = %after, "Cut session transition");
        }
        result.map(|()| after)
    }

    /// Add a candidate roll to the selection, or remove it if present.
    pub fn toggle_select(&mut self, roll_id: RollId) -> Result<SessionPhase> {
        self.edit_selection("select a roll", |catalog, evaluation, selection| {
            if !evaluation.candidates.contains(&roll_id) {
                return Err(TelasError::invalid_input(
                    "roll_id",
                    format!("roll {} is not among the candidates", roll_id),
                ));
            }
            let roll = catalog.get(roll_id).ok_or_else(|| TelasError::NotFound {
                message: format!("Roll {} not found in catalog", roll_id),
            })?;
            let added = selection.toggle(roll);
            tracing::debug!(roll_id, added, "Roll toggled");
            Ok(())
        })
    }

    /// Edit the label a selected roll will be saved with.
    pub fn set_numero_rollo(
        &mut self,
        roll_id: RollId,
        numero_rollo: impl Into<String>,
    ) -> Result<SessionPhase> {
        let numero_rollo = numero_rollo.into();
        self.edit_selection("edit a roll", |_, _, selection| {
            if selection.set_numero_rollo(roll_id, numero_rollo) {
                Ok(())
            } else {
                Err(not_selected(roll_id))
            }
        })
    }

    /// Enter the leftovers of a selected roll, in meters.
    ///
    /// Out-of-range values are accepted and reported through
    /// [`CutSession::open_issues`]; they block commit.
    pub fn set_leftovers(
        &mut self,
        roll_id: RollId,
        resto_limpio: f64,
        resto_sucio: f64,
    ) -> Result<SessionPhase> {
        self.edit_selection("edit a roll", |_, _, selection| {
            if selection.set_leftovers(roll_id, resto_limpio, resto_sucio) {
                if let Some(Err(issue)) = selection.get(roll_id).map(SelectedRoll::check) {
                    tracing::debug!(roll_id, %issue, "Leftovers rejected");
                }
                Ok(())
            } else {
                Err(not_selected(roll_id))
            }
        })
    }

    /// Enter leftovers typed in either unit. An empty entry counts as zero.
    pub fn set_leftover_entries(
        &mut self,
        roll_id: RollId,
        resto_limpio: LengthEntry,
        resto_sucio: LengthEntry,
    ) -> Result<SessionPhase> {
        let limpio = resto_limpio.to_meters()?.unwrap_or(0.0);
        let sucio = resto_sucio.to_meters()?.unwrap_or(0.0);
        self.set_leftovers(roll_id, limpio, sucio)
    }

    /// Reasons the session cannot be committed right now.
    pub fn blocking_reasons(&self) -> Vec<String> {
        match &self.state {
            SessionState::Idle | SessionState::Committed(_) => {
                vec!["no cut request has been evaluated".to_string()]
            }
            SessionState::CandidatesReady(_) => vec!["no rolls selected".to_string()],
            SessionState::Sufficient(..) => Vec::new(),
            SessionState::Selecting(ev, sel) => {
                let mut reasons = validate_selection(sel).errors;
                let total = sel.total_usable();
                if !float_cmp::approx_ge(total, ev.request.metros_requeridos) {
                    reasons.push(format!(
                        "selected {:.2} m of {:.2} m required",
                        total, ev.request.metros_requeridos
                    ));
                }
                reasons
            }
        }
    }

    /// The patches a commit would issue now.
    pub fn plan(&self) -> Result<Vec<PlannedPatch>> {
        match &self.state {
            SessionState::Sufficient(_, sel) => Ok(plan_patches(sel)),
            SessionState::CandidatesReady(_) | SessionState::Selecting(..) => {
                Err(TelasError::SessionInvalid {
                    reasons: self.blocking_reasons(),
                })
            }
            SessionState::Idle | SessionState::Committed(_) => Err(TelasError::IllegalTransition {
                state: self.phase().as_str(),
                action: "plan a commit",
            }),
        }
    }

    /// Patch every selected roll according to the retention rule.
    ///
    /// Patches go out one at a time in pick order and are not rolled back
    /// when a later one fails. On full success the session passes through
    /// `Committed` and resets to `Idle`. On partial failure it keeps its
    /// selection so the caller may retry, and the error carries every
    /// per-roll outcome. The catalog is re-fetched before the next
    /// evaluation either way.
    pub async fn commit(&mut self) -> Result<CommitSummary> {
        let planned = self.plan()?;
        let (cliente_id, metros_requeridos) = self
            .evaluation()
            .map(|ev| (ev.request.cliente_id, ev.request.metros_requeridos))
            .unwrap_or_default();

        tracing::info!(rolls = planned.len(), cliente_id, "Committing cut");

        let mut outcomes = Vec::with_capacity(planned.len());
        for PlannedPatch {
            roll_id,
            patch,
            retired,
            ..
        } in planned
        {
            let (error_code, error) = match self.repo.patch_roll(roll_id, &patch).await {
                Ok(_) => {
                    tracing::debug!(roll_id, retired, "Roll patched");
                    (None, None)
                }
                Err(e) => {
                    tracing::warn!(roll_id, error = %e, "Roll patch failed");
                    (Some(e.code()), Some(e.to_string()))
                }
            };
            outcomes.push(RollOutcome {
                roll_id,
                patch,
                retired,
                error_code,
                error,
            });
        }
        self.stale = true;

        let summary = CommitSummary {
            cliente_id,
            metros_requeridos,
            outcomes,
        };

        if !summary.is_complete() {
            tracing::warn!(
                ok = summary.ok_count(),
                failed = summary.failed_count(),
                "Cut partially committed"
            );
            return Err(TelasError::PartialCommit { summary });
        }

        tracing::info!(
            rolls = summary.ok_count(),
            retired = summary.retired_count(),
            "Cut committed"
        );
        self.state = SessionState::Committed(summary.clone());
        self.reset();
        Ok(summary)
    }

    /// Drop the request and selection.
    pub fn reset(&mut self) {
        if self.phase() != SessionPhase::Idle {
            tracing::debug!(from = %self.phase(), "Cut session reset");
        }
        self.state = SessionState::Idle;
    }

    /// One-line progress report for the operator.
    pub fn status_line(&self) -> String {
        match &self.state {
            SessionState::Idle => "Enter fabric type, color and meters required.".to_string(),
            SessionState::CandidatesReady(ev) if ev.candidates.is_empty() => {
                "No available rolls match the filters.".to_string()
            }
            SessionState::CandidatesReady(ev) => format!(
                "Select rolls until at least {} m are covered ({:.2} m available).",
                ev.request.metros_requeridos, ev.available
            ),
            SessionState::Selecting(_, sel) if !sel.all_valid() => format!(
                "Selected {:.2} m; {} roll(s) have invalid leftovers.",
                sel.total_usable(),
                sel.issues().len()
            ),
            SessionState::Selecting(_, sel) => format!(
                "Not enough yet. Selected: {:.2} m.",
                sel.total_usable()
            ),
            SessionState::Sufficient(_, sel) => format!(
                "Enough metraje selected ({:.2} m).",
                sel.total_usable()
            ),
            SessionState::Committed(summary) => {
                format!("{} roll(s) updated.", summary.ok_count())
            }
        }
    }
}

fn not_selected(roll_id: RollId) -> TelasError {
    TelasError::invalid_input("roll_id", format!("roll {} is not selected", roll_id))
}
