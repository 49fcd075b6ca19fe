//! telas-core - Core library for fabric roll inventory and cut planning.
//!
//! Rolls of fabric belong to clients and live in a remote record service.
//! This library selects the rolls that can satisfy a cut, validates the
//! leftovers the operator enters, and writes the results back according to
//! the retention rule: a roll keeps circulating only while its clean
//! remainder exceeds 15 m.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use telas_core::{CutRequest, CutSession, HttpRollRepository, ServiceConfig};
//!
//! # async fn run() -> telas_core::Result<()> {
//! let repo = Arc::new(HttpRollRepository::new(&ServiceConfig::default())?);
//! let mut session = CutSession::new(repo, 1);
//!
//! let evaluation = session
//!     .evaluate(CutRequest::new(1, "gabardina", "azul", 80.0))
//!     .await?;
//! let first = evaluation.candidates[0];
//! session.toggle_select(first)?;
//! session.set_leftovers(first, 20.0, 0.0)?;
//! let summary = session.commit().await?;
//! println!("{} roll(s) updated", summary.ok_count());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod debounce;
pub mod error;
pub mod import;
pub mod model;
pub mod registry;
pub mod repository;
pub mod session;
pub mod units;
pub mod validation;

// Re-exports for convenience
pub use catalog::{ClientStats, RollCatalog};
pub use config::{ServiceConfig, Unit};
pub use debounce::Debouncer;
pub use error::{ErrorCode, Result, TelasError};
pub use import::{BulkImporter, ImportFailure, ImportPolicy, ImportSummary, LengthColumn};
pub use model::{
    CandidateQuery, Client, ClientId, CutRequest, NewRoll, Roll, RollFilter, RollId, RollPatch,
};
pub use registry::ClientRegistry;
pub use repository::{HttpRollRepository, MemoryRepository, RollRepository};
pub use session::{CommitSummary, CutSession, Evaluation, PlannedPatch, SessionPhase, SessionState};
pub use units::{meters_to_yards, yards_to_meters, LengthEntry};
pub use validation::ValidationResult;
