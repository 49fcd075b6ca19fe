//! Bulk import of rolls from comma-separated text.
//!
//! The first non-empty line is the header; every following non-empty line
//! becomes one roll owned by the importing client. A bad record never stops
//! the import: it is counted, reported and skipped.

pub mod records;

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Unit;
use crate::error::{ErrorCode, Result, TelasError};
use crate::model::{ClientId, NewRoll, Roll};
use crate::repository::RollRepository;

pub use records::{parse_header, parse_record, HeaderMap};

/// Which column holds the roll length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthColumn {
    /// `metraje` when present, otherwise `yards`.
    #[default]
    Auto,
    /// Meters, from the `metraje` column.
    Metraje,
    /// Yards, from the `yards` column, converted to meters.
    Yards,
}

impl LengthColumn {
    /// Header name reported when the column is missing.
    pub fn required_name(&self) -> &'static str {
        match self {
            LengthColumn::Auto => "metraje or yards",
            LengthColumn::Metraje => "metraje",
            LengthColumn::Yards => "yards",
        }
    }
}

impl FromStr for LengthColumn {
    type Err = TelasError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(LengthColumn::Auto);
        }
        match Unit::from_name(s) {
            Some(Unit::Meters) => Ok(LengthColumn::Metraje),
            Some(Unit::Yards) => Ok(LengthColumn::Yards),
            None => Err(TelasError::invalid_input(
                "length_column",
                format!("'{}' is not one of auto, metraje, yards", s.trim()),
            )),
        }
    }
}

/// How an import reads its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportPolicy {
    pub length_column: LengthColumn,
}

impl ImportPolicy {
    pub fn new(length_column: LengthColumn) -> Self {
        Self { length_column }
    }
}

/// One record that did not become a roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFailure {
    /// Position among data records, from 1.
    pub row: usize,
    /// Label of the record when it could be read, empty otherwise.
    pub numero_rollo: String,
    pub code: ErrorCode,
    pub message: String,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub ok: usize,
    pub failed: usize,
    pub failures: Vec<ImportFailure>,
    /// Rolls as created by the record service.
    pub created: Vec<Roll>,
}

impl ImportSummary {
    /// Records seen, accepted or not.
    pub fn total(&self) -> usize {
        self.ok + self.failed
    }

    fn record_failure(&mut self, row: usize, numero_rollo: String, error: &TelasError) {
        tracing::warn!(row, numero_rollo = %numero_rollo, error = %error, "Import record rejected");
        self.failed += 1;
        self.failures.push(ImportFailure {
            row,
            numero_rollo,
            code: error.code(),
            message: error.to_string(),
        });
    }
}

/// Creates rolls from comma-separated text.
pub struct BulkImporter {
    repo: Arc<dyn RollRepository>,
}

impl BulkImporter {
    pub fn new(repo: Arc<dyn RollRepository>) -> Self {
        Self { repo }
    }

    /// Import every record of `text` as a roll of `cliente_id`.
    ///
    /// Fails only when the header is unusable or the client id is invalid;
    /// per-record problems are reported in the summary. Records are created
    /// one at a time in file order.
    pub async fn import(
        &self,
        text: &str,
        cliente_id: ClientId,
        policy: ImportPolicy,
    ) -> Result<ImportSummary> {
        if cliente_id <= 0 {
            return Err(TelasError::invalid_input(
                "cliente_id",
                format!("{} is not a valid client", cliente_id),
            ));
        }

        let mut lines = records::split_records(text);
        let header_line = lines.next().unwrap_or_default();
        let header = parse_header(header_line, policy.length_column)?;
        tracing::debug!(?header, "Import header resolved");

        let mut summary = ImportSummary::default();
        for (index, line) in lines.enumerate() {
            let row = index + 1;
            let roll = match parse_record(line, &header, cliente_id) {
                Ok(roll) => roll,
                Err(e) => {
                    let label = label_of(line, &header);
                    summary.record_failure(row, label, &e);
                    continue;
                }
            };

            match self.create(&roll).await {
                Ok(created) => {
                    tracing::debug!(row, id = created.id, "Roll imported");
                    summary.ok += 1;
                    summary.created.push(created);
                }
                Err(e) => summary.record_failure(row, roll.numero_rollo, &e),
            }
        }

        tracing::info!(
            cliente_id,
            ok = summary.ok,
            failed = summary.failed,
            "Import finished"
        );
        Ok(summary)
    }

    async fn create(&self, roll: &NewRoll) -> Result<Roll> {
        self.repo.create_roll(roll).await
    }
}

/// Best-effort label of a record that failed to parse.
fn label_of(line: &str, header: &HeaderMap) -> String {
    records::split_fields(line)
        .get(header.numero_rollo)
        .map(|s| s.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Client;
    use crate::repository::MemoryRepository;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn repo_with_client() -> Arc<MemoryRepository> {
        let repo = Arc::new(MemoryRepository::new());
        repo.insert_client(Client {
            id: 3,
            nombre: "Textiles Ruiz".into(),
            created_at: Some(Utc::now()),
        });
        repo
    }

    // ==================== LengthColumn tests ====================

    #[test]
    fn test_length_column_from_str() {
        assert_eq!("AUTO".parse::<LengthColumn>().unwrap(), LengthColumn::Auto);
        assert_eq!("metraje".parse::<LengthColumn>().unwrap(), LengthColumn::Metraje);
        assert_eq!("yd".parse::<LengthColumn>().unwrap(), LengthColumn::Yards);
        assert_eq!("Metros".parse::<LengthColumn>().unwrap(), LengthColumn::Metraje);
        assert_eq!(" yardas ".parse::<LengthColumn>().unwrap(), LengthColumn::Yards);
        assert!("feet".parse::<LengthColumn>().is_err());
    }

    // ==================== import tests ====================

    #[tokio::test]
    async fn test_import_forces_client() {
        let repo = repo_with_client();
        let importer = BulkImporter::new(repo.clone());
        let text = "numero_rollo,lote,tipo_tela,color,fecha,metraje,disponible\n\
                    1,F1,lino,azul,2024-05-01,40,true\n\
                    \n\
                    2,F1,lino,rojo,2024-05-01,35.5,1\n";
        let summary = importer
            .import(text, 3, ImportPolicy::default())
            .await
            .unwrap();
        assert_eq!(summary.ok, 2);
        assert_eq!(summary.failed, 0);
        assert!(summary.created.iter().all(|r| r.cliente_id == 3));
        assert_eq!(summary.created[1].metraje, 35.5);
    }

    #[tokio::test]
    async fn test_import_header_error_creates_nothing() {
        let repo = repo_with_client();
        let importer = BulkImporter::new(repo.clone());
        let err = importer
            .import("numero,lote\n1,2\n", 3, ImportPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Header);
        assert_eq!(repo.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_import_empty_text_is_header_error() {
        let importer = BulkImporter::new(repo_with_client());
        let err = importer
            .import("  \n", 3, ImportPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TelasError::Header { .. }));
    }

    #[tokio::test]
    async fn test_import_local_failures_counted() {
        let repo = repo_with_client();
        let importer = BulkImporter::new(repo.clone());
        let text = "numero_rollo,lote,tipo_tela,color,fecha,metraje,disponible\n\
                    1,F1,lino,azul,2024-05-01,40,true\n\
                    2,F1,lino,azul,2024-13-01,40,true\n\
                    3,F1,lino,azul claro, celeste,2024-05-01,40,true\n";
        let summary = importer
            .import(text, 3, ImportPolicy::default())
            .await
            .unwrap();
        assert_eq!(summary.ok, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.failures[0].row, 2);
        assert_eq!(summary.failures[0].code, ErrorCode::InvalidInput);
        assert_eq!(summary.failures[1].row, 3);
        assert_eq!(summary.failures[1].numero_rollo, "3");
        assert_eq!(repo.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_import_rejects_invalid_client() {
        let importer = BulkImporter::new(repo_with_client());
        assert!(importer
            .import("numero_rollo", 0, ImportPolicy::default())
            .await
            .is_err());
    }
}
