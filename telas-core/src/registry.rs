//! Client management and single-roll entry.

use std::sync::Arc;

use crate::catalog::ClientStats;
use crate::error::{Result, TelasError};
use crate::model::{Client, ClientId, ClientPatch, NewClient, NewRoll, Roll, RollId};
use crate::repository::RollRepository;
use crate::validation::{ensure_new_roll, validate_client_name};

/// CRUD over clients, backed by the record service.
///
/// Names are trimmed and must be non-empty. Deleting a client that still
/// owns rolls is refused by the service and surfaced as
/// [`TelasError::Validation`]; rolls are never deleted on the client's
/// behalf.
pub struct ClientRegistry {
    repo: Arc<dyn RollRepository>,
}

impl ClientRegistry {
    pub fn new(repo: Arc<dyn RollRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Client>> {
        self.repo.list_clients(search).await
    }

    pub async fn get(&self, id: ClientId) -> Result<Client> {
        self.repo.get_client(id).await
    }

    pub async fn create(&self, nombre: &str) -> Result<Client> {
        let nombre = validate_client_name(nombre)?;
        let client = self.repo.create_client(&NewClient { nombre }).await?;
        tracing::info!(id = client.id, nombre = %client.nombre, "Client created");
        Ok(client)
    }

    pub async fn rename(&self, id: ClientId, nombre: &str) -> Result<Client> {
        let nombre = validate_client_name(nombre)?;
        let patch = ClientPatch {
            nombre: Some(nombre),
        };
        let client = self.repo.patch_client(id, &patch).await?;
        tracing::info!(id, nombre = %client.nombre, "Client renamed");
        Ok(client)
    }

    pub async fn delete(&self, id: ClientId) -> Result<()> {
        match self.repo.delete_client(id).await {
            Ok(()) => {
                tracing::info!(id, "Client deleted");
                Ok(())
            }
            Err(e @ TelasError::Validation { .. }) => {
                tracing::warn!(id, error = %e, "Client still owns rolls");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Roll counts for the client's dashboard.
    pub async fn stats(&self, id: ClientId) -> Result<ClientStats> {
        let rolls = self.repo.list_client_rolls(id, None).await?;
        Ok(ClientStats::from_rolls(&rolls))
    }

    /// Rolls of a client, optionally only (un)available ones.
    pub async fn rolls(&self, id: ClientId, disponible: Option<bool>) -> Result<Vec<Roll>> {
        self.repo.list_client_rolls(id, disponible).await
    }

    /// Create one roll after local validation.
    pub async fn add_roll(&self, roll: &NewRoll) -> Result<Roll> {
        ensure_new_roll(roll)?;
        let created = self.repo.create_roll(roll).await?;
        tracing::info!(
            id = created.id,
            cliente_id = created.cliente_id,
            numero_rollo = %created.numero_rollo,
            "Roll created"
        );
        Ok(created)
    }

    pub async fn delete_roll(&self, id: RollId) -> Result<()> {
        self.repo.delete_roll(id).await?;
        tracing::info!(id, "Roll deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::repository::MemoryRepository;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn registry() -> (Arc<MemoryRepository>, ClientRegistry) {
        let repo = Arc::new(MemoryRepository::new());
        let registry = ClientRegistry::new(repo.clone());
        (repo, registry)
    }

    fn new_roll(cliente_id: ClientId, disponible: bool) -> NewRoll {
        NewRoll {
            cliente_id,
            numero_rollo: "A-1".into(),
            lote: "F-77".into(),
            tipo_tela: "jersey".into(),
            color: "gris".into(),
            fecha: NaiveDate::from_ymd_opt(2024, 9, 9).unwrap(),
            metraje: 45.0,
            disponible,
            resto_limpio: 0.0,
            resto_sucio: 0.0,
        }
    }

    // ==================== client tests ====================

    #[tokio::test]
    async fn test_create_trims_name() {
        let (_, registry) = registry();
        let client = registry.create("  Confecciones Sol ").await.unwrap();
        assert_eq!(client.nombre, "Confecciones Sol");
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let (_, registry) = registry();
        let err = registry.create("   ").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(registry.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rename() {
        let (_, registry) = registry();
        let client = registry.create("Sol").await.unwrap();
        let renamed = registry.rename(client.id, "Sol SRL").await.unwrap();
        assert_eq!(renamed.nombre, "Sol SRL");
        assert_eq!(renamed.created_at, client.created_at);
        assert!(registry.rename(client.id, "").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_refused_while_rolls_exist() {
        let (repo, registry) = registry();
        let client = registry.create("Sol").await.unwrap();
        let roll = registry.add_roll(&new_roll(client.id, true)).await.unwrap();

        let err = registry.delete(client.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert!(repo.roll(roll.id).is_some());

        registry.delete_roll(roll.id).await.unwrap();
        registry.delete(client.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_missing_client() {
        let (_, registry) = registry();
        let err = registry.get(42).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    // ==================== roll tests ====================

    #[tokio::test]
    async fn test_add_roll_validates_locally() {
        let (repo, registry) = registry();
        let client = registry.create("Sol").await.unwrap();
        let mut roll = new_roll(client.id, true);
        roll.metraje = -4.0;
        assert!(registry.add_roll(&roll).await.is_err());
        assert_eq!(repo.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let (_, registry) = registry();
        let client = registry.create("Sol").await.unwrap();
        for disponible in [true, true, false] {
            registry
                .add_roll(&new_roll(client.id, disponible))
                .await
                .unwrap();
        }
        let stats = registry.stats(client.id).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.disponibles, 2);
        assert_eq!(stats.usados, 1);
        assert_eq!(stats.availability_pct, 67);
        assert_eq!(
            registry.rolls(client.id, Some(false)).await.unwrap().len(),
            1
        );
    }
}
