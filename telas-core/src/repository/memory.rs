//! In-process record store with the record service's integrity rules.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::RollRepository;
use crate::error::{Result, TelasError};
use crate::model::{
    Client, ClientId, ClientPatch, NewClient, NewRoll, Roll, RollFilter, RollId, RollPatch,
};

#[derive(Debug, Default)]
struct Store {
    clients: BTreeMap<ClientId, Client>,
    rolls: BTreeMap<RollId, Roll>,
    next_client_id: ClientId,
    next_roll_id: RollId,
    /// Rolls whose patches are answered with a server error.
    failing_patches: HashSet<RollId>,
    /// Every patch accepted, in arrival order.
    patch_log: Vec<(RollId, RollPatch)>,
    /// Number of create calls received, accepted or not.
    create_calls: usize,
}

/// Record store kept in memory.
///
/// Mirrors the service's behavior: blank `numero_rollo` and unknown
/// owners are refused on create, clients with rolls cannot be deleted,
/// missing ids are `NotFound`.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    store: Mutex<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        // A poisoned lock only means a panicking test thread; the data is still usable.
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a client directly, bypassing validation.
    pub fn insert_client(&self, client: Client) {
        let mut store = self.lock();
        store.next_client_id = store.next_client_id.max(client.id);
        store.clients.insert(client.id, client);
    }

    /// Store a roll directly, bypassing validation.
    pub fn insert_roll(&self, roll: Roll) {
        let mut store = self.lock();
        store.next_roll_id = store.next_roll_id.max(roll.id);
        store.rolls.insert(roll.id, roll);
    }

    /// Make every future patch of `id` fail with a server error.
    pub fn fail_patches_for(&self, id: RollId) {
        self.lock().failing_patches.insert(id);
    }

    /// Patches accepted so far, in arrival order.
    pub fn patch_log(&self) -> Vec<(RollId, RollPatch)> {
        self.lock().patch_log.clone()
    }

    /// Create calls received so far.
    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    /// Current stored copy of a roll.
    pub fn roll(&self, id: RollId) -> Option<Roll> {
        self.lock().rolls.get(&id).cloned()
    }
}

fn not_found(kind: &str, id: i64) -> TelasError {
    TelasError::NotFound {
        message: format!("{} {} not found", kind, id),
    }
}

#[async_trait]
impl RollRepository for MemoryRepository {
    async fn list_rolls(&self, filter: &RollFilter) -> Result<Vec<Roll>> {
        let store = self.lock();
        Ok(store
            .rolls
            .values()
            .filter(|r| filter.accepts(r))
            .cloned()
            .collect())
    }

    async fn list_client_rolls(
        &self,
        cliente_id: ClientId,
        disponible: Option<bool>,
    ) -> Result<Vec<Roll>> {
        let known = self.lock().clients.contains_key(&cliente_id);
        if !known {
            return Err(not_found("Client", cliente_id));
        }
        let filter = RollFilter {
            cliente_id: Some(cliente_id),
            disponible,
            ..Default::default()
        };
        self.list_rolls(&filter).await
    }

    async fn get_roll(&self, id: RollId) -> Result<Roll> {
        self.roll(id).ok_or_else(|| not_found("Roll", id))
    }

    async fn create_roll(&self, roll: &NewRoll) -> Result<Roll> {
        let mut store = self.lock();
        store.create_calls += 1;

        if roll.numero_rollo.trim().is_empty() {
            return Err(TelasError::Validation {
                message: "numero_rollo: This field may not be blank.".to_string(),
            });
        }
        if !store.clients.contains_key(&roll.cliente_id) {
            return Err(TelasError::Validation {
                message: format!("cliente: client {} does not exist", roll.cliente_id),
            });
        }

        store.next_roll_id += 1;
        let created = roll.clone().into_roll(store.next_roll_id);
        store.rolls.insert(created.id, created.clone());
        Ok(created)
    }

    async fn patch_roll(&self, id: RollId, patch: &RollPatch) -> Result<Roll> {
        let mut store = self.lock();
        if store.failing_patches.contains(&id) {
            return Err(TelasError::Server {
                status: 500,
                message: format!("PATCH /rollos/{}/ failed with HTTP 500", id),
            });
        }
        let roll = store.rolls.get_mut(&id).ok_or_else(|| not_found("Roll", id))?;
        patch.apply_to(roll);
        let updated = roll.clone();
        store.patch_log.push((id, patch.clone()));
        Ok(updated)
    }

    async fn delete_roll(&self, id: RollId) -> Result<()> {
        self.lock()
            .rolls
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found("Roll", id))
    }

    async fn list_clients(&self, search: Option<&str>) -> Result<Vec<Client>> {
        let needle = search.unwrap_or("").trim().to_lowercase();
        let store = self.lock();
        Ok(store
            .clients
            .values()
            .filter(|c| c.nombre.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn get_client(&self, id: ClientId) -> Result<Client> {
        self.lock()
            .clients
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("Client", id))
    }

    async fn create_client(&self, client: &NewClient) -> Result<Client> {
        let mut store = self.lock();
        if store.clients.values().any(|c| c.nombre == client.nombre) {
            return Err(TelasError::Validation {
                message: format!("nombre: client '{}' already exists", client.nombre),
            });
        }
        store.next_client_id += 1;
        let created = Client {
            id: store.next_client_id,
            nombre: client.nombre.clone(),
            created_at: Some(Utc::now()),
        };
        store.clients.insert(created.id, created.clone());
        Ok(created)
    }

    async fn patch_client(&self, id: ClientId, patch: &ClientPatch) -> Result<Client> {
        let mut store = self.lock();
        let client = store
            .clients
            .get_mut(&id)
            .ok_or_else(|| not_found("Client", id))?;
        if let Some(nombre) = &patch.nombre {
            client.nombre = nombre.clone();
        }
        Ok(client.clone())
    }

    async fn delete_client(&self, id: ClientId) -> Result<()> {
        let mut store = self.lock();
        if !store.clients.contains_key(&id) {
            return Err(not_found("Client", id));
        }
        let owned = store.rolls.values().filter(|r| r.cliente_id == id).count();
        if owned > 0 {
            return Err(TelasError::Validation {
                message: format!("Client {} still has {} roll(s) and cannot be deleted", id, owned),
            });
        }
        store.clients.remove(&id);
        Ok(())
    }
}
