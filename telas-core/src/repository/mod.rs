//! Access to the remote record service.
//!
//! [`RollRepository`] is the only way the core reads or writes records.
//! [`HttpRollRepository`] talks to the service over HTTP/JSON;
//! [`MemoryRepository`] keeps records in process and applies the same
//! integrity rules, for tests and offline use.

mod http;
mod memory;

pub use http::HttpRollRepository;
pub use memory::MemoryRepository;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    Client, ClientId, ClientPatch, NewClient, NewRoll, Roll, RollFilter, RollId, RollPatch,
};

/// Operations offered by the record service.
///
/// `get_*` and `list_*` have no side effects. `patch_roll` is idempotent
/// for the same target values. `create_*` is not: callers that retry must
/// guard against duplicates themselves.
#[async_trait]
pub trait RollRepository: Send + Sync {
    /// List rolls matching the filter.
    async fn list_rolls(&self, filter: &RollFilter) -> Result<Vec<Roll>>;

    /// List the rolls of one client, optionally only (un)available ones.
    async fn list_client_rolls(
        &self,
        cliente_id: ClientId,
        disponible: Option<bool>,
    ) -> Result<Vec<Roll>>;

    async fn get_roll(&self, id: RollId) -> Result<Roll>;

    async fn create_roll(&self, roll: &NewRoll) -> Result<Roll>;

    async fn patch_roll(&self, id: RollId, patch: &RollPatch) -> Result<Roll>;

    async fn delete_roll(&self, id: RollId) -> Result<()>;

    /// List clients, optionally narrowed by a free-text search.
    async fn list_clients(&self, search: Option<&str>) -> Result<Vec<Client>>;

    async fn get_client(&self, id: ClientId) -> Result<Client>;

    async fn create_client(&self, client: &NewClient) -> Result<Client>;

    async fn patch_client(&self, id: ClientId, patch: &ClientPatch) -> Result<Client>;

    /// Fails with a validation error while the client still owns rolls.
    async fn delete_client(&self, id: ClientId) -> Result<()>;

    /// Check that the service answers; returns the number of clients seen.
    async fn ping(&self) -> Result<usize> {
        Ok(self.list_clients(None).await?.len())
    }
}
