//! AssistanceLedger trait definition.

use async_trait::async_trait;
use uuid::Uuid;

use super::Result;
use crate::model::{Assistance, DeliveryStatus, NewAssistance};

/// Append-only record of NGO assistance.
///
/// Entries are immutable apart from `delivery_status`, which only moves
/// `pledged -> in_transit -> delivered`. Listings are newest first.
#[async_trait]
pub trait AssistanceLedger: Send + Sync {
    /// Persist an entry with a generated id and timestamp, status `pledged`.
    async fn record(&self, entry: NewAssistance) -> Result<Assistance>;

    async fn get(&self, entry_id: Uuid) -> Result<Option<Assistance>>;

    async fn list_by_need(&self, need_id: Uuid) -> Result<Vec<Assistance>>;

    async fn list_by_ngo(&self, ngo_id: Uuid) -> Result<Vec<Assistance>>;

    async fn list_by_camp(&self, camp_id: Uuid) -> Result<Vec<Assistance>>;

    /// Move an entry one step forward. Any other edge is `InvalidTransition`.
    async fn advance_delivery_status(
        &self,
        entry_id: Uuid,
        next: DeliveryStatus,
    ) -> Result<Assistance>;
}
