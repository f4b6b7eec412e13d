//! CampStore trait definition.

use async_trait::async_trait;
use uuid::Uuid;

use super::Result;
use crate::model::{Camp, CampStatus, NewCamp};

/// Interface for camp persistence.
///
/// Seat accounting is owned by the store: `reserve_seat` and `release_seat`
/// are conditional updates that keep `0 <= occupied_seats <= total_capacity`
/// under concurrent callers. Occupancy also drives the `full` status.
///
/// Implementations:
/// - `SqliteCampStore`: SQLite storage
/// - `MockCampStore`: In-memory store for testing
#[async_trait]
pub trait CampStore: Send + Sync {
    async fn create(&self, camp: NewCamp) -> Result<Camp>;

    async fn get(&self, camp_id: Uuid) -> Result<Option<Camp>>;

    /// All camps ordered by name.
    async fn list(&self) -> Result<Vec<Camp>>;

    /// Camps owned by an admin, oldest first.
    async fn list_by_admin(&self, admin_id: Uuid) -> Result<Vec<Camp>>;

    /// Set `active` or `inactive`. A camp at capacity stays `full` when
    /// activated.
    async fn update_status(&self, camp_id: Uuid, status: CampStatus) -> Result<Camp>;

    /// Delete a camp. Its needs and volunteer registrations go with it;
    /// ledger entries stay with their need reference cleared.
    async fn delete(&self, camp_id: Uuid) -> Result<()>;

    /// Occupy one seat, failing with `CapacityExceeded` when the camp is full.
    async fn reserve_seat(&self, camp_id: Uuid) -> Result<Camp>;

    /// Free one seat.
    async fn release_seat(&self, camp_id: Uuid) -> Result<Camp>;
}
