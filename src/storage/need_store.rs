//! NeedStore trait definition.

use async_trait::async_trait;
use uuid::Uuid;

use super::Result;
use crate::model::{Need, NewNeed};

/// Interface for need persistence.
///
/// `apply_fulfillment` is the only mutator after creation. It increments
/// `quantity_fulfilled` and recomputes `status` in one conditional update,
/// rejecting (never clamping) a delta larger than the remaining quantity.
#[async_trait]
pub trait NeedStore: Send + Sync {
    async fn create(&self, need: NewNeed) -> Result<Need>;

    async fn get(&self, need_id: Uuid) -> Result<Option<Need>>;

    /// Needs of a camp, most urgent first.
    async fn list_by_camp(&self, camp_id: Uuid) -> Result<Vec<Need>>;

    async fn apply_fulfillment(&self, need_id: Uuid, delta: i64) -> Result<Need>;
}
