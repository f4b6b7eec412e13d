//! PledgeStore trait definition.

use async_trait::async_trait;

use super::Result;
use crate::model::{Pledge, PledgeReceipt};

/// Commits a pledge across the need and ledger relations.
///
/// The remaining-quantity check, the increment, the status recompute and the
/// ledger append happen as one unit: either all are visible or none are.
/// Concurrent pledges against one need never commit more than it asked for.
#[async_trait]
pub trait PledgeStore: Send + Sync {
    async fn commit_pledge(&self, pledge: Pledge) -> Result<PledgeReceipt>;
}
