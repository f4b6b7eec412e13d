//! Fulfillment coordinator.
//!
//! Turns an NGO pledge into a committed ledger entry plus an updated need,
//! and drives delivery status forward afterwards.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use super::{errmsg, require_found, require_role, Result, ServiceError};
use crate::actor::Actor;
use crate::config::FulfillmentConfig;
use crate::model::{errmsg as model_errmsg, Assistance, DeliveryStatus, Pledge, PledgeReceipt, Role};
use crate::storage::{AssistanceLedger, NeedStore, PledgeStore};
use crate::utils::retry::retry_on_contention;

/// Coordinates pledges and delivery tracking.
///
/// The pledge commit itself is delegated to [`PledgeStore`], which checks the
/// remaining quantity, appends the ledger entry and updates the need in one
/// unit. The coordinator validates the request, retries lost races, and
/// reports whatever does not fit as `OverCommit`.
#[derive(Clone)]
pub struct FulfillmentCoordinator {
    needs: Arc<dyn NeedStore>,
    ledger: Arc<dyn AssistanceLedger>,
    pledges: Arc<dyn PledgeStore>,
    retry: FulfillmentConfig,
}

impl FulfillmentCoordinator {
    pub fn new(
        needs: Arc<dyn NeedStore>,
        ledger: Arc<dyn AssistanceLedger>,
        pledges: Arc<dyn PledgeStore>,
        retry: FulfillmentConfig,
    ) -> Self {
        Self {
            needs,
            ledger,
            pledges,
            retry,
        }
    }

    /// Pledge `quantity` units against a need.
    ///
    /// A non-NGO actor is rejected as a validation failure, not an
    /// authorization one.
    #[instrument(name = "pledge_assistance", skip(self, notes), fields(actor = %actor.id))]
    pub async fn pledge_assistance(
        &self,
        actor: &Actor,
        need_id: Uuid,
        quantity: i64,
        notes: Option<String>,
    ) -> Result<PledgeReceipt> {
        if actor.role != Role::Ngo {
            return Err(ServiceError::Validation(errmsg::PLEDGE_REQUIRES_NGO.to_string()));
        }
        if quantity <= 0 {
            return Err(ServiceError::Validation(
                model_errmsg::QUANTITY_POSITIVE.to_string(),
            ));
        }

        let pledge = Pledge {
            need_id,
            ngo_id: actor.id,
            quantity,
            notes,
        };
        let receipt = retry_on_contention(&self.retry, "pledge_assistance", || {
            self.pledges.commit_pledge(pledge.clone())
        })
        .await?;

        info!(
            assistance_id = %receipt.assistance.id,
            fulfilled = receipt.need.quantity_fulfilled,
            needed = receipt.need.quantity_needed,
            status = %receipt.need.status,
            "Pledge committed"
        );
        Ok(receipt)
    }

    /// Move a ledger entry one delivery step forward. Only the pledging NGO
    /// may do this.
    #[instrument(name = "advance_delivery", skip(self), fields(actor = %actor.id))]
    pub async fn advance_delivery(
        &self,
        actor: &Actor,
        entry_id: Uuid,
        next: DeliveryStatus,
    ) -> Result<Assistance> {
        let entry = require_found(self.ledger.get(entry_id).await?, "assistance", entry_id)?;
        if entry.ngo_id != actor.id {
            return Err(ServiceError::Authorization(errmsg::NOT_PLEDGE_OWNER.to_string()));
        }

        let updated = retry_on_contention(&self.retry, "advance_delivery", || {
            self.ledger.advance_delivery_status(entry_id, next)
        })
        .await?;
        info!(%entry_id, status = %updated.delivery_status, "Delivery advanced");
        Ok(updated)
    }

    /// Ledger entries against a need, newest first.
    pub async fn pledges_for_need(&self, need_id: Uuid) -> Result<Vec<Assistance>> {
        require_found(self.needs.get(need_id).await?, "need", need_id)?;
        Ok(self.ledger.list_by_need(need_id).await?)
    }

    /// The actor's own pledges, newest first.
    pub async fn pledges_by_ngo(&self, actor: &Actor) -> Result<Vec<Assistance>> {
        require_role(actor, Role::Ngo, errmsg::PLEDGE_REQUIRES_NGO)?;
        Ok(self.ledger.list_by_ngo(actor.id).await?)
    }

    /// Every ledger entry delivered to a camp, including entries whose need
    /// has since been removed.
    pub async fn pledges_for_camp(&self, camp_id: Uuid) -> Result<Vec<Assistance>> {
        Ok(self.ledger.list_by_camp(camp_id).await?)
    }
}
