//! Need creation and lookup.
//!
//! Needs are only ever mutated through the fulfillment coordinator; this
//! service creates and reads them.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{errmsg, require_found, require_role, Result, ServiceError};
use crate::actor::Actor;
use crate::model::{Need, NewNeed, Role, Urgency};
use crate::storage::{CampStore, NeedStore};

/// Need fields supplied by a camp administrator.
#[derive(Debug, Clone, Deserialize)]
pub struct NeedDraft {
    pub item_name: String,
    pub quantity_needed: i64,
    pub urgency: Urgency,
}

#[derive(Clone)]
pub struct NeedService {
    camps: Arc<dyn CampStore>,
    needs: Arc<dyn NeedStore>,
}

impl NeedService {
    pub fn new(camps: Arc<dyn CampStore>, needs: Arc<dyn NeedStore>) -> Self {
        Self { camps, needs }
    }

    /// Post a need for a camp the actor administers.
    pub async fn create(&self, actor: &Actor, camp_id: Uuid, draft: NeedDraft) -> Result<Need> {
        require_role(actor, Role::Camp, errmsg::CAMP_ROLE_REQUIRED)?;
        let camp = require_found(self.camps.get(camp_id).await?, "camp", camp_id)?;
        if camp.admin_id != actor.id {
            return Err(ServiceError::Authorization(errmsg::NOT_CAMP_OWNER.to_string()));
        }

        let need = self
            .needs
            .create(NewNeed {
                camp_id,
                item_name: draft.item_name,
                quantity_needed: draft.quantity_needed,
                urgency: draft.urgency,
            })
            .await?;
        info!(need_id = %need.id, %camp_id, urgency = %need.urgency, "Need posted");
        Ok(need)
    }

    pub async fn get(&self, need_id: Uuid) -> Result<Need> {
        require_found(self.needs.get(need_id).await?, "need", need_id)
    }

    /// Needs of a camp, most urgent first.
    pub async fn list_by_camp(&self, camp_id: Uuid) -> Result<Vec<Need>> {
        require_found(self.camps.get(camp_id).await?, "camp", camp_id)?;
        Ok(self.needs.list_by_camp(camp_id).await?)
    }
}
