//! Camp management.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{errmsg, require_found, require_role, Result, ServiceError};
use crate::actor::Actor;
use crate::config::FulfillmentConfig;
use crate::model::{Camp, CampStatus, NewCamp, Role};
use crate::storage::CampStore;
use crate::utils::retry::retry_on_contention;

/// Camp fields supplied by its administrator. The owner is the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CampDraft {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub total_capacity: i64,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
}

#[derive(Clone)]
pub struct CampService {
    camps: Arc<dyn CampStore>,
    retry: FulfillmentConfig,
}

impl CampService {
    pub fn new(camps: Arc<dyn CampStore>, retry: FulfillmentConfig) -> Self {
        Self { camps, retry }
    }

    pub async fn create(&self, actor: &Actor, draft: CampDraft) -> Result<Camp> {
        require_role(actor, Role::Camp, errmsg::CAMP_ROLE_REQUIRED)?;
        let camp = self
            .camps
            .create(NewCamp {
                admin_id: actor.id,
                name: draft.name,
                location: draft.location,
                latitude: draft.latitude,
                longitude: draft.longitude,
                total_capacity: draft.total_capacity,
                contact_phone: draft.contact_phone,
                contact_email: draft.contact_email,
            })
            .await?;
        info!(camp_id = %camp.id, admin_id = %actor.id, capacity = camp.total_capacity, "Camp created");
        Ok(camp)
    }

    pub async fn get(&self, camp_id: Uuid) -> Result<Camp> {
        require_found(self.camps.get(camp_id).await?, "camp", camp_id)
    }

    pub async fn list(&self) -> Result<Vec<Camp>> {
        Ok(self.camps.list().await?)
    }

    /// Camps the actor administers, oldest first.
    pub async fn list_mine(&self, actor: &Actor) -> Result<Vec<Camp>> {
        require_role(actor, Role::Camp, errmsg::CAMP_ROLE_REQUIRED)?;
        Ok(self.camps.list_by_admin(actor.id).await?)
    }

    /// The camp a dashboard opens on: the administrator's oldest camp.
    pub async fn default_camp_for(&self, actor: &Actor) -> Result<Option<Camp>> {
        Ok(self.list_mine(actor).await?.into_iter().next())
    }

    pub async fn update_status(
        &self,
        actor: &Actor,
        camp_id: Uuid,
        status: CampStatus,
    ) -> Result<Camp> {
        self.owned(actor, camp_id).await?;
        let camp = retry_on_contention(&self.retry, "update_camp_status", || {
            self.camps.update_status(camp_id, status)
        })
        .await?;
        info!(%camp_id, status = %camp.status, "Camp status changed");
        Ok(camp)
    }

    /// Delete a camp with its needs and registrations.
    pub async fn delete(&self, actor: &Actor, camp_id: Uuid) -> Result<()> {
        self.owned(actor, camp_id).await?;
        retry_on_contention(&self.retry, "delete_camp", || self.camps.delete(camp_id)).await?;
        info!(%camp_id, "Camp deleted");
        Ok(())
    }

    async fn owned(&self, actor: &Actor, camp_id: Uuid) -> Result<Camp> {
        require_role(actor, Role::Camp, errmsg::CAMP_ROLE_REQUIRED)?;
        let camp = self.get(camp_id).await?;
        if camp.admin_id != actor.id {
            return Err(ServiceError::Authorization(errmsg::NOT_CAMP_OWNER.to_string()));
        }
        Ok(camp)
    }
}
