//! Volunteer registry.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::{errmsg, require_found, require_role, Result, ServiceError};
use crate::actor::Actor;
use crate::config::FulfillmentConfig;
use crate::model::{NewVolunteerRegistration, Role, VolunteerRegistration};
use crate::storage::VolunteerStore;
use crate::utils::retry::retry_on_contention;

/// Registers citizens at camps. Each registration holds one camp seat.
#[derive(Clone)]
pub struct VolunteerService {
    volunteers: Arc<dyn VolunteerStore>,
    retry: FulfillmentConfig,
}

impl VolunteerService {
    pub fn new(volunteers: Arc<dyn VolunteerStore>, retry: FulfillmentConfig) -> Self {
        Self { volunteers, retry }
    }

    /// Register the actor at a camp. A full camp answers `OverCommit`.
    pub async fn register(
        &self,
        actor: &Actor,
        camp_id: Uuid,
        volunteer_type: &str,
    ) -> Result<VolunteerRegistration> {
        require_role(actor, Role::User, errmsg::VOLUNTEER_ROLE_REQUIRED)?;
        let registration = NewVolunteerRegistration {
            user_id: actor.id,
            camp_id,
            volunteer_type: volunteer_type.trim().to_string(),
        };
        let created = retry_on_contention(&self.retry, "register_volunteer", || {
            self.volunteers.register(registration.clone())
        })
        .await?;
        info!(registration_id = %created.id, %camp_id, "Volunteer joined camp");
        Ok(created)
    }

    /// Withdraw one of the actor's registrations and free its seat.
    pub async fn withdraw(&self, actor: &Actor, registration_id: Uuid) -> Result<VolunteerRegistration> {
        let registration = require_found(
            self.volunteers.get(registration_id).await?,
            "volunteer registration",
            registration_id,
        )?;
        if registration.user_id != actor.id {
            return Err(ServiceError::Authorization(
                errmsg::NOT_REGISTRATION_OWNER.to_string(),
            ));
        }
        let removed = retry_on_contention(&self.retry, "withdraw_volunteer", || {
            self.volunteers.withdraw(registration_id)
        })
        .await?;
        info!(%registration_id, camp_id = %removed.camp_id, "Volunteer left camp");
        Ok(removed)
    }

    pub async fn list_by_camp(&self, camp_id: Uuid) -> Result<Vec<VolunteerRegistration>> {
        Ok(self.volunteers.list_by_camp(camp_id).await?)
    }

    pub async fn list_mine(&self, actor: &Actor) -> Result<Vec<VolunteerRegistration>> {
        Ok(self.volunteers.list_by_user(actor.id).await?)
    }
}
