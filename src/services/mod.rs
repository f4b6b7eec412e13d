//! Relief coordination services.
//!
//! Each service takes the calling [`Actor`] explicitly, checks role and
//! ownership, and delegates to the stores. Storage failures are mapped into
//! the [`ServiceError`] taxonomy that the HTTP layer reports to the actor.

pub mod camps;
pub mod fulfillment;
pub mod needs;
pub mod profiles;
pub mod volunteers;

use tracing::error;
use uuid::Uuid;

use crate::actor::Actor;
use crate::config::FulfillmentConfig;
use crate::model::Role;
use crate::storage::{StorageError, Stores};

pub use camps::{CampDraft, CampService};
pub use fulfillment::FulfillmentCoordinator;
pub use needs::{NeedDraft, NeedService};
pub use profiles::{ProfileDraft, ProfileService};
pub use volunteers::VolunteerService;

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors reported to the initiating actor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or out-of-range input. Not retried.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Lost a capacity race. The caller should re-read and try again.
    #[error("{0}")]
    OverCommit(String),

    #[error("{0}")]
    InvalidTransition(String),

    /// The actor lacks the role or ownership for the action.
    #[error("{0}")]
    Authorization(String),

    /// Unexpected fault. The detail is logged; the actor sees a generic message.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::OverCommit(_))
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
            StorageError::OverCommit { .. } | StorageError::CapacityExceeded { .. } => {
                ServiceError::OverCommit(err.to_string())
            }
            StorageError::Contention(_) => ServiceError::OverCommit(errmsg::CONTENDED.to_string()),
            StorageError::InvalidTransition { .. } => {
                ServiceError::InvalidTransition(err.to_string())
            }
            StorageError::Invalid(e) => ServiceError::Validation(e.0),
            StorageError::Duplicate(msg) => ServiceError::Validation(msg),
            StorageError::Corrupt(_) | StorageError::InvalidUuid(_) | StorageError::Database(_) => {
                error!(error = %err, "Storage failure");
                ServiceError::Internal(err.to_string())
            }
        }
    }
}

/// Error message constants for service checks.
pub mod errmsg {
    pub const PLEDGE_REQUIRES_NGO: &str = "only NGO actors can pledge assistance";
    pub const CAMP_ROLE_REQUIRED: &str = "only camp administrators can manage camps";
    pub const VOLUNTEER_ROLE_REQUIRED: &str = "only citizens can register as volunteers";
    pub const NOT_CAMP_OWNER: &str = "camp is managed by another administrator";
    pub const NOT_PLEDGE_OWNER: &str = "assistance was pledged by another NGO";
    pub const NOT_REGISTRATION_OWNER: &str = "registration belongs to another user";
    pub const CONTENDED: &str = "the record is busy; re-read it and try again";
    pub const INTERNAL: &str = "internal error";
}

/// Fails with `Authorization` unless the actor has `role`.
pub(crate) fn require_role(actor: &Actor, role: Role, msg: &str) -> Result<()> {
    if actor.role != role {
        return Err(ServiceError::Authorization(msg.to_string()));
    }
    Ok(())
}

/// Unwraps a lookup, failing with `NotFound` for a missing row.
pub(crate) fn require_found<T>(row: Option<T>, entity: &str, id: Uuid) -> Result<T> {
    row.ok_or_else(|| ServiceError::NotFound(format!("{} not found: {}", entity, id)))
}

/// All services over one set of stores.
#[derive(Clone)]
pub struct ReliefServices {
    pub camps: CampService,
    pub needs: NeedService,
    pub volunteers: VolunteerService,
    pub profiles: ProfileService,
    pub fulfillment: FulfillmentCoordinator,
}

impl ReliefServices {
    pub fn new(stores: &Stores, retry: &FulfillmentConfig) -> Self {
        Self {
            camps: CampService::new(stores.camps.clone(), retry.clone()),
            needs: NeedService::new(stores.camps.clone(), stores.needs.clone()),
            volunteers: VolunteerService::new(stores.volunteers.clone(), retry.clone()),
            profiles: ProfileService::new(stores.profiles.clone()),
            fulfillment: FulfillmentCoordinator::new(
                stores.needs.clone(),
                stores.ledger.clone(),
                stores.pledges.clone(),
                retry.clone(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeliveryStatus, ValidationError};

    #[test]
    fn test_only_over_commit_is_retryable() {
        assert!(ServiceError::OverCommit("x".into()).is_retryable());
        assert!(!ServiceError::Validation("x".into()).is_retryable());
        assert!(!ServiceError::NotFound("x".into()).is_retryable());
        assert!(!ServiceError::InvalidTransition("x".into()).is_retryable());
        assert!(!ServiceError::Authorization("x".into()).is_retryable());
        assert!(!ServiceError::Internal("x".into()).is_retryable());
    }

    #[test]
    fn test_storage_error_mapping() {
        let id = Uuid::new_v4();
        assert!(matches!(
            ServiceError::from(StorageError::not_found("need", id)),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            ServiceError::from(StorageError::CapacityExceeded {
                camp_id: id,
                capacity: 50
            }),
            ServiceError::OverCommit(_)
        ));
        assert_eq!(
            ServiceError::from(StorageError::Contention("locked".into())),
            ServiceError::OverCommit(errmsg::CONTENDED.to_string())
        );
        assert!(matches!(
            ServiceError::from(StorageError::InvalidTransition {
                from: DeliveryStatus::Delivered,
                to: DeliveryStatus::Pledged
            }),
            ServiceError::InvalidTransition(_)
        ));
        assert_eq!(
            ServiceError::from(StorageError::Invalid(ValidationError::new("bad"))),
            ServiceError::Validation("bad".to_string())
        );
        assert!(matches!(
            ServiceError::from(StorageError::Duplicate("again".into())),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            ServiceError::from(StorageError::Database("disk".into())),
            ServiceError::Internal(_)
        ));
    }
}
