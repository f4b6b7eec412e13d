//! VolunteerStore trait definition.

use async_trait::async_trait;
use uuid::Uuid;

use super::Result;
use crate::model::{NewVolunteerRegistration, VolunteerRegistration};

/// Interface for volunteer registrations.
///
/// A registration occupies one camp seat. Registering and withdrawing adjust
/// the seat count in the same unit as the registration row.
#[async_trait]
pub trait VolunteerStore: Send + Sync {
    /// Register and reserve a seat. `(user_id, camp_id, volunteer_type)`
    /// already present fails with `Duplicate`; a full camp fails with
    /// `CapacityExceeded` and nothing is written.
    async fn register(&self, registration: NewVolunteerRegistration)
        -> Result<VolunteerRegistration>;

    async fn get(&self, registration_id: Uuid) -> Result<Option<VolunteerRegistration>>;

    /// Remove a registration and release its seat.
    async fn withdraw(&self, registration_id: Uuid) -> Result<VolunteerRegistration>;

    async fn list_by_camp(&self, camp_id: Uuid) -> Result<Vec<VolunteerRegistration>>;

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<VolunteerRegistration>>;
}
