//! ProfileStore trait definition.

use async_trait::async_trait;
use uuid::Uuid;

use super::Result;
use crate::model::{NewProfile, Profile};

/// Actor profiles. No update operation exists; the role is fixed at creation.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fails with `Duplicate` if the id already has a profile.
    async fn create(&self, profile: NewProfile) -> Result<Profile>;

    async fn get(&self, profile_id: Uuid) -> Result<Option<Profile>>;
}
