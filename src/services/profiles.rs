//! Actor profiles.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{require_found, Result};
use crate::model::{NewProfile, Profile, Role};
use crate::storage::ProfileStore;

/// Profile fields supplied on first sign-in. The id comes from the
/// identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDraft {
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileStore>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    /// Create the profile for an authenticated subject. The role cannot be
    /// changed afterwards.
    pub async fn create(&self, id: Uuid, draft: ProfileDraft) -> Result<Profile> {
        let profile = self
            .profiles
            .create(NewProfile {
                id,
                full_name: draft.full_name,
                phone: draft.phone,
                role: draft.role,
            })
            .await?;
        info!(profile_id = %profile.id, role = %profile.role, "Profile created");
        Ok(profile)
    }

    pub async fn get(&self, id: Uuid) -> Result<Profile> {
        require_found(self.profiles.get(id).await?, "profile", id)
    }
}
