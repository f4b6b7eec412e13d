//! Actor context.
//!
//! Credentials are checked upstream by the identity provider. The service
//! only learns who is calling: an id forwarded by the identity proxy, whose
//! role is looked up in the profile store. Every service call receives the
//! resolved [`Actor`] explicitly.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::Role;
use crate::services::ServiceError;
use crate::storage::ProfileStore;

/// Header the identity proxy sets to the authenticated subject id.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// The caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}

/// Maps a forwarded credential to an actor.
#[async_trait]
pub trait ActorResolver: Send + Sync {
    /// `Ok(None)` when the credential does not name a known actor.
    async fn resolve(&self, credential: &str) -> Result<Option<Actor>, ServiceError>;
}

/// Resolves the actor id against stored profiles.
pub struct ProfileActorResolver {
    profiles: Arc<dyn ProfileStore>,
}

impl ProfileActorResolver {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }
}

#[async_trait]
impl ActorResolver for ProfileActorResolver {
    async fn resolve(&self, credential: &str) -> Result<Option<Actor>, ServiceError> {
        let Ok(id) = Uuid::parse_str(credential.trim()) else {
            return Ok(None);
        };
        let profile = self.profiles.get(id).await?;
        Ok(profile.map(|p| Actor::new(p.id, p.role)))
    }
}
