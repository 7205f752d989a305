use tokio::task::JoinHandle;
use uuid::Uuid;

use super::keyed::{CachedKeyedRepository, LoadState};
use crate::domain::errors::StoreResult;
use crate::domain::models::{Profile, ReplaceResult};
use crate::domain::ports::DocumentStore;
use crate::store::Collection;

/// Collection holding player profiles.
pub const PROFILE_COLLECTION: &str = "profiles";

/// Player profiles, cached by UUID.
pub struct ProfileRepository {
    profiles: CachedKeyedRepository<Uuid, Profile>,
}

impl ProfileRepository {
    /// Open the repository and start loading every stored profile.
    pub fn open(store: &dyn DocumentStore) -> Self {
        Self {
            profiles: CachedKeyedRepository::open(Collection::open(store, PROFILE_COLLECTION)),
        }
    }

    pub fn cached(&self, uuid: &Uuid) -> Option<Profile> {
        self.profiles.get_from_cache(uuid)
    }

    pub async fn find(&self, uuid: &Uuid) -> StoreResult<Option<Profile>> {
        self.profiles.get_or_fetch(uuid).await
    }

    /// Existing profile for `uuid`, or a fresh one persisted before returning.
    pub async fn get_or_create(&self, uuid: Uuid) -> StoreResult<Profile> {
        if let Some(profile) = self.profiles.get_or_fetch(&uuid).await? {
            return Ok(profile);
        }
        let profile = Profile::new(uuid);
        self.profiles.save_durable(uuid, profile.clone()).await?;
        Ok(profile)
    }

    /// Cache the profile and persist it in the background.
    pub fn save(&self, profile: Profile) -> JoinHandle<StoreResult<ReplaceResult>> {
        self.profiles.save(profile.uuid, profile)
    }

    pub async fn save_durable(&self, profile: Profile) -> StoreResult<ReplaceResult> {
        self.profiles.save_durable(profile.uuid, profile).await
    }

    /// Flip the PvP flag and persist it, returning the new setting.
    pub async fn toggle_pvp(&self, uuid: Uuid) -> StoreResult<bool> {
        let mut profile = self.get_or_create(uuid).await?;
        let enabled = profile.toggle_pvp();
        self.profiles.save_durable(uuid, profile).await?;
        Ok(enabled)
    }

    /// Cached PvP flag; unknown players have PvP off.
    pub fn pvp_enabled(&self, uuid: &Uuid) -> bool {
        self.cached(uuid).is_some_and(|p| p.pvp_enabled)
    }

    /// Every cached profile, oldest first.
    pub fn all_cached(&self) -> Vec<Profile> {
        let mut profiles = self.profiles.cached_values();
        profiles.sort_by(|a, b| a.first_seen.cmp(&b.first_seen).then(a.uuid.cmp(&b.uuid)));
        profiles
    }

    pub async fn wait_until_loaded(&self) -> LoadState {
        self.profiles.wait_until_loaded().await
    }

    pub fn repository(&self) -> &CachedKeyedRepository<Uuid, Profile> {
        &self.profiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryDocumentStore;

    #[tokio::test]
    async fn test_toggle_pvp_persists() {
        let store = MemoryDocumentStore::new();
        let repo = ProfileRepository::open(&store);
        repo.wait_until_loaded().await;

        let id = Uuid::new_v4();
        assert!(!repo.pvp_enabled(&id));
        assert!(repo.toggle_pvp(id).await.unwrap());
        assert!(repo.pvp_enabled(&id));

        let reopened = ProfileRepository::open(&store);
        reopened.wait_until_loaded().await;
        assert!(reopened.pvp_enabled(&id));
        assert_eq!(reopened.all_cached().len(), 1);
    }
}
