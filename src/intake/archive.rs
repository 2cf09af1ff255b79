//! Read-only archive of finished profiles (latest per user).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::channels::UserId;

use super::model::FinishedProfile;

pub struct ProfileArchive {
    profiles: RwLock<HashMap<UserId, FinishedProfile>>,
}

impl ProfileArchive {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            profiles: RwLock::new(HashMap::new()),
        })
    }

    /// Store a finished profile, replacing any earlier one for the user.
    pub async fn insert(&self, profile: FinishedProfile) {
        self.profiles.write().await.insert(profile.user_id, profile);
    }

    pub async fn get(&self, user_id: UserId) -> Option<FinishedProfile> {
        self.profiles.read().await.get(&user_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }
}
