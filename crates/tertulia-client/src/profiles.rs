//! Reads and writes rows of the `user_profiles` table.

use std::sync::Arc;

use tertulia_shared::constants::{CODE_NOT_FOUND, TABLE_USER_PROFILES};
use tertulia_shared::models::{NewUserProfile, ProfilePatch, UserProfile};
use tertulia_shared::{EqFilter, ProviderError, TableClient, UserId};
use tracing::{debug, error};

use crate::error::AuthResult;

#[derive(Clone)]
pub struct ProfileStore {
    tables: Arc<dyn TableClient>,
}

impl ProfileStore {
    pub fn new(tables: Arc<dyn TableClient>) -> Self {
        Self { tables }
    }

    pub async fn fetch_by_id(&self, id: &UserId) -> AuthResult<UserProfile> {
        let rows = self
            .tables
            .select(TABLE_USER_PROFILES, &[EqFilter::new("id", id.as_str())])
            .await
            .inspect_err(|e| error!(user_id = %id, error = %e, "failed to fetch user profile"))?;

        let row = rows.into_iter().next().ok_or_else(|| {
            ProviderError::new(CODE_NOT_FOUND, format!("No profile for user {id}"))
        })?;

        Ok(serde_json::from_value(row)?)
    }

    pub async fn create(&self, profile: &NewUserProfile) -> Result<(), ProviderError> {
        let row = serde_json::to_value(profile)
            .map_err(|e| ProviderError::raw(format!("Failed to encode profile: {e}")))?;

        self.tables
            .insert(TABLE_USER_PROFILES, row)
            .await
            .inspect_err(|e| error!(user_id = %profile.id, error = %e, "failed to create user profile"))?;

        debug!(user_id = %profile.id, "user profile created");
        Ok(())
    }

    pub async fn update(&self, id: &UserId, patch: &ProfilePatch) -> Result<(), ProviderError> {
        self.tables
            .update(
                TABLE_USER_PROFILES,
                &[EqFilter::new("id", id.as_str())],
                patch.to_json(),
            )
            .await
            .inspect_err(|e| error!(user_id = %id, error = %e, "failed to update user profile"))
    }
}
