use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{ProfileUpdate, UserProfile};

/// User profile collaborator used by resume hydration and survey sync.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_user_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError>;

    /// Applies a partial update. Returns `None` when the user does not exist.
    async fn update_user_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<UserProfile>, AppError>;
}

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_user_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        Ok(
            sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<UserProfile>, AppError> {
        // COALESCE keeps the stored value wherever the update leaves a field unset.
        Ok(sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE user_profiles SET
                phone     = COALESCE($2, phone),
                location  = COALESCE($3, location),
                bio       = COALESCE($4, bio),
                job_title = COALESCE($5, job_title),
                company   = COALESCE($6, company),
                skills    = COALESCE($7, skills),
                linkedin  = COALESCE($8, linkedin),
                website   = COALESCE($9, website),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&update.phone)
        .bind(&update.location)
        .bind(&update.bio)
        .bind(&update.job_title)
        .bind(&update.company)
        .bind(&update.skills)
        .bind(&update.linkedin)
        .bind(&update.website)
        .fetch_optional(&self.pool)
        .await?)
    }
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<Uuid, UserProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn insert(&self, profile: UserProfile) {
        self.profiles.write().await.insert(profile.id, profile);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_user_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<UserProfile>, AppError> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles.get_mut(&user_id).map(|profile| {
            update.apply_to(profile);
            profile.clone()
        }))
    }
}
