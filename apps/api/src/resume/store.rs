//! Resume template and saved-resume persistence.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{
    NewResumeProfile, NewResumeTemplate, ResumeProfile, ResumeProfileRow, ResumeTemplate,
};
use crate::resume::models::ResumeBuilderData;

#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Active templates, newest first.
    async fn get_resume_templates(&self) -> Result<Vec<ResumeTemplate>, AppError>;

    async fn get_resume_template(&self, id: Uuid) -> Result<Option<ResumeTemplate>, AppError>;

    async fn create_resume_template(
        &self,
        template: NewResumeTemplate,
    ) -> Result<ResumeTemplate, AppError>;

    async fn update_resume_template(
        &self,
        id: Uuid,
        template: NewResumeTemplate,
    ) -> Result<Option<ResumeTemplate>, AppError>;

    async fn get_resume_profiles(&self, user_id: Uuid) -> Result<Vec<ResumeProfile>, AppError>;

    async fn create_resume_profile(
        &self,
        profile: NewResumeProfile,
    ) -> Result<ResumeProfile, AppError>;

    async fn update_resume_profile(
        &self,
        id: Uuid,
        name: &str,
        data: &ResumeBuilderData,
    ) -> Result<Option<ResumeProfile>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn get_resume_templates(&self) -> Result<Vec<ResumeTemplate>, AppError> {
        Ok(sqlx::query_as::<_, ResumeTemplate>(
            "SELECT * FROM resume_templates WHERE is_active ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_resume_template(&self, id: Uuid) -> Result<Option<ResumeTemplate>, AppError> {
        Ok(
            sqlx::query_as::<_, ResumeTemplate>("SELECT * FROM resume_templates WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_resume_template(
        &self,
        template: NewResumeTemplate,
    ) -> Result<ResumeTemplate, AppError> {
        Ok(sqlx::query_as::<_, ResumeTemplate>(
            r#"
            INSERT INTO resume_templates
                (id, name, description, category, content, preview_image, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&template.name)
        .bind(&template.description)
        .bind(&template.category)
        .bind(&template.content)
        .bind(&template.preview_image)
        .bind(template.is_active)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_resume_template(
        &self,
        id: Uuid,
        template: NewResumeTemplate,
    ) -> Result<Option<ResumeTemplate>, AppError> {
        Ok(sqlx::query_as::<_, ResumeTemplate>(
            r#"
            UPDATE resume_templates
            SET name = $2, description = $3, category = $4, content = $5,
                preview_image = $6, is_active = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(&template.category)
        .bind(&template.content)
        .bind(&template.preview_image)
        .bind(template.is_active)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn get_resume_profiles(&self, user_id: Uuid) -> Result<Vec<ResumeProfile>, AppError> {
        let rows = sqlx::query_as::<_, ResumeProfileRow>(
            "SELECT * FROM resume_profiles WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_resume_profile(
        &self,
        profile: NewResumeProfile,
    ) -> Result<ResumeProfile, AppError> {
        let row = sqlx::query_as::<_, ResumeProfileRow>(
            r#"
            INSERT INTO resume_profiles (id, user_id, name, template_id, data)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(profile.user_id)
        .bind(&profile.name)
        .bind(profile.template_id)
        .bind(Json(&profile.data))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_resume_profile(
        &self,
        id: Uuid,
        name: &str,
        data: &ResumeBuilderData,
    ) -> Result<Option<ResumeProfile>, AppError> {
        let row = sqlx::query_as::<_, ResumeProfileRow>(
            r#"
            UPDATE resume_profiles
            SET name = $2, data = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(Json(data))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ResumeTables {
    templates: Vec<ResumeTemplate>,
    profiles: Vec<ResumeProfile>,
}

#[derive(Default)]
pub struct InMemoryResumeStore {
    tables: RwLock<ResumeTables>,
}

impl InMemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResumeStore for InMemoryResumeStore {
    async fn get_resume_templates(&self) -> Result<Vec<ResumeTemplate>, AppError> {
        let tables = self.tables.read().await;
        let mut templates: Vec<_> = tables
            .templates
            .iter()
            .filter(|t| t.is_active)
            .cloned()
            .collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    async fn get_resume_template(&self, id: Uuid) -> Result<Option<ResumeTemplate>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.templates.iter().find(|t| t.id == id).cloned())
    }

    async fn create_resume_template(
        &self,
        template: NewResumeTemplate,
    ) -> Result<ResumeTemplate, AppError> {
        let now = Utc::now();
        let created = ResumeTemplate {
            id: Uuid::new_v4(),
            name: template.name,
            description: template.description,
            category: template.category,
            content: template.content,
            preview_image: template.preview_image,
            is_active: template.is_active,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.templates.push(created.clone());
        Ok(created)
    }

    async fn update_resume_template(
        &self,
        id: Uuid,
        template: NewResumeTemplate,
    ) -> Result<Option<ResumeTemplate>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .templates
            .iter_mut()
            .find(|t| t.id == id)
            .map(|existing| {
                existing.name = template.name;
                existing.description = template.description;
                existing.category = template.category;
                existing.content = template.content;
                existing.preview_image = template.preview_image;
                existing.is_active = template.is_active;
                existing.updated_at = Utc::now();
                existing.clone()
            }))
    }

    async fn get_resume_profiles(&self, user_id: Uuid) -> Result<Vec<ResumeProfile>, AppError> {
        let tables = self.tables.read().await;
        let mut profiles: Vec<_> = tables
            .profiles
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        profiles.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(profiles)
    }

    async fn create_resume_profile(
        &self,
        profile: NewResumeProfile,
    ) -> Result<ResumeProfile, AppError> {
        let now = Utc::now();
        let created = ResumeProfile {
            id: Uuid::new_v4(),
            user_id: profile.user_id,
            name: profile.name,
            template_id: profile.template_id,
            data: profile.data,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.profiles.push(created.clone());
        Ok(created)
    }

    async fn update_resume_profile(
        &self,
        id: Uuid,
        name: &str,
        data: &ResumeBuilderData,
    ) -> Result<Option<ResumeProfile>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .map(|existing| {
                existing.name = name.to_string();
                existing.data = data.clone();
                existing.updated_at = Utc::now();
                existing.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(name: &str, is_active: bool) -> NewResumeTemplate {
        NewResumeTemplate {
            name: name.to_string(),
            description: String::new(),
            category: "modern".to_string(),
            content: "{}".to_string(),
            preview_image: None,
            is_active,
        }
    }

    #[tokio::test]
    async fn test_inactive_templates_hidden_from_listing() {
        let store = InMemoryResumeStore::new();
        let shown = store.create_resume_template(template("Clean", true)).await.unwrap();
        let hidden = store.create_resume_template(template("Draft", false)).await.unwrap();

        let listed = store.get_resume_templates().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, shown.id);
        // Direct lookup still finds it.
        assert!(store.get_resume_template(hidden.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_template_missing_returns_none() {
        let store = InMemoryResumeStore::new();
        let updated = store
            .update_resume_template(Uuid::new_v4(), template("Clean", true))
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_resume_profiles_scoped_to_user() {
        let store = InMemoryResumeStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let saved = store
            .create_resume_profile(NewResumeProfile {
                user_id: alice,
                name: "Backend".to_string(),
                template_id: None,
                data: ResumeBuilderData::default(),
            })
            .await
            .unwrap();

        assert_eq!(store.get_resume_profiles(alice).await.unwrap().len(), 1);
        assert!(store.get_resume_profiles(bob).await.unwrap().is_empty());

        let mut data = ResumeBuilderData::default();
        data.summary = "Rust developer".to_string();
        let updated = store
            .update_resume_profile(saved.id, "Backend v2", &data)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Backend v2");
        assert_eq!(updated.data.summary, "Rust developer");
        assert_eq!(updated.created_at, saved.created_at);
    }
}
