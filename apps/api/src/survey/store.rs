//! Survey persistence.
//!
//! `AppState` holds an `Arc<dyn SurveyStore>`: `PgSurveyStore` in production,
//! `InMemorySurveyStore` in tests and local runs.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::models::survey::{SurveyResponseRow, SurveyRow};
use crate::survey::models::{NewSurvey, NewSurveyResponse, SurveyDefinition, SurveyResponse};

#[async_trait]
pub trait SurveyStore: Send + Sync {
    async fn create_survey(&self, survey: NewSurvey) -> Result<SurveyDefinition, AppError>;

    async fn update_survey(
        &self,
        id: Uuid,
        survey: NewSurvey,
    ) -> Result<Option<SurveyDefinition>, AppError>;

    async fn get_survey_by_name(&self, name: &str) -> Result<Option<SurveyDefinition>, AppError>;

    /// Oldest active survey the user has not answered yet.
    async fn get_survey_for_user(&self, user_id: Uuid)
        -> Result<Option<SurveyDefinition>, AppError>;

    async fn create_survey_response(
        &self,
        response: NewSurveyResponse,
    ) -> Result<SurveyResponse, AppError>;

    async fn get_survey_responses(&self, survey_name: &str)
        -> Result<Vec<SurveyResponse>, AppError>;
}

fn duplicate_name(name: &str) -> AppError {
    AppError::Conflict(format!("A survey named '{name}' already exists"))
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

pub struct PgSurveyStore {
    pool: PgPool,
}

impl PgSurveyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SurveyStore for PgSurveyStore {
    async fn create_survey(&self, survey: NewSurvey) -> Result<SurveyDefinition, AppError> {
        let row = sqlx::query_as::<_, SurveyRow>(
            r#"
            INSERT INTO surveys (id, name, description, steps, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&survey.name)
        .bind(&survey.description)
        .bind(Json(&survey.steps))
        .bind(survey.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_name(&survey.name)
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(row.into())
    }

    async fn update_survey(
        &self,
        id: Uuid,
        survey: NewSurvey,
    ) -> Result<Option<SurveyDefinition>, AppError> {
        let row = sqlx::query_as::<_, SurveyRow>(
            r#"
            UPDATE surveys
            SET name = $2, description = $3, steps = $4, is_active = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&survey.name)
        .bind(&survey.description)
        .bind(Json(&survey.steps))
        .bind(survey.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_name(&survey.name)
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(row.map(Into::into))
    }

    async fn get_survey_by_name(&self, name: &str) -> Result<Option<SurveyDefinition>, AppError> {
        let row = sqlx::query_as::<_, SurveyRow>("SELECT * FROM surveys WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn get_survey_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<SurveyDefinition>, AppError> {
        let row = sqlx::query_as::<_, SurveyRow>(
            r#"
            SELECT s.*
            FROM surveys s
            WHERE s.is_active
              AND NOT EXISTS (
                  SELECT 1 FROM survey_responses r
                  WHERE r.survey_name = s.name AND r.user_id = $1
              )
            ORDER BY s.created_at ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn create_survey_response(
        &self,
        response: NewSurveyResponse,
    ) -> Result<SurveyResponse, AppError> {
        let row = sqlx::query_as::<_, SurveyResponseRow>(
            r#"
            INSERT INTO survey_responses (id, user_id, user_name, survey_name, data)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(response.user_id)
        .bind(&response.user_name)
        .bind(&response.survey_name)
        .bind(Json(&response.data))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_survey_responses(
        &self,
        survey_name: &str,
    ) -> Result<Vec<SurveyResponse>, AppError> {
        let rows = sqlx::query_as::<_, SurveyResponseRow>(
            "SELECT * FROM survey_responses WHERE survey_name = $1 ORDER BY response_date DESC",
        )
        .bind(survey_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct SurveyTables {
    surveys: Vec<SurveyDefinition>,
    responses: Vec<SurveyResponse>,
}

/// Process-local store. State lives only as long as the value.
#[derive(Default)]
pub struct InMemorySurveyStore {
    tables: RwLock<SurveyTables>,
}

impl InMemorySurveyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SurveyStore for InMemorySurveyStore {
    async fn create_survey(&self, survey: NewSurvey) -> Result<SurveyDefinition, AppError> {
        let mut tables = self.tables.write().await;
        if tables.surveys.iter().any(|s| s.name == survey.name) {
            return Err(duplicate_name(&survey.name));
        }
        let created = SurveyDefinition {
            id: Uuid::new_v4(),
            name: survey.name,
            description: survey.description,
            steps: survey.steps,
            is_active: survey.is_active,
            created_at: Utc::now(),
        };
        tables.surveys.push(created.clone());
        Ok(created)
    }

    async fn update_survey(
        &self,
        id: Uuid,
        survey: NewSurvey,
    ) -> Result<Option<SurveyDefinition>, AppError> {
        let mut tables = self.tables.write().await;
        if tables
            .surveys
            .iter()
            .any(|s| s.name == survey.name && s.id != id)
        {
            return Err(duplicate_name(&survey.name));
        }
        let Some(existing) = tables.surveys.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        existing.name = survey.name;
        existing.description = survey.description;
        existing.steps = survey.steps;
        existing.is_active = survey.is_active;
        Ok(Some(existing.clone()))
    }

    async fn get_survey_by_name(&self, name: &str) -> Result<Option<SurveyDefinition>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.surveys.iter().find(|s| s.name == name).cloned())
    }

    async fn get_survey_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<SurveyDefinition>, AppError> {
        let tables = self.tables.read().await;
        let answered = |name: &str| {
            tables
                .responses
                .iter()
                .any(|r| r.user_id == user_id && r.survey_name == name)
        };
        Ok(tables
            .surveys
            .iter()
            .filter(|s| s.is_active && !answered(&s.name))
            .min_by_key(|s| s.created_at)
            .cloned())
    }

    async fn create_survey_response(
        &self,
        response: NewSurveyResponse,
    ) -> Result<SurveyResponse, AppError> {
        let created = SurveyResponse {
            id: Uuid::new_v4(),
            user_id: response.user_id,
            user_name: response.user_name,
            survey_name: response.survey_name,
            data: response.data,
            response_date: Utc::now(),
        };
        self.tables.write().await.responses.push(created.clone());
        Ok(created)
    }

    async fn get_survey_responses(
        &self,
        survey_name: &str,
    ) -> Result<Vec<SurveyResponse>, AppError> {
        let tables = self.tables.read().await;
        let mut responses: Vec<_> = tables
            .responses
            .iter()
            .filter(|r| r.survey_name == survey_name)
            .cloned()
            .collect();
        responses.sort_by(|a, b| b.response_date.cmp(&a.response_date));
        Ok(responses)
    }
}
