use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::survey::models::{Step, SurveyDefinition, SurveyResponse};

#[derive(Debug, Clone, FromRow)]
pub struct SurveyRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub steps: Json<Vec<Step>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<SurveyRow> for SurveyDefinition {
    fn from(row: SurveyRow) -> Self {
        SurveyDefinition {
            id: row.id,
            name: row.name,
            description: row.description,
            steps: row.steps.0,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SurveyResponseRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub survey_name: String,
    pub data: Json<BTreeMap<String, String>>,
    pub response_date: DateTime<Utc>,
}

impl From<SurveyResponseRow> for SurveyResponse {
    fn from(row: SurveyResponseRow) -> Self {
        SurveyResponse {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            survey_name: row.survey_name,
            data: row.data.0,
            response_date: row.response_date,
        }
    }
}
