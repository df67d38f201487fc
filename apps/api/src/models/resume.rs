use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::resume::models::ResumeBuilderData;

/// A designer-authored resume template. `content` is JSON text that may
/// contain `{{placeholder}}` tokens.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub content: String,
    pub preview_image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResumeTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub content: String,
    pub preview_image: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// A user's saved resume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub template_id: Option<Uuid>,
    pub data: ResumeBuilderData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResumeProfile {
    pub user_id: Uuid,
    pub name: String,
    pub template_id: Option<Uuid>,
    pub data: ResumeBuilderData,
}

#[derive(Debug, Clone, FromRow)]
pub struct ResumeProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub template_id: Option<Uuid>,
    pub data: Json<ResumeBuilderData>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ResumeProfileRow> for ResumeProfile {
    fn from(row: ResumeProfileRow) -> Self {
        ResumeProfile {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            template_id: row.template_id,
            data: row.data.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
