//! Axum route handlers for templates, saved resumes and the resume builder.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{NewResumeProfile, NewResumeTemplate, ResumeProfile, ResumeTemplate};
use crate::resume::hydrate::Hydration;
use crate::resume::models::{Column, ResumeBuilderData};
use crate::resume::render::{plan_render, RenderPlan};
use crate::resume::sections::{
    add_common_section, add_custom_section, common_section_title, ensure_section_order, reorder,
    remove_section, SectionError,
};
use crate::resume::service::{HydrateRequest, UpdateResumeProfileRequest};
use crate::state::AppState;
use crate::survey::handlers::UserIdQuery;

// ────────────────────────────────────────────────────────────────────────────
// Templates and saved resumes
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/resume-templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResumeTemplate>>, AppError> {
    Ok(Json(state.resumes.get_resume_templates().await?))
}

/// POST /api/v1/resume-templates
pub async fn handle_create_template(
    State(state): State<AppState>,
    Json(request): Json<NewResumeTemplate>,
) -> Result<(StatusCode, Json<ResumeTemplate>), AppError> {
    let template = state.resumes.create_resume_template(request).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// PUT /api/v1/resume-templates/:id
pub async fn handle_update_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<NewResumeTemplate>,
) -> Result<Json<ResumeTemplate>, AppError> {
    Ok(Json(state.resumes.update_resume_template(id, request).await?))
}

/// GET /api/v1/resume-profiles?user_id=
pub async fn handle_list_resume_profiles(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<ResumeProfile>>, AppError> {
    Ok(Json(state.resumes.get_resume_profiles(params.user_id).await?))
}

/// POST /api/v1/resume-profiles
pub async fn handle_create_resume_profile(
    State(state): State<AppState>,
    Json(request): Json<NewResumeProfile>,
) -> Result<(StatusCode, Json<ResumeProfile>), AppError> {
    let saved = state.resumes.create_resume_profile(request).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// PUT /api/v1/resume-profiles/:id
pub async fn handle_update_resume_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateResumeProfileRequest>,
) -> Result<Json<ResumeProfile>, AppError> {
    Ok(Json(state.resumes.update_resume_profile(id, request).await?))
}

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resume-builder/hydrate
pub async fn handle_hydrate(
    State(state): State<AppState>,
    Json(request): Json<HydrateRequest>,
) -> Result<Json<Hydration>, AppError> {
    Ok(Json(state.resumes.hydrate(request).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub data: ResumeBuilderData,
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCustomSectionRequest {
    pub data: ResumeBuilderData,
    pub name: String,
    #[serde(default = "default_column")]
    pub column: Column,
}

fn default_column() -> Column {
    Column::Main
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommonSectionRequest {
    pub data: ResumeBuilderData,
    pub key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveSectionRequest {
    pub data: ResumeBuilderData,
    pub section_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlanRequest {
    pub data: ResumeBuilderData,
    #[serde(default)]
    pub category: String,
}

/// Edited document plus whether the edit changed anything.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionEdit {
    pub data: ResumeBuilderData,
    pub changed: bool,
}

/// POST /api/v1/resume-builder/reorder
pub async fn handle_reorder(
    Json(request): Json<ReorderRequest>,
) -> Result<Json<ResumeBuilderData>, AppError> {
    let mut data = request.data;
    ensure_section_order(&mut data);
    reorder(&mut data.section_order, request.from, request.to)?;
    Ok(Json(data))
}

/// POST /api/v1/resume-builder/sections/custom
pub async fn handle_add_custom_section(
    Json(request): Json<AddCustomSectionRequest>,
) -> Result<Json<SectionEdit>, AppError> {
    let mut data = request.data;
    ensure_section_order(&mut data);
    let changed = add_custom_section(&mut data, &request.name, request.column)?;
    Ok(Json(SectionEdit { data, changed }))
}

/// POST /api/v1/resume-builder/sections/common
pub async fn handle_add_common_section(
    Json(request): Json<AddCommonSectionRequest>,
) -> Result<Json<SectionEdit>, AppError> {
    let title = common_section_title(&request.key)
        .ok_or_else(|| SectionError::UnknownCommonSection(request.key.clone()))?;
    let mut data = request.data;
    ensure_section_order(&mut data);
    let changed = add_common_section(&mut data, &request.key, title)?;
    Ok(Json(SectionEdit { data, changed }))
}

/// POST /api/v1/resume-builder/sections/remove
pub async fn handle_remove_section(
    Json(request): Json<RemoveSectionRequest>,
) -> Result<Json<SectionEdit>, AppError> {
    let mut data = request.data;
    ensure_section_order(&mut data);
    let changed = remove_section(&mut data, &request.section_id)?;
    Ok(Json(SectionEdit { data, changed }))
}

/// POST /api/v1/resume-builder/render-plan
pub async fn handle_render_plan(
    Json(request): Json<RenderPlanRequest>,
) -> Result<Json<RenderPlan>, AppError> {
    let mut data = request.data;
    ensure_section_order(&mut data);
    Ok(Json(plan_render(&data, &request.category)))
}
