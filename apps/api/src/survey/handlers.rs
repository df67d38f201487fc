//! Axum route handlers for surveys and survey sessions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::survey::models::{NewSurvey, SurveyDefinition, SurveyResponse};
use crate::survey::service::{AdvanceRequest, SessionView, StartSessionRequest};

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// POST /api/v1/surveys
pub async fn handle_create_survey(
    State(state): State<AppState>,
    Json(request): Json<NewSurvey>,
) -> Result<(StatusCode, Json<SurveyDefinition>), AppError> {
    let survey = state.surveys.create_survey(request).await?;
    Ok((StatusCode::CREATED, Json(survey)))
}

/// PUT /api/v1/surveys/:id
pub async fn handle_update_survey(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<NewSurvey>,
) -> Result<Json<SurveyDefinition>, AppError> {
    Ok(Json(state.surveys.update_survey(id, request).await?))
}

/// GET /api/v1/surveys/by-name/:name
pub async fn handle_get_survey_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SurveyDefinition>, AppError> {
    Ok(Json(state.surveys.get_survey_by_name(&name).await?))
}

/// GET /api/v1/surveys/pending?user_id=
///
/// `null` when the user has answered every active survey.
pub async fn handle_get_pending_survey(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Option<SurveyDefinition>>, AppError> {
    Ok(Json(state.surveys.get_survey_for_user(params.user_id).await?))
}

/// GET /api/v1/surveys/by-name/:name/responses
pub async fn handle_list_responses(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<SurveyResponse>>, AppError> {
    Ok(Json(state.surveys.get_survey_responses(&name).await?))
}

/// POST /api/v1/survey-sessions
pub async fn handle_start_session(
    State(state): State<AppState>,
    Json(request): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    if request.user_name.trim().is_empty() {
        return Err(AppError::Validation("userName cannot be empty".to_string()));
    }
    let view = state.surveys.start_session(request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/survey-sessions/:id?user_id=
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        state.surveys.get_session(session_id, params.user_id).await?,
    ))
}

/// POST /api/v1/survey-sessions/:id/advance
pub async fn handle_advance_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AdvanceRequest>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.surveys.advance(session_id, request).await?))
}

/// POST /api/v1/survey-sessions/:id/finalize?user_id=
pub async fn handle_finalize_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        state.surveys.finalize(session_id, params.user_id).await?,
    ))
}

/// DELETE /api/v1/survey-sessions/:id?user_id=
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    state
        .surveys
        .close_session(session_id, params.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
