//! Ties the interpreter to its stores.
//!
//! Sessions live in memory until their survey completes; completion writes
//! exactly one `SurveyResponse` and, for the reserved profile survey, pushes
//! the mapped answers onto the user's profile. A failed write leaves the
//! session intact so the client can retry through `finalize`; a successful
//! one releases it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::profiles::store::ProfileStore;
use crate::survey::definition::validate_steps;
use crate::survey::interpreter::{Message, Progress, StepInput, StepPrompt, SurveySession};
use crate::survey::models::{NewSurvey, NewSurveyResponse, SurveyDefinition, SurveyResponse};
use crate::survey::profile_sync::profile_update_from_answers;
use crate::survey::sessions::{SessionEntry, SessionRegistry, SharedSession};
use crate::survey::store::SurveyStore;

// ────────────────────────────────────────────────────────────────────────────
// Request / view types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub user_id: Uuid,
    pub user_name: String,
    /// Explicit survey; when absent the user's pending survey is used.
    pub survey_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRequest {
    pub user_id: Uuid,
    pub input: StepInput,
}

/// Everything the chat widget needs to redraw itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub survey_name: String,
    pub progress: Progress,
    pub prompt: Option<StepPrompt>,
    pub transcript: Vec<Message>,
    /// Answers recorded so far, keyed by variable name.
    pub answers: BTreeMap<String, String>,
    pub response_id: Option<Uuid>,
    pub profile_synced: bool,
    /// Present when the completed survey could not be stored yet.
    pub persist_error: Option<String>,
}

impl SessionView {
    fn build(session_id: Uuid, entry: &SessionEntry, persist_error: Option<String>) -> Self {
        SessionView {
            session_id,
            survey_name: entry.session.survey().name.clone(),
            progress: entry.session.progress().clone(),
            prompt: entry.session.prompt(),
            transcript: entry.session.transcript().to_vec(),
            answers: entry.session.data().clone(),
            response_id: entry.response.as_ref().map(|r| r.id),
            profile_synced: entry.profile_synced,
            persist_error,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Service
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct SurveyService {
    surveys: Arc<dyn SurveyStore>,
    profiles: Arc<dyn ProfileStore>,
    sessions: SessionRegistry,
    profile_survey_name: String,
}

impl SurveyService {
    pub fn new(
        surveys: Arc<dyn SurveyStore>,
        profiles: Arc<dyn ProfileStore>,
        profile_survey_name: impl Into<String>,
    ) -> Self {
        Self {
            surveys,
            profiles,
            sessions: SessionRegistry::new(),
            profile_survey_name: profile_survey_name.into(),
        }
    }

    pub async fn create_survey(&self, survey: NewSurvey) -> Result<SurveyDefinition, AppError> {
        validate_new_survey(&survey)?;
        let created = self.surveys.create_survey(survey).await?;
        info!(survey = %created.name, steps = created.steps.len(), "Survey created");
        Ok(created)
    }

    pub async fn update_survey(
        &self,
        id: Uuid,
        survey: NewSurvey,
    ) -> Result<SurveyDefinition, AppError> {
        validate_new_survey(&survey)?;
        let updated = self
            .surveys
            .update_survey(id, survey)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Survey {id} not found")))?;
        info!(survey = %updated.name, "Survey updated");
        Ok(updated)
    }

    pub async fn get_survey_by_name(&self, name: &str) -> Result<SurveyDefinition, AppError> {
        self.surveys
            .get_survey_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Survey '{name}' not found")))
    }

    pub async fn get_survey_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<SurveyDefinition>, AppError> {
        self.surveys.get_survey_for_user(user_id).await
    }

    pub async fn get_survey_responses(
        &self,
        survey_name: &str,
    ) -> Result<Vec<SurveyResponse>, AppError> {
        self.surveys.get_survey_responses(survey_name).await
    }

    /// Starts a session. Leading bot messages are already played in the
    /// returned view; a survey made only of bot messages completes here.
    pub async fn start_session(&self, request: StartSessionRequest) -> Result<SessionView, AppError> {
        let survey = match &request.survey_name {
            Some(name) => self.get_survey_by_name(name).await?,
            None => self
                .surveys
                .get_survey_for_user(request.user_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("No pending survey for user {}", request.user_id))
                })?,
        };
        if !survey.is_active {
            return Err(AppError::Validation(format!(
                "Survey '{}' is not active",
                survey.name
            )));
        }

        let session = SurveySession::start(survey)?;
        let entry = SessionEntry::new(request.user_id, request.user_name, session);
        let (session_id, shared) = self.sessions.insert(entry).await;
        let active_sessions = self.sessions.len().await;
        info!(
            %session_id,
            user_id = %request.user_id,
            active_sessions,
            "Survey session started"
        );

        let mut entry = shared.lock().await;
        let persist_error = self.settle(session_id, &mut entry).await;
        Ok(SessionView::build(session_id, &entry, persist_error))
    }

    pub async fn advance(
        &self,
        session_id: Uuid,
        request: AdvanceRequest,
    ) -> Result<SessionView, AppError> {
        let shared = self.owned_session(session_id, request.user_id).await?;
        let mut entry = shared.lock().await;

        let progress = entry.session.advance(request.input)?;
        debug!(%session_id, ?progress, "Survey session advanced");

        let persist_error = self.settle(session_id, &mut entry).await;
        Ok(SessionView::build(session_id, &entry, persist_error))
    }

    /// Retries persistence of a completed session.
    pub async fn finalize(&self, session_id: Uuid, user_id: Uuid) -> Result<SessionView, AppError> {
        let shared = self.owned_session(session_id, user_id).await?;
        let mut entry = shared.lock().await;
        if !entry.session.is_finished() {
            return Err(AppError::Validation(
                "Survey session has not reached its last step".to_string(),
            ));
        }
        let persist_error = self.settle(session_id, &mut entry).await;
        Ok(SessionView::build(session_id, &entry, persist_error))
    }

    pub async fn get_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<SessionView, AppError> {
        let shared = self.owned_session(session_id, user_id).await?;
        let entry = shared.lock().await;
        Ok(SessionView::build(session_id, &entry, None))
    }

    /// Closes the widget: the session and any unsaved answers are dropped.
    pub async fn close_session(&self, session_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.owned_session(session_id, user_id).await?;
        self.sessions.remove(session_id).await;
        info!(%session_id, "Survey session closed");
        Ok(())
    }

    async fn owned_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<SharedSession, AppError> {
        let not_found = || AppError::NotFound(format!("Survey session {session_id} not found"));
        let shared = self.sessions.get(session_id).await.ok_or_else(not_found)?;
        {
            let mut entry = shared.lock().await;
            if entry.user_id != user_id {
                return Err(not_found());
            }
            entry.touch();
        }
        Ok(shared)
    }

    /// Persists a completed session and drops it from the registry once
    /// nothing is left to retry.
    async fn settle(&self, session_id: Uuid, entry: &mut SessionEntry) -> Option<String> {
        let persist_error = self.persist_if_completed(entry).await;
        if persist_error.is_none() && entry.session.is_finished() {
            self.sessions.remove(session_id).await;
            debug!(%session_id, "Completed survey session released");
        }
        persist_error
    }

    /// Stores the response (once) and syncs the profile (once). Returns the
    /// failure message instead of an error so the caller can still show the
    /// completed transcript.
    async fn persist_if_completed(&self, entry: &mut SessionEntry) -> Option<String> {
        let completed = entry.session.completion()?.clone();

        if entry.response.is_none() {
            let new_response = NewSurveyResponse {
                user_id: entry.user_id,
                user_name: entry.user_name.clone(),
                survey_name: completed.survey_name.clone(),
                data: completed.data.clone(),
            };
            match self.surveys.create_survey_response(new_response).await {
                Ok(response) => {
                    info!(
                        survey = %completed.survey_name,
                        response_id = %response.id,
                        answers = response.data.len(),
                        "Survey response stored"
                    );
                    entry.response = Some(response);
                }
                Err(e) => {
                    error!(survey = %completed.survey_name, "Failed to store survey response: {e}");
                    return Some(format!("Your answers could not be saved: {e}"));
                }
            }
        }

        if completed.survey_name != self.profile_survey_name || entry.profile_synced {
            return None;
        }

        let update = profile_update_from_answers(&completed.data);
        if update.is_empty() {
            entry.profile_synced = true;
            return None;
        }
        match self.profiles.update_user_profile(entry.user_id, &update).await {
            Ok(Some(_)) => {
                info!(user_id = %entry.user_id, "Profile updated from survey answers");
                entry.profile_synced = true;
                None
            }
            Ok(None) => {
                warn!(user_id = %entry.user_id, "No profile to update from survey answers");
                entry.profile_synced = true;
                None
            }
            Err(e) => {
                error!(user_id = %entry.user_id, "Profile update from survey failed: {e}");
                Some(format!("Your profile could not be updated: {e}"))
            }
        }
    }
}

fn validate_new_survey(survey: &NewSurvey) -> Result<(), AppError> {
    if survey.name.trim().is_empty() {
        return Err(AppError::Validation("Survey name cannot be empty".to_string()));
    }
    validate_steps(&survey.steps)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::models::profile::UserProfile;
    use crate::profiles::store::InMemoryProfileStore;
    use crate::survey::store::InMemorySurveyStore;

    fn greeting() -> NewSurvey {
        NewSurvey {
            name: "greeting".to_string(),
            description: "Says hi".to_string(),
            steps: serde_json::from_value(json!([
                { "id": "hi", "type": "botMessage", "text": "Hi", "nextStepId": "ask" },
                { "id": "ask", "type": "userInput", "text": "Name?", "variableName": "name",
                  "nextStepId": "end" },
                { "id": "end", "type": "botMessage", "text": "Thanks", "isLastStep": true }
            ]))
            .unwrap(),
            is_active: true,
        }
    }

    fn profile_survey() -> NewSurvey {
        NewSurvey {
            name: "profile_completion".to_string(),
            description: String::new(),
            steps: serde_json::from_value(json!([
                { "id": "title", "type": "userInput", "text": "Job title?",
                  "variableName": "jobTitle", "nextStepId": "skills" },
                { "id": "skills", "type": "userInput", "text": "Skills?",
                  "variableName": "skills", "isLastStep": true }
            ]))
            .unwrap(),
            is_active: true,
        }
    }

    fn profile(id: Uuid) -> UserProfile {
        UserProfile {
            id,
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            phone: None,
            location: None,
            bio: None,
            job_title: None,
            company: None,
            skills: vec![],
            linkedin: None,
            website: None,
            updated_at: Utc::now(),
        }
    }

    fn service(surveys: Arc<dyn SurveyStore>, profiles: Arc<dyn ProfileStore>) -> SurveyService {
        SurveyService::new(surveys, profiles, "profile_completion")
    }

    fn text(value: &str) -> StepInput {
        StepInput::Text(value.to_string())
    }

    #[tokio::test]
    async fn test_full_flow_stores_exactly_one_response() {
        let surveys = Arc::new(InMemorySurveyStore::new());
        let svc = service(surveys.clone(), Arc::new(InMemoryProfileStore::new()));
        svc.create_survey(greeting()).await.unwrap();
        let user_id = Uuid::new_v4();

        let view = svc
            .start_session(StartSessionRequest {
                user_id,
                user_name: "Alice".to_string(),
                survey_name: Some("greeting".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(view.transcript[0].text, "Hi");
        assert_eq!(view.prompt.as_ref().unwrap().step_id, "ask");

        let done = svc
            .advance(
                view.session_id,
                AdvanceRequest {
                    user_id,
                    input: text("Alice"),
                },
            )
            .await
            .unwrap();
        assert!(matches!(done.progress, Progress::Completed(_)));
        assert!(done.response_id.is_some());
        assert!(done.persist_error.is_none());

        // The session is gone once stored, so nothing can write twice.
        assert_eq!(svc.sessions.len().await, 0);
        assert!(matches!(
            svc.finalize(view.session_id, user_id).await,
            Err(AppError::NotFound(_))
        ));
        let stored = surveys.get_survey_responses("greeting").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].data.get("name").map(String::as_str), Some("Alice"));
        assert_eq!(stored[0].user_name, "Alice");
    }

    #[tokio::test]
    async fn test_invalid_survey_rejected_on_create() {
        let svc = service(
            Arc::new(InMemorySurveyStore::new()),
            Arc::new(InMemoryProfileStore::new()),
        );
        let mut broken = greeting();
        broken.steps[1].next_step_id = None;
        let err = svc.create_survey(broken).await.unwrap_err();
        assert!(matches!(err, AppError::SurveyDefinition(_)));
    }

    #[tokio::test]
    async fn test_pending_survey_used_when_no_name_given() {
        let svc = service(
            Arc::new(InMemorySurveyStore::new()),
            Arc::new(InMemoryProfileStore::new()),
        );
        let user_id = Uuid::new_v4();
        let missing = svc
            .start_session(StartSessionRequest {
                user_id,
                user_name: "Bob".to_string(),
                survey_name: None,
            })
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        svc.create_survey(greeting()).await.unwrap();
        let view = svc
            .start_session(StartSessionRequest {
                user_id,
                user_name: "Bob".to_string(),
                survey_name: None,
            })
            .await
            .unwrap();
        assert_eq!(view.survey_name, "greeting");
    }

    #[tokio::test]
    async fn test_profile_survey_updates_profile() {
        let profiles = Arc::new(InMemoryProfileStore::new());
        let user_id = Uuid::new_v4();
        profiles.insert(profile(user_id)).await;
        let svc = service(Arc::new(InMemorySurveyStore::new()), profiles.clone());
        svc.create_survey(profile_survey()).await.unwrap();

        let view = svc
            .start_session(StartSessionRequest {
                user_id,
                user_name: "Bob".to_string(),
                survey_name: Some("profile_completion".to_string()),
            })
            .await
            .unwrap();
        let advance = |input| AdvanceRequest { user_id, input };
        svc.advance(view.session_id, advance(text("Data Engineer")))
            .await
            .unwrap();
        let done = svc
            .advance(view.session_id, advance(text("sql, python")))
            .await
            .unwrap();
        assert!(done.profile_synced);
        assert_eq!(svc.sessions.len().await, 0);

        let updated = profiles.get_user_profile(user_id).await.unwrap().unwrap();
        assert_eq!(updated.job_title.as_deref(), Some("Data Engineer"));
        assert_eq!(updated.skills, vec!["sql", "python"]);
    }

    #[tokio::test]
    async fn test_other_user_cannot_touch_session() {
        let svc = service(
            Arc::new(InMemorySurveyStore::new()),
            Arc::new(InMemoryProfileStore::new()),
        );
        svc.create_survey(greeting()).await.unwrap();
        let view = svc
            .start_session(StartSessionRequest {
                user_id: Uuid::new_v4(),
                user_name: "Alice".to_string(),
                survey_name: Some("greeting".to_string()),
            })
            .await
            .unwrap();

        let err = svc
            .advance(
                view.session_id,
                AdvanceRequest {
                    user_id: Uuid::new_v4(),
                    input: text("Mallory"),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_close_discards_session() {
        let svc = service(
            Arc::new(InMemorySurveyStore::new()),
            Arc::new(InMemoryProfileStore::new()),
        );
        svc.create_survey(greeting()).await.unwrap();
        let user_id = Uuid::new_v4();
        let view = svc
            .start_session(StartSessionRequest {
                user_id,
                user_name: "Alice".to_string(),
                survey_name: Some("greeting".to_string()),
            })
            .await
            .unwrap();

        svc.close_session(view.session_id, user_id).await.unwrap();
        assert_eq!(svc.sessions.len().await, 0);
        assert!(matches!(
            svc.get_session(view.session_id, user_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    /// Store whose response writes fail until `healthy` is flipped.
    struct FlakyStore {
        inner: InMemorySurveyStore,
        healthy: tokio::sync::RwLock<bool>,
    }

    #[async_trait]
    impl SurveyStore for FlakyStore {
        async fn create_survey(&self, s: NewSurvey) -> Result<SurveyDefinition, AppError> {
            self.inner.create_survey(s).await
        }
        async fn update_survey(
            &self,
            id: Uuid,
            s: NewSurvey,
        ) -> Result<Option<SurveyDefinition>, AppError> {
            self.inner.update_survey(id, s).await
        }
        async fn get_survey_by_name(
            &self,
            name: &str,
        ) -> Result<Option<SurveyDefinition>, AppError> {
            self.inner.get_survey_by_name(name).await
        }
        async fn get_survey_for_user(
            &self,
            user_id: Uuid,
        ) -> Result<Option<SurveyDefinition>, AppError> {
            self.inner.get_survey_for_user(user_id).await
        }
        async fn create_survey_response(
            &self,
            r: NewSurveyResponse,
        ) -> Result<SurveyResponse, AppError> {
            if *self.healthy.read().await {
                self.inner.create_survey_response(r).await
            } else {
                Err(AppError::Internal(anyhow::anyhow!("connection reset")))
            }
        }
        async fn get_survey_responses(
            &self,
            name: &str,
        ) -> Result<Vec<SurveyResponse>, AppError> {
            self.inner.get_survey_responses(name).await
        }
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_session_for_retry() {
        let store = Arc::new(FlakyStore {
            inner: InMemorySurveyStore::new(),
            healthy: tokio::sync::RwLock::new(false),
        });
        let svc = service(store.clone(), Arc::new(InMemoryProfileStore::new()));
        svc.create_survey(greeting()).await.unwrap();
        let user_id = Uuid::new_v4();
        let view = svc
            .start_session(StartSessionRequest {
                user_id,
                user_name: "Alice".to_string(),
                survey_name: Some("greeting".to_string()),
            })
            .await
            .unwrap();

        let failed = svc
            .advance(
                view.session_id,
                AdvanceRequest {
                    user_id,
                    input: text("Alice"),
                },
            )
            .await
            .unwrap();
        assert!(failed.persist_error.is_some());
        assert!(failed.response_id.is_none());
        assert_eq!(svc.sessions.len().await, 1);

        *store.healthy.write().await = true;
        let retried = svc.finalize(view.session_id, user_id).await.unwrap();
        assert!(retried.persist_error.is_none());
        assert!(retried.response_id.is_some());
        assert_eq!(svc.sessions.len().await, 0);
        assert_eq!(store.get_survey_responses("greeting").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_before_last_step_rejected() {
        let svc = service(
            Arc::new(InMemorySurveyStore::new()),
            Arc::new(InMemoryProfileStore::new()),
        );
        svc.create_survey(greeting()).await.unwrap();
        let user_id = Uuid::new_v4();
        let view = svc
            .start_session(StartSessionRequest {
                user_id,
                user_name: "Alice".to_string(),
                survey_name: Some("greeting".to_string()),
            })
            .await
            .unwrap();
        assert!(matches!(
            svc.finalize(view.session_id, user_id).await,
            Err(AppError::Validation(_))
        ));
    }
}
