use std::sync::Arc;

use crate::config::Config;
use crate::profiles::store::ProfileStore;
use crate::resume::service::ResumeService;
use crate::resume::store::ResumeStore;
use crate::survey::service::SurveyService;
use crate::survey::store::{InMemorySurveyStore, SurveyStore};
use crate::{profiles::store::InMemoryProfileStore, resume::store::InMemoryResumeStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub surveys: SurveyService,
    pub resumes: ResumeService,
    pub profiles: Arc<dyn ProfileStore>,
}

impl AppState {
    pub fn new(
        config: &Config,
        surveys: Arc<dyn SurveyStore>,
        resumes: Arc<dyn ResumeStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        let survey_service = SurveyService::new(
            surveys,
            profiles.clone(),
            config.profile_survey_name.clone(),
        );
        let resume_service = ResumeService::new(resumes, profiles.clone());
        Self {
            surveys: survey_service,
            resumes: resume_service,
            profiles,
        }
    }

    /// State backed entirely by in-memory stores.
    pub fn in_memory(config: &Config, profiles: Arc<InMemoryProfileStore>) -> Self {
        Self::new(
            config,
            Arc::new(InMemorySurveyStore::new()),
            Arc::new(InMemoryResumeStore::new()),
            profiles,
        )
    }
}
