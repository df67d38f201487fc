pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::profiles::handlers as profiles;
use crate::resume::handlers as resume;
use crate::state::AppState;
use crate::survey::handlers as survey;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Surveys
        .route("/api/v1/surveys", post(survey::handle_create_survey))
        .route("/api/v1/surveys/:id", put(survey::handle_update_survey))
        .route(
            "/api/v1/surveys/by-name/:name",
            get(survey::handle_get_survey_by_name),
        )
        .route(
            "/api/v1/surveys/pending",
            get(survey::handle_get_pending_survey),
        )
        .route(
            "/api/v1/surveys/by-name/:name/responses",
            get(survey::handle_list_responses),
        )
        // Survey sessions
        .route(
            "/api/v1/survey-sessions",
            post(survey::handle_start_session),
        )
        .route(
            "/api/v1/survey-sessions/:id",
            get(survey::handle_get_session).delete(survey::handle_close_session),
        )
        .route(
            "/api/v1/survey-sessions/:id/advance",
            post(survey::handle_advance_session),
        )
        .route(
            "/api/v1/survey-sessions/:id/finalize",
            post(survey::handle_finalize_session),
        )
        // Resume templates and saved resumes
        .route(
            "/api/v1/resume-templates",
            get(resume::handle_list_templates).post(resume::handle_create_template),
        )
        .route(
            "/api/v1/resume-templates/:id",
            put(resume::handle_update_template),
        )
        .route(
            "/api/v1/resume-profiles",
            get(resume::handle_list_resume_profiles).post(resume::handle_create_resume_profile),
        )
        .route(
            "/api/v1/resume-profiles/:id",
            put(resume::handle_update_resume_profile),
        )
        // Resume builder
        .route(
            "/api/v1/resume-builder/hydrate",
            post(resume::handle_hydrate),
        )
        .route(
            "/api/v1/resume-builder/reorder",
            post(resume::handle_reorder),
        )
        .route(
            "/api/v1/resume-builder/sections/custom",
            post(resume::handle_add_custom_section),
        )
        .route(
            "/api/v1/resume-builder/sections/common",
            post(resume::handle_add_common_section),
        )
        .route(
            "/api/v1/resume-builder/sections/remove",
            post(resume::handle_remove_section),
        )
        .route(
            "/api/v1/resume-builder/render-plan",
            post(resume::handle_render_plan),
        )
        // Profiles
        .route("/api/v1/users/:id/profile", get(profiles::handle_get_profile))
        .with_state(state)
}
