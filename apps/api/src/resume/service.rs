//! Templates, saved resumes and hydration.
//!
//! Builder edits (reorder, add/remove section, render plan) are stateless and
//! run straight off the document the client sends; only loading and saving
//! go through here.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{NewResumeProfile, NewResumeTemplate, ResumeProfile, ResumeTemplate};
use crate::profiles::store::ProfileStore;
use crate::resume::hydrate::{hydrate_from_template, validate_template_content, Hydration};
use crate::resume::models::ResumeBuilderData;
use crate::resume::sections::{ensure_section_order, normalize_section_order};
use crate::resume::store::ResumeStore;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrateRequest {
    pub user_id: Uuid,
    pub template_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResumeProfileRequest {
    pub name: String,
    pub data: ResumeBuilderData,
}

#[derive(Clone)]
pub struct ResumeService {
    resumes: Arc<dyn ResumeStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl ResumeService {
    pub fn new(resumes: Arc<dyn ResumeStore>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { resumes, profiles }
    }

    pub async fn get_resume_templates(&self) -> Result<Vec<ResumeTemplate>, AppError> {
        self.resumes.get_resume_templates().await
    }

    pub async fn create_resume_template(
        &self,
        template: NewResumeTemplate,
    ) -> Result<ResumeTemplate, AppError> {
        validate_new_template(&template)?;
        let created = self.resumes.create_resume_template(template).await?;
        info!(template_id = %created.id, category = %created.category, "Resume template created");
        Ok(created)
    }

    pub async fn update_resume_template(
        &self,
        id: Uuid,
        template: NewResumeTemplate,
    ) -> Result<ResumeTemplate, AppError> {
        validate_new_template(&template)?;
        self.resumes
            .update_resume_template(id, template)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resume template {id} not found")))
    }

    /// Saved resumes for a user. Documents stored before ordering existed
    /// come back with the default order.
    pub async fn get_resume_profiles(&self, user_id: Uuid) -> Result<Vec<ResumeProfile>, AppError> {
        let mut profiles = self.resumes.get_resume_profiles(user_id).await?;
        for profile in &mut profiles {
            ensure_section_order(&mut profile.data);
        }
        Ok(profiles)
    }

    pub async fn create_resume_profile(
        &self,
        mut profile: NewResumeProfile,
    ) -> Result<ResumeProfile, AppError> {
        validate_profile_name(&profile.name)?;
        normalize_section_order(&mut profile.data);
        let created = self.resumes.create_resume_profile(profile).await?;
        info!(resume_id = %created.id, user_id = %created.user_id, "Resume saved");
        Ok(created)
    }

    pub async fn update_resume_profile(
        &self,
        id: Uuid,
        request: UpdateResumeProfileRequest,
    ) -> Result<ResumeProfile, AppError> {
        validate_profile_name(&request.name)?;
        let mut data = request.data;
        normalize_section_order(&mut data);
        self.resumes
            .update_resume_profile(id, request.name.trim(), &data)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
    }

    /// Builds an editable document from a template and the user's profile.
    /// A broken template is not an error here: the caller gets the profile
    /// data with `template_error` set.
    pub async fn hydrate(&self, request: HydrateRequest) -> Result<Hydration, AppError> {
        let profile = self
            .profiles
            .get_user_profile(request.user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Profile for user {} not found", request.user_id))
            })?;
        let template = self
            .resumes
            .get_resume_template(request.template_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Resume template {} not found", request.template_id))
            })?;

        let mut hydration = hydrate_from_template(&template.content, &profile);
        hydration.data.template_id = Some(template.id.to_string());
        Ok(hydration)
    }
}

fn validate_new_template(template: &NewResumeTemplate) -> Result<(), AppError> {
    if template.name.trim().is_empty() {
        return Err(AppError::Validation("Template name cannot be empty".to_string()));
    }
    if template.category.trim().is_empty() {
        return Err(AppError::Validation("Template category cannot be empty".to_string()));
    }
    validate_template_content(&template.content)?;
    Ok(())
}

fn validate_profile_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Resume name cannot be empty".to_string()));
    }
    Ok(())
}
