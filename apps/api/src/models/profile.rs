use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub skills: Vec<String>,
    pub linkedin: Option<String>,
    pub website: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub skills: Option<Vec<String>>,
    pub linkedin: Option<String>,
    pub website: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ProfileUpdate::default()
    }

    /// Applies the set fields onto `profile`.
    pub fn apply_to(&self, profile: &mut UserProfile) {
        fn set(target: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value {
                *target = Some(v.clone());
            }
        }
        set(&mut profile.phone, &self.phone);
        set(&mut profile.location, &self.location);
        set(&mut profile.bio, &self.bio);
        set(&mut profile.job_title, &self.job_title);
        set(&mut profile.company, &self.company);
        set(&mut profile.linkedin, &self.linkedin);
        set(&mut profile.website, &self.website);
        if let Some(skills) = &self.skills {
            profile.skills = skills.clone();
        }
        profile.updated_at = Utc::now();
    }
}
