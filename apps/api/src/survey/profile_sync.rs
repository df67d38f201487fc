//! Maps answers of the profile-completion survey onto a profile update.
//!
//! Only this one reserved survey touches the profile; every other survey's
//! data stays inside its response.

use std::collections::BTreeMap;

use crate::models::profile::ProfileUpdate;

/// Builds the update for the known variable names. Unknown keys and blank
/// answers are ignored.
pub fn profile_update_from_answers(data: &BTreeMap<String, String>) -> ProfileUpdate {
    let text = |key: &str| {
        data.get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    ProfileUpdate {
        phone: text("phone"),
        location: text("location"),
        bio: text("bio"),
        job_title: text("jobTitle"),
        company: text("company"),
        skills: text("skills").map(|s| split_skills(&s)).filter(|s| !s.is_empty()),
        linkedin: text("linkedin"),
        website: text("website"),
    }
}

/// Splits a comma-separated skills answer, dropping blanks and repeats.
pub fn split_skills(raw: &str) -> Vec<String> {
    let mut skills: Vec<String> = Vec::new();
    for skill in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !skills.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
            skills.push(skill.to_string());
        }
    }
    skills
}
