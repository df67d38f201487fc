//! Template hydration: turns a stored template into an editable resume.
//!
//! Templates are JSON documents that may carry `{{path.to.value}}` tokens.
//! Tokens are resolved against the resume data derived from the user's
//! profile (plus the raw profile under `profile`), substituted into the JSON
//! text, and the result is parsed back into a `ResumeBuilderData`. Any
//! failure falls back to the profile-derived data and reports a
//! `TemplateError` alongside it; hydration itself never fails.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::models::profile::UserProfile;
use crate::resume::models::{ExperienceItem, Layout, ResumeBuilderData, ResumeHeader};
use crate::resume::sections::ensure_section_order;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum TemplateError {
    #[error("template content is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("template content must be a JSON object")]
    NotAnObject,

    #[error("hydrated template is not a valid resume: {0}")]
    InvalidResume(String),
}

/// Result of hydration. `error` is set when `data` is the fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hydration {
    pub data: ResumeBuilderData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_error: Option<TemplateError>,
}

/// Starting document built from the user's profile alone.
pub fn initial_resume_data(profile: &UserProfile) -> ResumeBuilderData {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();

    let mut experience = Vec::new();
    if let Some(company) = profile.company.as_deref().filter(|c| !c.trim().is_empty()) {
        experience.push(ExperienceItem {
            title: text(&profile.job_title),
            company: company.to_string(),
            location: text(&profile.location),
            end_date: "Present".to_string(),
            ..Default::default()
        });
    }

    let mut data = ResumeBuilderData {
        header: ResumeHeader {
            full_name: profile.name.clone(),
            job_title: text(&profile.job_title),
            email: profile.email.clone(),
            phone: text(&profile.phone),
            location: text(&profile.location),
            linkedin: text(&profile.linkedin),
            website: text(&profile.website),
        },
        summary: text(&profile.bio),
        experience,
        skills: profile.skills.clone(),
        layout: Layout::SingleColumn,
        ..Default::default()
    };
    ensure_section_order(&mut data);
    data
}

/// Checks that stored template content is a JSON object.
pub fn validate_template_content(content: &str) -> Result<(), TemplateError> {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(_)) => Ok(()),
        Ok(_) => Err(TemplateError::NotAnObject),
        Err(e) => Err(TemplateError::InvalidJson(e.to_string())),
    }
}

pub fn hydrate_from_template(content: &str, profile: &UserProfile) -> Hydration {
    let initial = initial_resume_data(profile);
    match try_hydrate(content, profile, &initial) {
        Ok(mut data) => {
            ensure_section_order(&mut data);
            Hydration {
                data,
                template_error: None,
            }
        }
        Err(e) => {
            warn!(user_id = %profile.id, "Template hydration fell back to profile data: {e}");
            Hydration {
                data: initial,
                template_error: Some(e),
            }
        }
    }
}

fn try_hydrate(
    content: &str,
    profile: &UserProfile,
    initial: &ResumeBuilderData,
) -> Result<ResumeBuilderData, TemplateError> {
    validate_template_content(content)?;

    let mut context = to_object(initial)?;
    context.insert("profile".to_string(), to_value(profile)?);
    let rendered = render_placeholders(content, &Value::Object(context));

    let overlay = match serde_json::from_str::<Value>(&rendered) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(TemplateError::NotAnObject),
        Err(e) => return Err(TemplateError::InvalidResume(e.to_string())),
    };

    // Keys the template leaves out keep their profile-derived values.
    let mut merged = to_object(initial)?;
    merged.extend(overlay);
    serde_json::from_value(Value::Object(merged))
        .map_err(|e| TemplateError::InvalidResume(e.to_string()))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, TemplateError> {
    serde_json::to_value(value).map_err(|e| TemplateError::InvalidResume(e.to_string()))
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, TemplateError> {
    match to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(TemplateError::NotAnObject),
    }
}

/// Replaces every `{{ dotted.path }}` token in `text` with the value found at
/// that path in `context`.
///
/// Output is meant to stay valid JSON when the token sits inside a JSON
/// string: strings are escaped, numbers and booleans are written as-is,
/// arrays and objects are written as escaped JSON, and missing or null
/// values become empty. Tokens that are not plain paths (block helpers,
/// comments) and unterminated `{{` are left untouched.
pub fn render_placeholders(text: &str, context: &Value) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let token = after_open[..end].trim();
        if is_plain_path(token) {
            out.push_str(&render_value(lookup(context, token)));
        } else {
            out.push_str(&rest[start..start + 2 + end + 2]);
        }
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);
    out
}

fn is_plain_path(token: &str) -> bool {
    !token.is_empty()
        && token
            .split('.')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_'))
}

fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn render_value(value: Option<&Value>) -> String {
    value.map(|v| escape_json_string(&display_value(v))).unwrap_or_default()
}

/// Unescaped text for a value. Arrays join their items with `,`.
fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// JSON string escaping without the surrounding quotes.
fn escape_json_string(s: &str) -> String {
    let quoted = Value::String(s.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::resume::models::DEFAULT_SECTION_ORDER;

    fn bob() -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            phone: None,
            location: Some("Pune".to_string()),
            bio: Some("Builds \"fast\" things".to_string()),
            job_title: Some("Engineer".to_string()),
            company: Some("Acme".to_string()),
            skills: vec!["Rust".to_string(), "SQL".to_string()],
            linkedin: None,
            website: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_initial_data_from_profile() {
        let data = initial_resume_data(&bob());
        assert_eq!(data.header.full_name, "Bob");
        assert_eq!(data.summary, "Builds \"fast\" things");
        assert_eq!(data.experience.len(), 1);
        assert_eq!(data.experience[0].company, "Acme");
        assert_eq!(data.skills, vec!["Rust", "SQL"]);
        assert_eq!(data.section_order, DEFAULT_SECTION_ORDER.to_vec());
    }

    #[test]
    fn test_full_name_token_resolves_from_profile() {
        let content = json!({
            "header": { "fullName": "{{header.fullName}}", "jobTitle": "{{ header.jobTitle }}" },
            "layout": "two-column-left"
        })
        .to_string();

        let hydration = hydrate_from_template(&content, &bob());
        assert!(hydration.template_error.is_none());
        assert_eq!(hydration.data.header.full_name, "Bob");
        assert_eq!(hydration.data.header.job_title, "Engineer");
        assert_eq!(hydration.data.layout, Layout::TwoColumnLeft);
        // Keys absent from the template keep their profile values.
        assert_eq!(hydration.data.skills, vec!["Rust", "SQL"]);
    }

    #[test]
    fn test_quotes_in_values_stay_valid_json() {
        let content = r#"{ "summary": "About me: {{summary}}" }"#;
        let hydration = hydrate_from_template(content, &bob());
        assert!(hydration.template_error.is_none());
        assert_eq!(hydration.data.summary, "About me: Builds \"fast\" things");
    }

    #[test]
    fn test_malformed_template_falls_back_with_error() {
        let hydration = hydrate_from_template("{ \"header\": ", &bob());
        assert!(matches!(
            hydration.template_error,
            Some(TemplateError::InvalidJson(_))
        ));
        assert_eq!(hydration.data, initial_resume_data(&bob()));
    }

    #[test]
    fn test_non_object_template_falls_back() {
        let hydration = hydrate_from_template("[1, 2]", &bob());
        assert_eq!(hydration.template_error, Some(TemplateError::NotAnObject));
    }

    #[test]
    fn test_wrong_shape_after_substitution_falls_back() {
        let content = r#"{ "skills": "{{header.fullName}}" }"#;
        let hydration = hydrate_from_template(content, &bob());
        assert!(matches!(
            hydration.template_error,
            Some(TemplateError::InvalidResume(_))
        ));
        assert_eq!(hydration.data.skills, vec!["Rust", "SQL"]);
    }

    #[test]
    fn test_template_without_order_gets_default() {
        let hydration = hydrate_from_template(r#"{ "sectionOrder": [] }"#, &bob());
        assert_eq!(
            hydration.data.section_order,
            DEFAULT_SECTION_ORDER.to_vec()
        );
    }

    #[test]
    fn test_render_placeholders_value_kinds() {
        let ctx = json!({
            "a": { "b": "x" },
            "n": 3,
            "t": true,
            "list": ["first", "second"],
            "nothing": null
        });
        assert_eq!(render_placeholders("{{a.b}}-{{n}}-{{t}}", &ctx), "x-3-true");
        assert_eq!(render_placeholders("{{list.1}}", &ctx), "second");
        assert_eq!(render_placeholders("[{{missing}}][{{nothing}}]", &ctx), "[][]");
        assert_eq!(render_placeholders("{{list}}", &ctx), "first,second");
    }

    #[test]
    fn test_array_placeholder_joins_items() {
        let content = r#"{ "summary": "Skilled in {{skills}}" }"#;
        let hydration = hydrate_from_template(content, &bob());
        assert!(hydration.template_error.is_none());
        assert_eq!(hydration.data.summary, "Skilled in Rust,SQL");

        let ctx = json!({ "tags": ["say \"hi\"", null, 2] });
        assert_eq!(render_placeholders("{{tags}}", &ctx), r#"say \"hi\",,2"#);
    }

    #[test]
    fn test_render_placeholders_leaves_non_paths() {
        let ctx = json!({ "a": "x" });
        assert_eq!(
            render_placeholders("{{#each a}}{{/each}}", &ctx),
            "{{#each a}}{{/each}}"
        );
        assert_eq!(render_placeholders("open {{a", &ctx), "open {{a");
        assert_eq!(render_placeholders("{{}}", &ctx), "{{}}");
    }

    #[test]
    fn test_profile_fields_available_under_profile() {
        let ctx = json!({ "profile": { "email": "bob@example.com" } });
        assert_eq!(
            render_placeholders("mail: {{profile.email}}", &ctx),
            "mail: bob@example.com"
        );
    }

    #[test]
    fn test_validate_template_content() {
        assert!(validate_template_content(r#"{"layout":"single-column"}"#).is_ok());
        assert_eq!(
            validate_template_content("42"),
            Err(TemplateError::NotAnObject)
        );
        assert!(matches!(
            validate_template_content("{"),
            Err(TemplateError::InvalidJson(_))
        ));
    }
}
