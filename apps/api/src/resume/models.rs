use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Order used when a stored resume carries none.
pub const DEFAULT_SECTION_ORDER: [&str; 4] = ["summary", "experience", "education", "skills"];

pub const CUSTOM_PREFIX: &str = "custom-";

/// The editable resume document. Content is keyed by section; `section_order`
/// alone decides which sections appear and in what sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeBuilderData {
    pub header: ResumeHeader,
    pub summary: String,
    pub experience: Vec<ExperienceItem>,
    pub education: Vec<EducationItem>,
    pub skills: Vec<String>,
    pub additional_details: AdditionalDetails,
    pub styles: Map<String, Value>,
    pub layout: Layout,
    pub section_order: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeHeader {
    pub full_name: String,
    pub job_title: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub linkedin: String,
    pub website: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperienceItem {
    pub title: String,
    pub company: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationItem {
    pub degree: String,
    pub school: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

/// User-defined sections, split by the column they were created for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdditionalDetails {
    pub main: BTreeMap<String, CustomSection>,
    pub sidebar: BTreeMap<String, CustomSection>,
}

impl AdditionalDetails {
    pub fn column_mut(&mut self, column: Column) -> &mut BTreeMap<String, CustomSection> {
        match column {
            Column::Main => &mut self.main,
            Column::Sidebar => &mut self.sidebar,
        }
    }

    /// Looks a custom section up in either column, main first.
    pub fn find(&self, key: &str) -> Option<&CustomSection> {
        self.main.get(key).or_else(|| self.sidebar.get(key))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CustomSection {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    #[default]
    SingleColumn,
    TwoColumnLeft,
    TwoColumnRight,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Main,
    Sidebar,
}

/// A parsed `sectionOrder` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SectionId {
    Summary,
    Experience,
    Education,
    Skills,
    Custom(String),
}

impl SectionId {
    /// Parses an order entry; unknown ids yield `None`.
    pub fn parse(id: &str) -> Option<SectionId> {
        match id {
            "summary" => Some(SectionId::Summary),
            "experience" => Some(SectionId::Experience),
            "education" => Some(SectionId::Education),
            "skills" => Some(SectionId::Skills),
            other => other
                .strip_prefix(CUSTOM_PREFIX)
                .filter(|key| !key.is_empty())
                .map(|key| SectionId::Custom(key.to_string())),
        }
    }

    pub fn custom(key: &str) -> SectionId {
        SectionId::Custom(key.to_string())
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionId::Summary => f.write_str("summary"),
            SectionId::Experience => f.write_str("experience"),
            SectionId::Education => f.write_str("education"),
            SectionId::Skills => f.write_str("skills"),
            SectionId::Custom(key) => write!(f, "{CUSTOM_PREFIX}{key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_json_fills_defaults() {
        let data: ResumeBuilderData = serde_json::from_value(json!({
            "header": { "fullName": "Bob" },
            "layout": "two-column-right",
            "additionalDetails": { "main": { "awards": { "title": "Awards" } } }
        }))
        .unwrap();

        assert_eq!(data.header.full_name, "Bob");
        assert_eq!(data.layout, Layout::TwoColumnRight);
        assert!(data.section_order.is_empty());
        assert_eq!(data.additional_details.main["awards"].content, "");
        assert!(data.additional_details.sidebar.is_empty());
    }

    #[test]
    fn test_section_id_parse_and_display() {
        assert_eq!(SectionId::parse("skills"), Some(SectionId::Skills));
        assert_eq!(
            SectionId::parse("custom-volunteer_work"),
            Some(SectionId::custom("volunteer_work"))
        );
        assert_eq!(SectionId::parse("custom-"), None);
        assert_eq!(SectionId::parse("projects"), None);
        assert_eq!(SectionId::custom("awards").to_string(), "custom-awards");
    }

    #[test]
    fn test_find_prefers_main_column() {
        let mut details = AdditionalDetails::default();
        details.sidebar.insert(
            "langs".to_string(),
            CustomSection {
                title: "Languages".to_string(),
                content: "English".to_string(),
            },
        );
        assert_eq!(details.find("langs").unwrap().content, "English");
        assert!(details.find("awards").is_none());
    }
}
