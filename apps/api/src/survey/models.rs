use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A survey: a named graph of steps walked one prompt at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDefinition {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl SurveyDefinition {
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// Payload for creating or editing a survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSurvey {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// One node of the step graph. Fields shared by every step live here;
/// behaviour-specific data lives in `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_id: Option<String>,
    #[serde(default)]
    pub is_last_step: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_name: Option<String>,
    #[serde(flatten)]
    pub kind: StepKind,
}

impl Step {
    /// Step-level forward edge. Blank ids count as absent.
    pub fn next_step(&self) -> Option<&str> {
        non_blank(self.next_step_id.as_deref())
    }

    /// Variable the answer is stored under, if any.
    pub fn variable(&self) -> Option<&str> {
        non_blank(self.variable_name.as_deref())
    }

    pub fn requires_input(&self) -> bool {
        !matches!(self.kind, StepKind::BotMessage)
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StepKind {
    /// Displayed and immediately followed by `next_step_id`.
    BotMessage,
    /// Free-text answer.
    UserInput {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        #[serde(default, rename = "inputType")]
        input_type: InputType,
    },
    /// Fixed choices; each option may branch to its own step.
    UserOptions { options: Vec<SurveyOption> },
    /// Fixed choices sharing the step-level edge.
    UserDropdown {
        #[serde(rename = "dropdownOptions")]
        options: Vec<DropdownOption>,
    },
}

impl StepKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            StepKind::BotMessage => "botMessage",
            StepKind::UserInput { .. } => "userInput",
            StepKind::UserOptions { .. } => "userOptions",
            StepKind::UserDropdown { .. } => "userDropdown",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Textarea,
    Email,
    Number,
    Tel,
    Url,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurveyOption {
    pub text: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_id: Option<String>,
}

impl SurveyOption {
    pub fn next_step(&self) -> Option<&str> {
        non_blank(self.next_step_id.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

/// A stored, immutable survey answer set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub survey_name: String,
    pub data: BTreeMap<String, String>,
    pub response_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewSurveyResponse {
    pub user_id: Uuid,
    pub user_name: String,
    pub survey_name: String,
    pub data: BTreeMap<String, String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
