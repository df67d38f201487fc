//! Walks a survey's step graph one answer at a time.
//!
//! Bot messages never wait for the user: entering one appends it to the
//! transcript and follows its edge straight away, so after `start` or
//! `advance` the session always rests on a step that needs input, or it is
//! finished. Reaching a step marked `isLastStep` finalizes the session
//! exactly once and produces a `CompletedSurvey`.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::survey::definition::{validate_steps, DefinitionError};
use crate::survey::models::{InputType, Step, StepKind, SurveyDefinition};
use crate::survey::recorder::ResponseRecorder;

// ────────────────────────────────────────────────────────────────────────────
// Inputs, outputs, errors
// ────────────────────────────────────────────────────────────────────────────

/// What the user did at the current step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum StepInput {
    /// Free text for a `userInput` step.
    Text(String),
    /// Option value for a `userOptions` or `userDropdown` step.
    Choice(String),
    /// Move on without answering.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Author {
    Bot,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub author: Author,
    pub step_id: String,
    pub text: String,
}

/// The finalize event: everything needed to persist a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSurvey {
    pub survey_name: String,
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Progress {
    AwaitingInput {
        #[serde(rename = "stepId")]
        step_id: String,
    },
    Completed(CompletedSurvey),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("survey session is already finished")]
    Finished,

    #[error("step '{step_id}' expects {expected}")]
    WrongInput {
        step_id: String,
        expected: &'static str,
    },

    #[error("step '{step_id}' has no option '{value}'")]
    UnknownOption { step_id: String, value: String },

    #[error("step '{step_id}' needs a non-empty answer")]
    EmptyAnswer { step_id: String },

    #[error("step '{step_id}' needs an email address")]
    InvalidEmail { step_id: String },

    #[error("step '{step_id}' cannot be skipped")]
    SkipNotAllowed { step_id: String },

    #[error("step '{step_id}' has nowhere to go next")]
    DeadEnd { step_id: String },

    #[error("step '{step_id}' does not exist")]
    UnknownStep { step_id: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Client-facing view of the current step
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptChoice {
    pub label: String,
    pub value: String,
}

/// What the client should render for the step awaiting input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepPrompt {
    pub step_id: String,
    pub step_type: String,
    pub text: Option<String>,
    pub placeholder: Option<String>,
    pub input_type: Option<InputType>,
    pub choices: Vec<PromptChoice>,
    pub can_skip: bool,
}

impl StepPrompt {
    fn from_step(step: &Step) -> Self {
        let (placeholder, input_type, choices) = match &step.kind {
            StepKind::BotMessage => (None, None, Vec::new()),
            StepKind::UserInput {
                placeholder,
                input_type,
            } => (placeholder.clone(), Some(*input_type), Vec::new()),
            StepKind::UserOptions { options } => (
                None,
                None,
                options
                    .iter()
                    .map(|o| PromptChoice {
                        label: o.text.clone(),
                        value: o.value.clone(),
                    })
                    .collect(),
            ),
            StepKind::UserDropdown { options } => (
                None,
                None,
                options
                    .iter()
                    .map(|o| PromptChoice {
                        label: o.label.clone(),
                        value: o.value.clone(),
                    })
                    .collect(),
            ),
        };

        StepPrompt {
            step_id: step.id.clone(),
            step_type: step.type_name().to_string(),
            text: step.text.clone(),
            placeholder,
            input_type,
            choices,
            can_skip: can_skip(step),
        }
    }
}

/// Free-text and dropdown steps with a forward edge may be passed over.
fn can_skip(step: &Step) -> bool {
    matches!(
        step.kind,
        StepKind::UserInput { .. } | StepKind::UserDropdown { .. }
    ) && step.next_step().is_some()
}

// ────────────────────────────────────────────────────────────────────────────
// Session
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SurveySession {
    survey: SurveyDefinition,
    state: Progress,
    recorder: ResponseRecorder,
    transcript: Vec<Message>,
}

impl SurveySession {
    /// Validates the survey, enters its first step and plays any leading
    /// bot messages.
    pub fn start(survey: SurveyDefinition) -> Result<Self, SessionError> {
        validate_steps(&survey.steps)?;
        let first = survey.steps[0].id.clone();

        let mut session = SurveySession {
            survey,
            state: Progress::AwaitingInput {
                step_id: first.clone(),
            },
            recorder: ResponseRecorder::new(),
            transcript: Vec::new(),
        };
        session.enter(&first)?;
        Ok(session)
    }

    /// Applies the user's input to the current step and moves forward.
    ///
    /// Invalid input leaves the session untouched.
    pub fn advance(&mut self, input: StepInput) -> Result<Progress, SessionError> {
        let step = self.current_step().cloned().ok_or(SessionError::Finished)?;
        let answer = resolve_answer(&step, input)?;

        let next = if step.is_last_step {
            None
        } else {
            let next = answer.next.ok_or_else(|| SessionError::DeadEnd {
                step_id: step.id.clone(),
            })?;
            Some(next)
        };

        if let Some((stored, shown)) = answer.value {
            if let Some(var) = step.variable() {
                self.recorder.record(var, stored);
            }
            self.transcript.push(Message {
                author: Author::User,
                step_id: step.id.clone(),
                text: shown,
            });
        }

        match next {
            Some(next) => self.enter(&next)?,
            None => self.finalize(),
        }

        Ok(self.state.clone())
    }

    pub fn progress(&self) -> &Progress {
        &self.state
    }

    pub fn survey(&self) -> &SurveyDefinition {
        &self.survey
    }

    pub fn current_step(&self) -> Option<&Step> {
        match &self.state {
            Progress::AwaitingInput { step_id } => self.survey.step(step_id),
            Progress::Completed(_) => None,
        }
    }

    pub fn prompt(&self) -> Option<StepPrompt> {
        self.current_step().map(StepPrompt::from_step)
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn data(&self) -> &BTreeMap<String, String> {
        self.recorder.data()
    }

    pub fn completion(&self) -> Option<&CompletedSurvey> {
        match &self.state {
            Progress::Completed(done) => Some(done),
            Progress::AwaitingInput { .. } => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, Progress::Completed(_))
    }

    /// Enters `step_id`, auto-advancing through bot messages.
    fn enter(&mut self, step_id: &str) -> Result<(), SessionError> {
        let mut next_id = step_id.to_string();
        let mut visited = HashSet::new();
        loop {
            if !visited.insert(next_id.clone()) {
                return Err(SessionError::DeadEnd { step_id: next_id });
            }
            let step = self
                .survey
                .step(&next_id)
                .ok_or_else(|| SessionError::UnknownStep {
                    step_id: next_id.clone(),
                })?;

            if let Some(text) = step.text.as_deref().filter(|t| !t.is_empty()) {
                self.transcript.push(Message {
                    author: Author::Bot,
                    step_id: step.id.clone(),
                    text: text.to_string(),
                });
            }

            if step.requires_input() {
                self.state = Progress::AwaitingInput {
                    step_id: step.id.clone(),
                };
                return Ok(());
            }

            if step.is_last_step {
                self.finalize();
                return Ok(());
            }

            next_id = step
                .next_step()
                .ok_or_else(|| SessionError::DeadEnd {
                    step_id: step.id.clone(),
                })?
                .to_string();
        }
    }

    fn finalize(&mut self) {
        self.state = Progress::Completed(CompletedSurvey {
            survey_name: self.survey.name.clone(),
            data: self.recorder.data().clone(),
        });
    }
}

struct ResolvedAnswer {
    /// `(stored value, transcript text)`; `None` when skipped.
    value: Option<(String, String)>,
    next: Option<String>,
}

fn resolve_answer(step: &Step, input: StepInput) -> Result<ResolvedAnswer, SessionError> {
    let step_next = step.next_step().map(String::from);

    match (&step.kind, input) {
        (StepKind::UserInput { input_type, .. }, StepInput::Text(text)) => {
            let text = text.trim().to_string();
            if text.is_empty() {
                return Err(SessionError::EmptyAnswer {
                    step_id: step.id.clone(),
                });
            }
            if *input_type == InputType::Email && !text.contains('@') {
                return Err(SessionError::InvalidEmail {
                    step_id: step.id.clone(),
                });
            }
            Ok(ResolvedAnswer {
                value: Some((text.clone(), text)),
                next: step_next,
            })
        }
        (StepKind::UserOptions { options }, StepInput::Choice(value)) => {
            let option = options.iter().find(|o| o.value == value).ok_or_else(|| {
                SessionError::UnknownOption {
                    step_id: step.id.clone(),
                    value: value.clone(),
                }
            })?;
            Ok(ResolvedAnswer {
                value: Some((option.value.clone(), option.text.clone())),
                next: option.next_step().map(String::from).or(step_next),
            })
        }
        (StepKind::UserDropdown { options }, StepInput::Choice(value)) => {
            let option = options.iter().find(|o| o.value == value).ok_or_else(|| {
                SessionError::UnknownOption {
                    step_id: step.id.clone(),
                    value: value.clone(),
                }
            })?;
            Ok(ResolvedAnswer {
                value: Some((option.value.clone(), option.label.clone())),
                next: step_next,
            })
        }
        (_, StepInput::Skip) if can_skip(step) => Ok(ResolvedAnswer {
            value: None,
            next: step_next,
        }),
        (_, StepInput::Skip) => Err(SessionError::SkipNotAllowed {
            step_id: step.id.clone(),
        }),
        (kind, _) => Err(SessionError::WrongInput {
            step_id: step.id.clone(),
            expected: match kind {
                StepKind::UserInput { .. } => "a text answer",
                _ => "one of its options",
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn survey(name: &str, steps: serde_json::Value) -> SurveyDefinition {
        SurveyDefinition {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            steps: serde_json::from_value(steps).unwrap(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn greeting_survey() -> SurveyDefinition {
        survey(
            "greeting",
            json!([
                { "id": "hi", "type": "botMessage", "text": "Hi", "nextStepId": "ask" },
                { "id": "ask", "type": "userInput", "text": "What is your name?",
                  "variableName": "name", "nextStepId": "end" },
                { "id": "end", "type": "botMessage", "text": "Thanks!", "isLastStep": true }
            ]),
        )
    }

    fn branching_survey() -> SurveyDefinition {
        survey(
            "career",
            json!([
                { "id": "role", "type": "userOptions", "text": "Are you a student?",
                  "variableName": "role", "nextStepId": "pro_company",
                  "options": [
                    { "text": "Student", "value": "student", "nextStepId": "school" },
                    { "text": "Working", "value": "working" }
                  ] },
                { "id": "school", "type": "userDropdown", "text": "Which school?",
                  "variableName": "school", "nextStepId": "email",
                  "dropdownOptions": [
                    { "label": "MIT", "value": "mit" },
                    { "label": "IIT", "value": "iit" }
                  ] },
                { "id": "pro_company", "type": "userInput", "text": "Company?",
                  "variableName": "company", "nextStepId": "email" },
                { "id": "email", "type": "userInput", "inputType": "email",
                  "text": "Email?", "variableName": "email", "isLastStep": true }
            ]),
        )
    }

    #[test]
    fn test_bot_loop_rejected_at_start() {
        let looping = survey(
            "loop",
            json!([
                { "id": "a", "type": "botMessage", "text": "A", "nextStepId": "b" },
                { "id": "b", "type": "botMessage", "text": "B", "nextStepId": "a" }
            ]),
        );
        let err = SurveySession::start(looping).unwrap_err();
        assert!(matches!(err, SessionError::Definition(_)));
    }

    #[test]
    fn test_enter_stops_on_revisited_bot_step() {
        let looping = survey(
            "loop",
            json!([
                { "id": "a", "type": "botMessage", "text": "A", "nextStepId": "b" },
                { "id": "b", "type": "botMessage", "text": "B", "nextStepId": "a" }
            ]),
        );
        let mut session = SurveySession {
            survey: looping,
            state: Progress::AwaitingInput {
                step_id: "a".to_string(),
            },
            recorder: ResponseRecorder::new(),
            transcript: Vec::new(),
        };

        let err = session.enter("a").unwrap_err();
        assert!(matches!(err, SessionError::DeadEnd { ref step_id } if step_id == "a"));
        assert_eq!(session.transcript().len(), 2);
    }

    #[test]
    fn test_start_plays_leading_bot_messages() {
        let session = SurveySession::start(greeting_survey()).unwrap();

        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript()[0].text, "Hi");
        assert_eq!(session.transcript()[0].author, Author::Bot);
        assert_eq!(session.transcript()[1].text, "What is your name?");
        assert_eq!(session.current_step().unwrap().id, "ask");
        assert!(session.data().is_empty());
    }

    #[test]
    fn test_answer_finalizes_with_recorded_data() {
        let mut session = SurveySession::start(greeting_survey()).unwrap();
        let progress = session.advance(StepInput::Text("Alice".to_string())).unwrap();

        let Progress::Completed(done) = progress else {
            panic!("expected completion");
        };
        assert_eq!(done.survey_name, "greeting");
        assert_eq!(done.data.len(), 1);
        assert_eq!(done.data.get("name").map(String::as_str), Some("Alice"));
        assert!(session.is_finished());
        assert_eq!(session.transcript().last().unwrap().text, "Thanks!");
    }

    #[test]
    fn test_option_edge_overrides_step_edge() {
        let mut session = SurveySession::start(branching_survey()).unwrap();
        session
            .advance(StepInput::Choice("student".to_string()))
            .unwrap();
        assert_eq!(session.current_step().unwrap().id, "school");
    }

    #[test]
    fn test_option_without_edge_uses_step_edge() {
        let mut session = SurveySession::start(branching_survey()).unwrap();
        session
            .advance(StepInput::Choice("working".to_string()))
            .unwrap();
        assert_eq!(session.current_step().unwrap().id, "pro_company");
        assert_eq!(session.data().get("role").map(String::as_str), Some("working"));
    }

    #[test]
    fn test_transcript_shows_option_label() {
        let mut session = SurveySession::start(branching_survey()).unwrap();
        session
            .advance(StepInput::Choice("student".to_string()))
            .unwrap();
        session.advance(StepInput::Choice("iit".to_string())).unwrap();
        let user_lines: Vec<_> = session
            .transcript()
            .iter()
            .filter(|m| m.author == Author::User)
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(user_lines, vec!["Student", "IIT"]);
        assert_eq!(session.data().get("school").map(String::as_str), Some("iit"));
    }

    #[test]
    fn test_skip_records_nothing_and_moves_on() {
        let mut session = SurveySession::start(branching_survey()).unwrap();
        session
            .advance(StepInput::Choice("working".to_string()))
            .unwrap();
        assert!(session.prompt().unwrap().can_skip);
        session.advance(StepInput::Skip).unwrap();

        assert_eq!(session.current_step().unwrap().id, "email");
        assert!(!session.data().contains_key("company"));
    }

    #[test]
    fn test_skip_refused_on_options_step() {
        let mut session = SurveySession::start(branching_survey()).unwrap();
        let err = session.advance(StepInput::Skip).unwrap_err();
        assert_eq!(
            err,
            SessionError::SkipNotAllowed {
                step_id: "role".to_string()
            }
        );
        assert_eq!(session.current_step().unwrap().id, "role");
    }

    #[test]
    fn test_skip_refused_without_forward_edge() {
        let mut session = SurveySession::start(branching_survey()).unwrap();
        session
            .advance(StepInput::Choice("working".to_string()))
            .unwrap();
        session.advance(StepInput::Text("Acme".to_string())).unwrap();
        assert!(!session.prompt().unwrap().can_skip);
        assert!(matches!(
            session.advance(StepInput::Skip),
            Err(SessionError::SkipNotAllowed { .. })
        ));
    }

    #[test]
    fn test_last_input_step_finalizes_after_answer() {
        let mut session = SurveySession::start(branching_survey()).unwrap();
        session
            .advance(StepInput::Choice("working".to_string()))
            .unwrap();
        session.advance(StepInput::Text("Acme".to_string())).unwrap();
        let progress = session
            .advance(StepInput::Text("bob@acme.io".to_string()))
            .unwrap();

        let Progress::Completed(done) = progress else {
            panic!("expected completion");
        };
        assert_eq!(done.data.len(), 3);
        assert_eq!(done.data["email"], "bob@acme.io");
        assert_eq!(done.data["company"], "Acme");
    }

    #[test]
    fn test_invalid_input_leaves_session_untouched() {
        let mut session = SurveySession::start(branching_survey()).unwrap();
        let before = session.transcript().len();

        assert!(matches!(
            session.advance(StepInput::Choice("retired".to_string())),
            Err(SessionError::UnknownOption { .. })
        ));
        assert!(matches!(
            session.advance(StepInput::Text("student".to_string())),
            Err(SessionError::WrongInput { .. })
        ));
        assert_eq!(session.transcript().len(), before);
        assert!(session.data().is_empty());
    }

    #[test]
    fn test_empty_and_malformed_email_rejected() {
        let mut session = SurveySession::start(branching_survey()).unwrap();
        session
            .advance(StepInput::Choice("working".to_string()))
            .unwrap();
        assert!(matches!(
            session.advance(StepInput::Text("   ".to_string())),
            Err(SessionError::EmptyAnswer { .. })
        ));
        session.advance(StepInput::Text("Acme".to_string())).unwrap();
        assert!(matches!(
            session.advance(StepInput::Text("not-an-email".to_string())),
            Err(SessionError::InvalidEmail { .. })
        ));
    }

    #[test]
    fn test_advance_after_finish_fails() {
        let mut session = SurveySession::start(greeting_survey()).unwrap();
        session.advance(StepInput::Text("Alice".to_string())).unwrap();
        assert_eq!(
            session.advance(StepInput::Text("again".to_string())),
            Err(SessionError::Finished)
        );
    }

    #[test]
    fn test_bot_only_survey_completes_on_start() {
        let session = SurveySession::start(survey(
            "notice",
            json!([
                { "id": "a", "type": "botMessage", "text": "Welcome", "nextStepId": "b" },
                { "id": "b", "type": "botMessage", "text": "Bye", "isLastStep": true }
            ]),
        ))
        .unwrap();

        assert!(session.is_finished());
        assert_eq!(session.completion().unwrap().data.len(), 0);
        assert_eq!(session.transcript().len(), 2);
    }

    #[test]
    fn test_broken_graph_rejected_at_start() {
        let result = SurveySession::start(survey(
            "broken",
            json!([
                { "id": "a", "type": "botMessage", "text": "Hi", "nextStepId": "b" },
                { "id": "b", "type": "userInput", "variableName": "x" }
            ]),
        ));
        assert!(matches!(result, Err(SessionError::Definition(_))));
    }

    #[test]
    fn test_input_serde_shape() {
        let input: StepInput =
            serde_json::from_value(json!({ "kind": "choice", "value": "a" })).unwrap();
        assert_eq!(input, StepInput::Choice("a".to_string()));
        let skip: StepInput = serde_json::from_value(json!({ "kind": "skip" })).unwrap();
        assert_eq!(skip, StepInput::Skip);
    }
}
