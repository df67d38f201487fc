//! Authoring-time validation of survey step graphs.
//!
//! A survey is accepted only if every edge resolves, every non-terminal step
//! can move forward, and every step is reachable from the first one. All
//! violations are collected so an editor can fix them in one pass.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use thiserror::Error;

use crate::survey::models::{Step, StepKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    NoSteps,
    BlankStepId { index: usize },
    DuplicateStepId { id: String },
    DanglingEdge { step_id: String, target: String },
    MissingEdge { step_id: String },
    OptionWithoutEdge { step_id: String, value: String },
    NoOptions { step_id: String },
    DuplicateOptionValue { step_id: String, value: String },
    Unreachable { step_id: String },
    BotCycle { step_id: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NoSteps => write!(f, "survey has no steps"),
            Violation::BlankStepId { index } => write!(f, "step #{index} has a blank id"),
            Violation::DuplicateStepId { id } => write!(f, "step id '{id}' is used more than once"),
            Violation::DanglingEdge { step_id, target } => {
                write!(f, "step '{step_id}' points to unknown step '{target}'")
            }
            Violation::MissingEdge { step_id } => write!(
                f,
                "step '{step_id}' has no nextStepId and is not marked as the last step"
            ),
            Violation::OptionWithoutEdge { step_id, value } => write!(
                f,
                "option '{value}' of step '{step_id}' has no nextStepId and the step has none either"
            ),
            Violation::NoOptions { step_id } => write!(f, "step '{step_id}' has no options"),
            Violation::DuplicateOptionValue { step_id, value } => {
                write!(f, "step '{step_id}' repeats option value '{value}'")
            }
            Violation::Unreachable { step_id } => {
                write!(f, "step '{step_id}' cannot be reached from the first step")
            }
            Violation::BotCycle { step_id } => write!(
                f,
                "step '{step_id}' is part of a loop of bot messages that never asks for input"
            ),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", join_violations(.violations))]
pub struct DefinitionError {
    pub violations: Vec<Violation>,
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validates a step graph. Steps are walked from `steps[0]`.
pub fn validate_steps(steps: &[Step]) -> Result<(), DefinitionError> {
    let mut violations = Vec::new();

    if steps.is_empty() {
        return Err(DefinitionError {
            violations: vec![Violation::NoSteps],
        });
    }

    let mut ids: HashMap<&str, &Step> = HashMap::new();
    for (index, step) in steps.iter().enumerate() {
        if step.id.trim().is_empty() {
            violations.push(Violation::BlankStepId { index });
            continue;
        }
        if ids.insert(step.id.as_str(), step).is_some() {
            violations.push(Violation::DuplicateStepId {
                id: step.id.clone(),
            });
        }
    }

    for step in steps {
        check_edges(step, &ids, &mut violations);
    }

    // Reachability only makes sense once edges are known to resolve.
    if violations.is_empty() {
        let reachable = reachable_from(&steps[0], &ids);
        for step in steps {
            if !reachable.contains(step.id.as_str()) {
                violations.push(Violation::Unreachable {
                    step_id: step.id.clone(),
                });
            }
        }
        violations.extend(bot_cycles(steps, &ids));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(DefinitionError { violations })
    }
}

fn check_edges(step: &Step, ids: &HashMap<&str, &Step>, violations: &mut Vec<Violation>) {
    let dangling = |target: &str| Violation::DanglingEdge {
        step_id: step.id.clone(),
        target: target.to_string(),
    };

    if let Some(next) = step.next_step() {
        if !ids.contains_key(next) {
            violations.push(dangling(next));
        }
    }

    match &step.kind {
        StepKind::UserOptions { options } => {
            if options.is_empty() {
                violations.push(Violation::NoOptions {
                    step_id: step.id.clone(),
                });
            }
            let mut seen = HashSet::new();
            for option in options {
                if !seen.insert(option.value.as_str()) {
                    violations.push(Violation::DuplicateOptionValue {
                        step_id: step.id.clone(),
                        value: option.value.clone(),
                    });
                }
                match option.next_step() {
                    Some(target) if !ids.contains_key(target) => violations.push(dangling(target)),
                    Some(_) => {}
                    None if step.is_last_step || step.next_step().is_some() => {}
                    None => violations.push(Violation::OptionWithoutEdge {
                        step_id: step.id.clone(),
                        value: option.value.clone(),
                    }),
                }
            }
        }
        StepKind::UserDropdown { options } => {
            if options.is_empty() {
                violations.push(Violation::NoOptions {
                    step_id: step.id.clone(),
                });
            }
            let mut seen = HashSet::new();
            for option in options {
                if !seen.insert(option.value.as_str()) {
                    violations.push(Violation::DuplicateOptionValue {
                        step_id: step.id.clone(),
                        value: option.value.clone(),
                    });
                }
            }
            if !step.is_last_step && step.next_step().is_none() {
                violations.push(Violation::MissingEdge {
                    step_id: step.id.clone(),
                });
            }
        }
        StepKind::BotMessage | StepKind::UserInput { .. } => {
            if !step.is_last_step && step.next_step().is_none() {
                violations.push(Violation::MissingEdge {
                    step_id: step.id.clone(),
                });
            }
        }
    }
}

/// Breadth-first walk over every edge a step can take.
fn reachable_from<'a>(start: &'a Step, ids: &HashMap<&'a str, &'a Step>) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([start]);
    seen.insert(start.id.as_str());

    while let Some(step) = queue.pop_front() {
        // A terminal step ends the walk even if it carries edges.
        if step.is_last_step {
            continue;
        }
        let mut targets: Vec<&str> = step.next_step().into_iter().collect();
        if let StepKind::UserOptions { options } = &step.kind {
            targets.extend(options.iter().filter_map(|o| o.next_step()));
        }
        for target in targets {
            if let Some(next) = ids.get(target) {
                if seen.insert(next.id.as_str()) {
                    queue.push_back(next);
                }
            }
        }
    }
    seen
}

/// Chains of bot messages that loop back on themselves. Such a chain never
/// waits for input and never reaches a last step.
fn bot_cycles<'a>(steps: &'a [Step], ids: &HashMap<&'a str, &'a Step>) -> Vec<Violation> {
    let mut flagged: HashSet<&str> = HashSet::new();
    let mut violations = Vec::new();

    for start in steps {
        let mut path: Vec<&str> = Vec::new();
        let mut current = Some(start);
        while let Some(step) = current {
            if !matches!(step.kind, StepKind::BotMessage) || step.is_last_step {
                break;
            }
            if let Some(pos) = path.iter().position(|id| *id == step.id) {
                if flagged.insert(step.id.as_str()) {
                    violations.push(Violation::BotCycle {
                        step_id: step.id.clone(),
                    });
                }
                flagged.extend(&path[pos..]);
                break;
            }
            if flagged.contains(step.id.as_str()) {
                break;
            }
            path.push(step.id.as_str());
            current = step.next_step().and_then(|next| ids.get(next).copied());
        }
    }
    violations
}
