use std::collections::BTreeMap;

/// Flat `variableName -> answer` record accumulated while a survey runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseRecorder {
    data: BTreeMap<String, String>,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `variable`, replacing any earlier answer.
    pub fn record(&mut self, variable: &str, value: impl Into<String>) {
        self.data.insert(variable.to_string(), value.into());
    }

    pub fn data(&self) -> &BTreeMap<String, String> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_overwrites_previous_answer() {
        let mut recorder = ResponseRecorder::new();
        recorder.record("name", "Alice");
        recorder.record("name", "Alicia");
        assert_eq!(recorder.data().get("name").map(String::as_str), Some("Alicia"));
        assert_eq!(recorder.data().len(), 1);
    }

    #[test]
    fn test_answers_keyed_by_variable() {
        let mut recorder = ResponseRecorder::new();
        recorder.record("jobTitle", "Engineer");
        recorder.record("company", String::from("Acme"));
        let keys: Vec<_> = recorder.data().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["company", "jobTitle"]);
    }
}
