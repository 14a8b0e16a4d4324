use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::classify;

/// One scenario to execute, as stored in the test case document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Unique identifier, also the key of persisted artifacts
    pub id: String,

    /// Human label
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,

    /// Free-text tag; "ui", "negative" and "positive" select the scenario
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category: String,

    /// Text submitted to the tool
    #[serde(default, deserialize_with = "null_as_empty")]
    pub input: String,

    /// Text (or nothing) the output should resemble
    #[serde(default, deserialize_with = "null_as_empty")]
    pub expected: String,

    /// Explicit significant words, bypassing derivation from `expected`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_tokens: Option<Vec<String>>,

    /// Last observed output, merged back by `sync`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,

    /// Accuracy justification shown in the report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Hand-written coverage description, overrides the inferred one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covered: Option<String>,

    /// Hand-written status, overrides the computed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Hand-written length bucket, overrides the computed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_length_type: Option<String>,

    /// Fields this crate does not interpret, written back untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TestCase {
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        input: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            input: input.into(),
            expected: expected.into(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn expected_tokens(mut self, tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.expected_tokens = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Tokens checked by both the run-time assertion and the report
    pub fn significant_tokens(&self) -> Vec<String> {
        classify::significant_tokens(&self.expected, self.expected_tokens.as_deref())
    }

    /// Stored actual output, if it holds anything
    pub fn stored_actual(&self) -> Option<&str> {
        self.actual.as_deref().filter(|s| !s.is_empty())
    }

    /// Justification column: explicit justification, then notes
    pub fn justification_text(&self) -> &str {
        self.justification
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.notes.as_deref())
            .unwrap_or("")
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Direction of a functional case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Conversion is expected to work; enforced outside discovery mode
    Positive,
    /// Documents a known limitation; recorded only
    Negative,
    /// Neither tag present; scored tolerantly, never enforced
    Neutral,
}

/// How a case is executed and reported, chosen once at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Functional(Polarity),
    /// UI-tagged case observed through the stabilization loop, never scored
    UiStabilization,
    /// The distinguished case that checks incremental updates while typing
    UiRealtime,
}

impl Scenario {
    /// Tag a case from its category (case-insensitive) and id.
    pub fn select(case: &TestCase, realtime_case: &str) -> Self {
        let category = case.category.to_lowercase();
        if category.contains("ui") {
            if case.id == realtime_case {
                Scenario::UiRealtime
            } else {
                Scenario::UiStabilization
            }
        } else if category.contains("negative") {
            Scenario::Functional(Polarity::Negative)
        } else if category.contains("positive") {
            Scenario::Functional(Polarity::Positive)
        } else {
            Scenario::Functional(Polarity::Neutral)
        }
    }

    pub fn is_ui(&self) -> bool {
        matches!(self, Scenario::UiStabilization | Scenario::UiRealtime)
    }

    /// Only positive functional cases get the long budget and enforcement
    pub fn is_positive_functional(&self) -> bool {
        matches!(self, Scenario::Functional(Polarity::Positive))
    }

    /// Group label used in summaries
    pub fn group(&self) -> &'static str {
        match self {
            Scenario::Functional(Polarity::Positive) => "positive",
            Scenario::Functional(Polarity::Negative) => "negative",
            Scenario::Functional(Polarity::Neutral) => "neutral",
            Scenario::UiStabilization => "ui",
            Scenario::UiRealtime => "ui_realtime",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.group())
    }
}

/// A test case paired with its scenario tag
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioCase {
    pub case: TestCase,
    pub scenario: Scenario,
}

impl ScenarioCase {
    pub fn new(case: TestCase, realtime_case: &str) -> Self {
        let scenario = Scenario::select(&case, realtime_case);
        Self { case, scenario }
    }

    pub fn id(&self) -> &str {
        &self.case.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_select_by_category() {
        let pos = TestCase::new("Pos_Fun_0001", "Positive Functional", "mama", "I");
        let neg = TestCase::new("Neg_Fun_0001", "negative functional", "", "");
        let plain = TestCase::new("X_0001", "functional", "a", "b");
        assert_eq!(Scenario::select(&pos, "Pos_UI_0001"), Scenario::Functional(Polarity::Positive));
        assert_eq!(Scenario::select(&neg, "Pos_UI_0001"), Scenario::Functional(Polarity::Negative));
        assert_eq!(Scenario::select(&plain, "Pos_UI_0001"), Scenario::Functional(Polarity::Neutral));
    }

    #[test]
    fn test_scenario_select_ui() {
        let realtime = TestCase::new("Pos_UI_0001", "Positive UI", "mama", "");
        let other = TestCase::new("Neg_UI_0001", "Negative UI", "", "");
        assert_eq!(Scenario::select(&realtime, "Pos_UI_0001"), Scenario::UiRealtime);
        assert_eq!(Scenario::select(&other, "Pos_UI_0001"), Scenario::UiStabilization);
    }

    #[test]
    fn test_category_case_is_ignored() {
        let a = TestCase::new("A", "NEGATIVE", "x", "y");
        let b = TestCase::new("A", "negative", "x", "y");
        assert_eq!(Scenario::select(&a, ""), Scenario::select(&b, ""));
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let json = r#"{"id":"Pos_Fun_0001","name":"n","category":"positive","input":"a","expected":"b","owner":"qa"}"#;
        let case: TestCase = serde_json::from_str(json).unwrap();
        assert_eq!(case.extra.get("owner").and_then(|v| v.as_str()), Some("qa"));
        let back = serde_json::to_value(&case).unwrap();
        assert_eq!(back["owner"], "qa");
        assert!(back.get("actual").is_none());
    }

    #[test]
    fn test_null_text_fields_read_as_empty() {
        let json = r#"{"id":"Neg_Fun_0002","category":null,"input":null,"expected":null}"#;
        let case: TestCase = serde_json::from_str(json).unwrap();
        assert_eq!(case.category, "");
        assert_eq!(case.input, "");
        assert_eq!(case.expected, "");
    }

    #[test]
    fn test_justification_falls_back_to_notes() {
        let mut case = TestCase::new("A", "", "", "");
        case.notes = Some("polite request".to_string());
        assert_eq!(case.justification_text(), "polite request");
        case.justification = Some("explicit".to_string());
        assert_eq!(case.justification_text(), "explicit");
    }
}
