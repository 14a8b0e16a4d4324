//! Descriptive columns of the report.
//!
//! The "what is covered" column is inferred from keywords in a case's id,
//! name, input and notes. Each facet is an ordered rule list: the first rule
//! that applies wins, and the list's fallback is used when none does. The
//! result is advisory text only and never feeds into a verdict.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cases::TestCase;

/// Bullet prefixed to each line of the coverage description
pub const BULLET: &str = "• ";

/// Input length class, counted in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthBucket {
    /// Up to 30 characters
    S,
    /// 31 to 299 characters
    M,
    /// 300 characters or more
    L,
}

impl LengthBucket {
    pub fn of(input: &str) -> Self {
        match input.chars().count() {
            0..=30 => LengthBucket::S,
            31..=299 => LengthBucket::M,
            _ => LengthBucket::L,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LengthBucket::S => "S",
            LengthBucket::M => "M",
            LengthBucket::L => "L",
        }
    }

    pub fn range_label(&self) -> &'static str {
        match self {
            LengthBucket::S => "≤30 characters",
            LengthBucket::M => "31–299 characters",
            LengthBucket::L => "≥300 characters",
        }
    }
}

impl fmt::Display for LengthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Length code of a case: the stored override, else computed from the input
pub fn length_code(case: &TestCase) -> String {
    case.input_length_type
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| LengthBucket::of(&case.input).code().to_string())
}

/// Range label for a length code; unknown codes read as the long bucket
fn range_label_for(code: &str) -> &'static str {
    match code {
        "S" => LengthBucket::S.range_label(),
        "M" => LengthBucket::M.range_label(),
        _ => LengthBucket::L.range_label(),
    }
}

/// Lowercased text a rule can look at
#[derive(Debug, Clone)]
pub struct CaseFacts<'a> {
    pub id: String,
    pub name: String,
    pub category: String,
    pub notes: String,
    pub input: String,
    /// Input as written, for case-sensitive checks
    pub raw_input: &'a str,
}

impl<'a> CaseFacts<'a> {
    pub fn of(case: &'a TestCase) -> Self {
        Self {
            id: case.id.to_lowercase(),
            name: case.name.to_lowercase(),
            category: case.category.to_lowercase(),
            notes: case.notes.as_deref().unwrap_or("").to_lowercase(),
            input: case.input.to_lowercase(),
            raw_input: &case.input,
        }
    }
}

/// One labelled predicate
pub struct Rule {
    pub label: &'static str,
    pub applies: fn(&CaseFacts<'_>) -> bool,
}

/// Rules tried in order; first match wins
pub struct RuleList {
    pub rules: &'static [Rule],
    pub fallback: &'static str,
}

impl RuleList {
    pub fn infer(&self, facts: &CaseFacts<'_>) -> &'static str {
        self.rules
            .iter()
            .find(|rule| (rule.applies)(facts))
            .map(|rule| rule.label)
            .unwrap_or(self.fallback)
    }
}

static PUNCTUATION_OR_SYMBOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[!?.“"()\[\]{}:;,@#$%^&*_+=~`<>|\\/]"#).expect("punctuation pattern is valid")
});

fn has_punctuation(facts: &CaseFacts<'_>) -> bool {
    PUNCTUATION_OR_SYMBOL.is_match(facts.raw_input)
}

pub static INPUT_DOMAIN: RuleList = RuleList {
    rules: &[
        Rule {
            label: "Empty/cleared input handling",
            applies: |f| f.id.starts_with("ui_") || f.name.contains("ui"),
        },
        Rule {
            label: "Empty/cleared input handling",
            applies: |f| f.input.trim().is_empty() || f.name.contains("empty") || f.notes.contains("cleared"),
        },
        Rule {
            label: "Formatting (spaces / line breaks / paragraph)",
            applies: |f| {
                f.input.contains('\n')
                    || f.name.contains("newline")
                    || f.notes.contains("line breaks")
                    || f.notes.contains("paragraph")
            },
        },
        Rule {
            label: "Punctuation / numbers",
            applies: has_punctuation,
        },
        Rule {
            label: "Mixed Singlish + English",
            applies: |f| {
                f.notes.contains("mixed")
                    || f.input.contains("meeting")
                    || f.input.contains("github")
                    || f.input.contains("zoom")
            },
        },
        Rule {
            label: "Greeting / request / response",
            applies: |f| {
                f.name.contains("greeting")
                    || f.name.contains("request")
                    || f.name.contains("apology")
                    || f.notes.contains("polite")
            },
        },
        Rule {
            label: "Slang / informal language",
            applies: |f| f.notes.contains("slang") || f.name.contains("slang") || f.input.contains("machan"),
        },
    ],
    fallback: "Daily language usage",
};

pub static GRAMMAR_FOCUS: RuleList = RuleList {
    rules: &[
        Rule {
            label: "Interrogative (question)",
            applies: |f| f.name.contains("question") || f.notes.contains("question") || f.input.contains('?'),
        },
        Rule {
            label: "Imperative (command)",
            applies: |f| f.name.contains("imperative") || f.name.contains("command") || f.notes.contains("imperative"),
        },
        Rule {
            label: "Negation (negative form)",
            applies: |f| {
                f.name.contains("negative")
                    || f.notes.contains("negation")
                    || f.input.contains(" nae")
                    || f.input.contains(" na ")
            },
        },
        Rule {
            label: "Past tense",
            applies: |f| f.name.contains("past") || f.notes.contains("past"),
        },
        Rule {
            label: "Future tense",
            applies: |f| f.name.contains("future") || f.notes.contains("future") || f.input.contains("heta"),
        },
        Rule {
            label: "Compound sentence",
            applies: |f| f.name.contains("compound"),
        },
    ],
    fallback: "Simple sentence",
};

pub static QUALITY_FOCUS: RuleList = RuleList {
    rules: &[
        Rule {
            label: "Real-time output update behavior",
            applies: |f| {
                f.category.contains("ui")
                    && (f.name.contains("clear") || f.notes.contains("clear") || f.notes.contains("real-time"))
            },
        },
        Rule {
            label: "Error handling / input validation",
            applies: |f| f.category.contains("ui"),
        },
        Rule {
            label: "Robustness validation",
            applies: |f| f.category.contains("negative"),
        },
    ],
    fallback: "Accuracy validation",
};

/// Coverage column: the stored description, else four inferred bullet lines
pub fn covered_text(case: &TestCase) -> String {
    if let Some(covered) = case.covered.as_deref().filter(|s| !s.is_empty()) {
        return covered.to_string();
    }

    let facts = CaseFacts::of(case);
    let code = length_code(case);
    let lines = [
        INPUT_DOMAIN.infer(&facts).to_string(),
        GRAMMAR_FOCUS.infer(&facts).to_string(),
        format!("{} ({})", code, range_label_for(&code)),
        QUALITY_FOCUS.infer(&facts).to_string(),
    ];
    lines
        .iter()
        .map(|line| format!("{}{}", BULLET, line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_length_bucket_boundaries() {
        assert_eq!(LengthBucket::of(&"a".repeat(30)), LengthBucket::S);
        assert_eq!(LengthBucket::of(&"a".repeat(31)), LengthBucket::M);
        assert_eq!(LengthBucket::of(&"a".repeat(299)), LengthBucket::M);
        assert_eq!(LengthBucket::of(&"a".repeat(300)), LengthBucket::L);
    }

    #[test]
    fn test_length_bucket_counts_characters_not_bytes() {
        let sinhala = "ගෙ".repeat(15);
        assert_eq!(sinhala.chars().count(), 30);
        assert!(sinhala.len() > 30);
        assert_eq!(LengthBucket::of(&sinhala), LengthBucket::S);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // Both "question" and "past" apply; the earlier rule is reported.
        let case = TestCase::new("Pos_Fun_0007", "positive", "oyaa iiye aavadha?", "").name("Past question");
        assert_eq!(GRAMMAR_FOCUS.infer(&CaseFacts::of(&case)), "Interrogative (question)");
    }

    #[test]
    fn test_domain_rules() {
        let empty = TestCase::new("Neg_Fun_0001", "negative", "", "");
        let mixed = TestCase::new("Pos_Fun_0010", "positive", "Zoom meeting eka", "");
        let punct = TestCase::new("Pos_Fun_0011", "positive", "mama 2.30ta enavaa", "");
        let plain = TestCase::new("Pos_Fun_0012", "positive", "mama gedhara yanavaa", "");
        assert_eq!(INPUT_DOMAIN.infer(&CaseFacts::of(&empty)), "Empty/cleared input handling");
        assert_eq!(INPUT_DOMAIN.infer(&CaseFacts::of(&mixed)), "Mixed Singlish + English");
        assert_eq!(INPUT_DOMAIN.infer(&CaseFacts::of(&punct)), "Punctuation / numbers");
        assert_eq!(INPUT_DOMAIN.infer(&CaseFacts::of(&plain)), "Daily language usage");
    }

    #[test]
    fn test_quality_rules() {
        let mut ui = TestCase::new("Pos_UI_0001", "Positive UI", "mama", "");
        ui.notes = Some("Real-time update while typing".to_string());
        let negative = TestCase::new("Neg_Fun_0002", "negative functional", "x", "y");
        assert_eq!(QUALITY_FOCUS.infer(&CaseFacts::of(&ui)), "Real-time output update behavior");
        assert_eq!(QUALITY_FOCUS.infer(&CaseFacts::of(&negative)), "Robustness validation");
    }

    #[test]
    fn test_covered_text_bullets() {
        let case = TestCase::new("Pos_Fun_0001", "positive functional", "mama heta gedhara yanavaa", "I will go home tomorrow");
        assert_eq!(
            covered_text(&case),
            "• Daily language usage\n• Future tense\n• S (≤30 characters)\n• Accuracy validation"
        );
    }

    #[test]
    fn test_stored_covered_and_length_override() {
        let mut case = TestCase::new("Pos_Fun_0002", "positive", "mama", "");
        case.input_length_type = Some("M".to_string());
        assert!(covered_text(&case).contains("• M (31–299 characters)"));
        case.covered = Some("custom".to_string());
        assert_eq!(covered_text(&case), "custom");
    }
}
