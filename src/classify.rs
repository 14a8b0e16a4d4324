//! Outcome classification.
//!
//! A verdict is computed from `(expected, observed, category)` with exactly
//! one of four policies, chosen in this order:
//!
//! 1. **Unscored**: the category mentions "ui".
//! 2. **Empty expectation**: trimmed `expected` is empty; pass iff trimmed
//!    `observed` is empty too.
//! 3. **Strict negative**: the category mentions "negative"; pass iff
//!    `observed` contains the whole trimmed `expected` verbatim.
//! 4. **Tolerant**: pass iff `observed` contains each significant token of
//!    `expected`, in any order. Without tokens, whole-string containment.
//!
//! Negative cases document known limitations of the tool, so they keep the
//! verbatim bar while everything else is tolerant. The two policies are not
//! meant to be unified.
//!
//! Token derivation lives here and nowhere else: the run-time assertion and
//! the report both call [`significant_tokens`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of significant tokens checked
pub const MAX_TOKENS: usize = 3;

/// Characters stripped before splitting `expected` into tokens
const STRIPPED_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', '(', ')', '[', ']', '{', '}', ':', ';', '"', '\'', '\u{201C}', '\u{201D}',
];

/// Outcome of a single case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
    /// Recorded but excluded from pass/fail aggregation
    Unscored,
}

impl Verdict {
    pub fn from_bool(pass: bool) -> Self {
        if pass { Verdict::Pass } else { Verdict::Fail }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "Pass",
            Verdict::Fail => "Fail",
            Verdict::Unscored => "",
        }
    }

    pub fn is_scored(&self) -> bool {
        !matches!(self, Verdict::Unscored)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rule decides a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Unscored,
    EmptyExpectation,
    StrictNegative,
    TolerantTokens,
}

impl Policy {
    /// Pick the policy for a case; category matching is case-insensitive.
    pub fn select(expected: &str, category: &str) -> Self {
        let category = category.to_lowercase();
        if category.contains("ui") {
            Policy::Unscored
        } else if expected.trim().is_empty() {
            Policy::EmptyExpectation
        } else if category.contains("negative") {
            Policy::StrictNegative
        } else {
            Policy::TolerantTokens
        }
    }
}

/// Derive up to [`MAX_TOKENS`] leading content words from `expected`.
///
/// Line breaks become spaces, runs of stripped punctuation become spaces,
/// and the first non-empty whitespace-separated words are kept in order.
pub fn derive_tokens(expected: &str) -> Vec<String> {
    expected
        .split(|c: char| c == '\r' || c == '\n' || STRIPPED_PUNCTUATION.contains(&c))
        .flat_map(str::split_whitespace)
        .take(MAX_TOKENS)
        .map(str::to_string)
        .collect()
}

/// Tokens to check: a non-empty explicit list wins over derivation.
pub fn significant_tokens(expected: &str, explicit: Option<&[String]>) -> Vec<String> {
    match explicit {
        Some(tokens) if !tokens.is_empty() => tokens.to_vec(),
        _ => derive_tokens(expected),
    }
}

/// True when every token occurs in `observed`; without tokens, when the whole
/// trimmed `expected` does.
pub fn tokens_present(expected: &str, observed: &str, tokens: &[String]) -> bool {
    if tokens.is_empty() {
        observed.contains(expected.trim())
    } else {
        tokens.iter().all(|t| observed.contains(t.as_str()))
    }
}

/// Classify with tokens derived from `expected`
pub fn classify(expected: &str, observed: &str, category: &str) -> Verdict {
    classify_with_tokens(expected, observed, category, None)
}

/// Classify, honoring an explicit token list for the tolerant policy
pub fn classify_with_tokens(
    expected: &str,
    observed: &str,
    category: &str,
    explicit_tokens: Option<&[String]>,
) -> Verdict {
    let expected = expected.trim();
    let observed = observed.trim();

    match Policy::select(expected, category) {
        Policy::Unscored => Verdict::Unscored,
        Policy::EmptyExpectation => Verdict::from_bool(observed.is_empty()),
        Policy::StrictNegative => Verdict::from_bool(observed.contains(expected)),
        Policy::TolerantTokens => {
            let tokens = significant_tokens(expected, explicit_tokens);
            Verdict::from_bool(tokens_present(expected, observed, &tokens))
        }
    }
}
