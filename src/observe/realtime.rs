//! Real-time update probe.
//!
//! Instead of one input/output round trip, the distinguished UI case types a
//! short prefix key by key, checks the output reacts, then types a
//! continuation and looks for specific words. Findings are recorded as notes;
//! a slow or partial reaction is never an error.

use std::time::Duration;

use tracing::{debug, warn};

use super::clock::Clock;
use super::engine::ObservedResult;
use crate::page::{InputEvent, PageDriver, PageResult, read_output_text};

/// Script of the probe
#[derive(Debug, Clone)]
pub struct RealtimeProbe {
    pub prefix: String,
    pub prefix_key_delay: Duration,
    /// Delay used for the single space typed when the page has not reacted
    pub nudge_key_delay: Duration,
    pub continuation: String,
    pub continuation_key_delay: Duration,
    /// Substrings the final output should contain
    pub expected_substrings: Vec<String>,
    /// Upper bound for each polling step
    pub poll_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RealtimeProbe {
    fn default() -> Self {
        Self {
            prefix: "mama".to_string(),
            prefix_key_delay: Duration::from_millis(80),
            nudge_key_delay: Duration::from_millis(30),
            continuation: " gedhara yanavaa".to_string(),
            continuation_key_delay: Duration::from_millis(50),
            expected_substrings: vec!["ගෙදර".to_string(), "යනවා".to_string()],
            poll_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Result of a probe run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeOutcome {
    pub observed: ObservedResult,
    /// Output became non-empty while typing the prefix
    pub responded: bool,
    /// Expected substrings never seen in the output
    pub missing: Vec<String>,
}

impl RealtimeOutcome {
    /// Human-readable findings, `None` when everything showed up
    pub fn notes(&self) -> Option<String> {
        let mut notes = Vec::new();
        if !self.responded {
            notes.push("output stayed empty while typing".to_string());
        }
        if !self.missing.is_empty() {
            notes.push(format!("missing from output: {}", self.missing.join(", ")));
        }
        if notes.is_empty() { None } else { Some(notes.join("; ")) }
    }
}

impl RealtimeProbe {
    pub fn run(
        &self,
        page: &mut dyn PageDriver,
        clock: &dyn Clock,
        id: &str,
    ) -> PageResult<RealtimeOutcome> {
        let start = clock.now_ms();

        page.fill_input("")?;
        page.click_input()?;
        page.type_input(&self.prefix, self.prefix_key_delay)?;
        page.dispatch_input_events(&InputEvent::NUDGE)?;

        if read_output_text(page).unwrap_or_default().is_empty() {
            debug!(id, "no reaction to prefix yet, nudging");
            page.type_input(" ", self.nudge_key_delay)?;
            page.press_key("Backspace")?;
        }

        let responded = self
            .poll_until(page, clock, |text| !text.is_empty())
            .is_some();
        if !responded {
            warn!(id, "output stayed empty after typing the prefix");
        }

        page.type_input(&self.continuation, self.continuation_key_delay)?;
        page.dispatch_input_events(&InputEvent::NUDGE)?;

        let mut missing = Vec::new();
        for expected in &self.expected_substrings {
            if self
                .poll_until(page, clock, |text| text.contains(expected.as_str()))
                .is_none()
            {
                warn!(id, expected = %expected, "expected text never appeared");
                missing.push(expected.clone());
            }
        }

        let text = read_output_text(page).unwrap_or_default();
        let elapsed_ms = clock.elapsed_since(start);
        let settled = responded && missing.is_empty();

        Ok(RealtimeOutcome {
            observed: ObservedResult {
                id: id.to_string(),
                text,
                settled,
                elapsed_ms,
                stable_at_ms: settled.then_some(elapsed_ms),
            },
            responded,
            missing,
        })
    }

    /// Read until `accept` holds, giving up after `poll_timeout`
    fn poll_until<F>(&self, page: &mut dyn PageDriver, clock: &dyn Clock, accept: F) -> Option<String>
    where
        F: Fn(&str) -> bool,
    {
        let start = clock.now_ms();
        let timeout_ms = self.poll_timeout.as_millis() as u64;
        loop {
            if let Ok(text) = read_output_text(page) {
                if accept(&text) {
                    return Some(text);
                }
            }
            if clock.elapsed_since(start) >= timeout_ms {
                return None;
            }
            clock.sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::observe::clock::ManualClock;
    use crate::page::{Reactivity, ScriptedPage};

    fn transliterate(input: &str) -> String {
        input
            .split_whitespace()
            .map(|word| match word {
                "mama" => "මම",
                "gedhara" => "ගෙදර",
                "yanavaa" => "යනවා",
                other => other,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_live_page_passes_probe() {
        let clock = Arc::new(ManualClock::new());
        let mut page = ScriptedPage::echo(transliterate, Reactivity::Typing).with_clock(clock.clone());

        let outcome = RealtimeProbe::default()
            .run(&mut page, clock.as_ref(), "Pos_UI_0001")
            .unwrap();

        assert!(outcome.responded);
        assert!(outcome.missing.is_empty());
        assert_eq!(outcome.observed.text, "මම ගෙදර යනවා");
        assert_eq!(outcome.notes(), None);
        assert!(page.keys.is_empty());
    }

    #[test]
    fn test_sluggish_page_is_nudged() {
        let clock = Arc::new(ManualClock::new());
        let mut page = ScriptedPage::echo(transliterate, Reactivity::KeyPress).with_clock(clock.clone());

        let outcome = RealtimeProbe::default()
            .run(&mut page, clock.as_ref(), "Pos_UI_0001")
            .unwrap();

        assert_eq!(page.keys, vec!["Backspace".to_string()]);
        assert!(outcome.responded);
        // Key-press-only page never sees the continuation rendered.
        assert_eq!(
            outcome.missing,
            vec!["ගෙදර".to_string(), "යනවා".to_string()]
        );
        assert_eq!(outcome.observed.text, "මම");
        assert!(!outcome.observed.settled);
    }

    #[test]
    fn test_missing_words_become_notes() {
        let clock = Arc::new(ManualClock::new());
        let mut page = ScriptedPage::echo(|s| s.replace("mama", "මම"), Reactivity::Typing)
            .with_clock(clock.clone());

        let outcome = RealtimeProbe::default()
            .run(&mut page, clock.as_ref(), "Pos_UI_0001")
            .unwrap();

        assert_eq!(outcome.missing.len(), 2);
        assert_eq!(
            outcome.notes().as_deref(),
            Some("missing from output: ගෙදර, යනවා")
        );
        assert!(clock.now_ms() >= 60_000);
    }
}
