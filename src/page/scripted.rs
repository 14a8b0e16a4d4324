//! Deterministic in-memory page for exercising the observation engine
//! without a browser.
//!
//! Output is produced either from a timeline (text changes at fixed offsets
//! after the input is committed) or by rendering the current input with a
//! function. Time comes from a shared [`Clock`], normally a [`ManualClock`],
//! so sampling loops and typing delays run instantly.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use super::driver::PageDriver;
use super::types::{InputEvent, PageError, PageResult};
use crate::observe::clock::{Clock, ManualClock};

/// Shape of the DOM element holding the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRegion {
    /// A textarea/input whose value carries the text
    Editable,
    /// A read-only container read through its rendered text
    ReadOnly,
    /// Rendered text unavailable, raw text content available
    TextOnly,
    /// No rendered text and no text content
    Empty,
    /// Not attached to the document
    Detached,
}

/// What the input field must see before an echo page re-renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reactivity {
    /// Every fill, keystroke and dispatched event
    Typing,
    /// Only explicit key presses
    KeyPress,
}

/// How the page computes its output
pub enum OutputModel {
    Timeline {
        baseline: String,
        /// `(ms after commit, text)`, sorted by offset
        steps: Vec<(u64, String)>,
    },
    Echo {
        render: Box<dyn Fn(&str) -> String + Send>,
        reacts_to: Reactivity,
        rendered_input: String,
    },
}

/// A scripted [`PageDriver`]
pub struct ScriptedPage {
    clock: Arc<dyn Clock>,
    model: OutputModel,
    region: OutputRegion,
    input: String,
    committed_at: Option<u64>,
    fixed_output: Option<String>,
    /// `[from, to)` offsets after commit during which reads fail
    read_outages: Vec<(u64, u64)>,
    nav_failures: VecDeque<String>,
    options: HashMap<String, bool>,
    content_fails: bool,
    /// URLs successfully visited, in order
    pub visits: Vec<String>,
    /// Events dispatched on the input field, in order
    pub events: Vec<InputEvent>,
    /// Keys pressed on the input field, in order
    pub keys: Vec<String>,
    /// Number of output reads attempted
    pub reads: usize,
}

impl ScriptedPage {
    fn with_model(model: OutputModel) -> Self {
        Self {
            clock: Arc::new(ManualClock::new()),
            model,
            region: OutputRegion::ReadOnly,
            input: String::new(),
            committed_at: None,
            fixed_output: None,
            read_outages: Vec::new(),
            nav_failures: VecDeque::new(),
            options: HashMap::new(),
            content_fails: false,
            visits: Vec::new(),
            events: Vec::new(),
            keys: Vec::new(),
            reads: 0,
        }
    }

    /// Output equals `baseline` until the input is filled, then follows `steps`
    pub fn timeline(baseline: impl Into<String>, steps: Vec<(u64, &str)>) -> Self {
        let mut steps: Vec<(u64, String)> = steps
            .into_iter()
            .map(|(at, text)| (at, text.to_string()))
            .collect();
        steps.sort_by_key(|(at, _)| *at);
        Self::with_model(OutputModel::Timeline {
            baseline: baseline.into(),
            steps,
        })
    }

    /// Output is `render(input)`, refreshed according to `reacts_to`
    pub fn echo<F>(render: F, reacts_to: Reactivity) -> Self
    where
        F: Fn(&str) -> String + Send + 'static,
    {
        Self::with_model(OutputModel::Echo {
            render: Box::new(render),
            reacts_to,
            rendered_input: String::new(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn region(mut self, region: OutputRegion) -> Self {
        self.region = region;
        self
    }

    /// Fail reads between `from` and `to` ms after the input is committed
    pub fn read_outage(mut self, from: u64, to: u64) -> Self {
        self.read_outages.push((from, to));
        self
    }

    /// Fail the next navigation with `message`; may be queued repeatedly
    pub fn fail_navigation(mut self, message: impl Into<String>) -> Self {
        self.nav_failures.push_back(message.into());
        self
    }

    /// Offer a labelled checkbox in the given state
    pub fn with_option(mut self, label: impl Into<String>, enabled: bool) -> Self {
        self.options.insert(label.into(), enabled);
        self
    }

    pub fn failing_content(mut self) -> Self {
        self.content_fails = true;
        self
    }

    /// Pin the output to `text`, ignoring the model
    pub fn set_output(&mut self, text: impl Into<String>) {
        self.fixed_output = Some(text.into());
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn option(&self, label: &str) -> Option<bool> {
        self.options.get(label).copied()
    }

    fn since_commit(&self) -> Option<u64> {
        self.committed_at.map(|t| self.clock.elapsed_since(t))
    }

    fn current_output(&self) -> String {
        if let Some(fixed) = &self.fixed_output {
            return fixed.clone();
        }
        match &self.model {
            OutputModel::Timeline { baseline, steps } => match self.since_commit() {
                None => baseline.clone(),
                Some(elapsed) => steps
                    .iter()
                    .rev()
                    .find(|(at, _)| *at <= elapsed)
                    .map(|(_, text)| text.clone())
                    .unwrap_or_else(|| baseline.clone()),
            },
            OutputModel::Echo {
                render,
                rendered_input,
                ..
            } => render(rendered_input),
        }
    }

    fn rerender(&mut self, trigger: Reactivity) {
        if let OutputModel::Echo {
            reacts_to,
            rendered_input,
            ..
        } = &mut self.model
        {
            if *reacts_to == Reactivity::Typing || trigger == Reactivity::KeyPress {
                *rendered_input = self.input.clone();
            }
        }
    }

    fn check_readable(&mut self) -> PageResult<()> {
        self.reads += 1;
        if self.region == OutputRegion::Detached {
            return Err(PageError::ElementNotFound("output region".to_string()));
        }
        if let Some(elapsed) = self.since_commit() {
            if self
                .read_outages
                .iter()
                .any(|(from, to)| (*from..*to).contains(&elapsed))
            {
                return Err(PageError::Script("output region detached".to_string()));
            }
        }
        Ok(())
    }
}

impl PageDriver for ScriptedPage {
    fn goto(&mut self, url: &str) -> PageResult<()> {
        if let Some(message) = self.nav_failures.pop_front() {
            return Err(PageError::Navigation {
                url: url.to_string(),
                message,
            });
        }
        self.visits.push(url.to_string());
        self.input.clear();
        self.committed_at = None;
        if let OutputModel::Echo { rendered_input, .. } = &mut self.model {
            rendered_input.clear();
        }
        Ok(())
    }

    fn wait_for_output(&mut self, timeout: Duration) -> PageResult<()> {
        if self.region == OutputRegion::Detached {
            self.clock.sleep(timeout);
            return Err(PageError::Timeout("output region".to_string()));
        }
        Ok(())
    }

    fn output_value(&mut self) -> PageResult<Option<String>> {
        self.check_readable()?;
        match self.region {
            OutputRegion::Editable => Ok(Some(self.current_output())),
            OutputRegion::ReadOnly | OutputRegion::Empty => Ok(None),
            _ => Err(PageError::Script("cannot inspect output element".to_string())),
        }
    }

    fn output_inner_text(&mut self) -> PageResult<String> {
        self.check_readable()?;
        match self.region {
            OutputRegion::Editable | OutputRegion::ReadOnly => Ok(self.current_output()),
            _ => Err(PageError::Script("innerText unavailable".to_string())),
        }
    }

    fn output_text_content(&mut self) -> PageResult<Option<String>> {
        self.check_readable()?;
        match self.region {
            OutputRegion::Empty => Ok(None),
            _ => Ok(Some(self.current_output())),
        }
    }

    fn click_input(&mut self) -> PageResult<()> {
        Ok(())
    }

    fn fill_input(&mut self, text: &str) -> PageResult<()> {
        self.input = text.to_string();
        self.committed_at = Some(self.clock.now_ms());
        self.fixed_output = None;
        self.rerender(Reactivity::Typing);
        Ok(())
    }

    fn type_input(&mut self, text: &str, key_delay: Duration) -> PageResult<()> {
        for ch in text.chars() {
            self.input.push(ch);
            self.rerender(Reactivity::Typing);
            self.clock.sleep(key_delay);
        }
        Ok(())
    }

    fn press_key(&mut self, key: &str) -> PageResult<()> {
        if key.eq_ignore_ascii_case("backspace") {
            self.input.pop();
        }
        self.keys.push(key.to_string());
        self.rerender(Reactivity::KeyPress);
        Ok(())
    }

    fn dispatch_input_events(&mut self, events: &[InputEvent]) -> PageResult<()> {
        self.events.extend_from_slice(events);
        self.rerender(Reactivity::Typing);
        Ok(())
    }

    fn set_toggle(&mut self, label: &str, enabled: bool) -> PageResult<bool> {
        match self.options.get_mut(label) {
            Some(state) => {
                *state = enabled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn content(&mut self) -> PageResult<String> {
        if self.content_fails {
            return Err(PageError::Browser("page crashed".to_string()));
        }
        Ok(format!(
            "<html><body><textarea>{}</textarea><div class=\"bg-slate-50\">{}</div></body></html>",
            self.input,
            self.current_output()
        ))
    }

    fn source_type(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_follows_commit_time() {
        let clock = Arc::new(ManualClock::new());
        let mut page = ScriptedPage::timeline("old", vec![(500, "new"), (100, "mid")])
            .with_clock(clock.clone());

        assert_eq!(page.output_inner_text().unwrap(), "old");
        page.fill_input("mama").unwrap();
        assert_eq!(page.output_inner_text().unwrap(), "old");
        clock.advance(Duration::from_millis(100));
        assert_eq!(page.output_inner_text().unwrap(), "mid");
        clock.advance(Duration::from_millis(400));
        assert_eq!(page.output_inner_text().unwrap(), "new");
    }

    #[test]
    fn test_echo_key_press_reactivity() {
        let mut page = ScriptedPage::echo(|s| s.to_uppercase(), Reactivity::KeyPress);
        page.type_input("ab", Duration::from_millis(10)).unwrap();
        assert_eq!(page.output_inner_text().unwrap(), "");
        page.press_key("Backspace").unwrap();
        assert_eq!(page.output_inner_text().unwrap(), "A");
    }

    #[test]
    fn test_navigation_failures_are_queued() {
        let mut page = ScriptedPage::timeline("", vec![]).fail_navigation("net::ERR_NAME_NOT_RESOLVED");
        assert!(page.goto("https://example.test/").is_err());
        assert!(page.goto("https://example.test/").is_ok());
        assert_eq!(page.visits, vec!["https://example.test/".to_string()]);
    }

    #[test]
    fn test_toggle_only_touches_known_options() {
        let mut page = ScriptedPage::timeline("", vec![]).with_option("Word Autocorrect", false);
        assert!(page.set_toggle("Word Autocorrect", true).unwrap());
        assert_eq!(page.option("Word Autocorrect"), Some(true));
        assert!(!page.set_toggle("Dark mode", true).unwrap());
    }
}
