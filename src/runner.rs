//! Suite execution and run results.
//!
//! Each case is navigated, observed, persisted and classified on its own
//! page. Workers pull case indexes from a shared counter; each worker owns a
//! driver built by the caller's factory, so no page is ever shared.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactStore;
use crate::cases::{Scenario, ScenarioCase};
use crate::classify::{Verdict, classify_with_tokens, tokens_present};
use crate::config::{Config, TimingSettings};
use crate::navigate::{RetryPolicy, goto_with_retry};
use crate::observe::{
    Clock, ObservedResult, RealtimeProbe, StabilityTiming, SystemClock, budget_for, observe,
};
use crate::page::{PageDriver, PageResult};

/// Result of a single case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub id: String,
    pub name: String,
    pub scenario: Scenario,
    pub verdict: Verdict,

    /// What was read from the page (None if the case never got that far)
    pub observed: Option<ObservedResult>,

    /// Enforced assertion that did not hold
    pub assertion_failure: Option<String>,

    /// Navigation or page error that aborted the case
    pub error: Option<String>,

    /// Findings that do not affect the verdict
    pub notes: Option<String>,

    pub observed_path: Option<PathBuf>,
    pub debug_path: Option<PathBuf>,
}

impl CaseOutcome {
    fn new(case: &ScenarioCase) -> Self {
        Self {
            id: case.case.id.clone(),
            name: case.case.name.clone(),
            scenario: case.scenario,
            verdict: Verdict::Unscored,
            observed: None,
            assertion_failure: None,
            error: None,
            notes: None,
            observed_path: None,
            debug_path: None,
        }
    }

    /// Whether this case fails the run
    pub fn is_failure(&self) -> bool {
        self.error.is_some() || self.assertion_failure.is_some()
    }
}

/// Where and how a run happened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub host: String,
    pub site_url: String,
    pub discovery: bool,
    pub workers: usize,
}

/// Verdict counts over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub unscored: usize,
    pub errors: usize,
    pub assertion_failures: usize,
}

/// Result of a complete run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// No case errored and no enforced assertion failed
    pub success: bool,
    pub manifest: RunManifest,
    pub summary: RunSummary,
    pub cases: Vec<CaseOutcome>,
}

impl RunResult {
    fn from_outcomes(manifest: RunManifest, cases: Vec<CaseOutcome>) -> Self {
        let mut summary = RunSummary {
            total: cases.len(),
            ..RunSummary::default()
        };
        for case in &cases {
            if case.error.is_some() {
                summary.errors += 1;
                continue;
            }
            match case.verdict {
                Verdict::Pass => summary.passed += 1,
                Verdict::Fail => summary.failed += 1,
                Verdict::Unscored => summary.unscored += 1,
            }
            if case.assertion_failure.is_some() {
                summary.assertion_failures += 1;
            }
        }

        Self {
            success: !cases.iter().any(CaseOutcome::is_failure),
            manifest,
            summary,
            cases,
        }
    }
}

/// Knobs of a run, normally taken from [`Config`]
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub site_url: String,
    pub autocorrect_label: String,
    /// Observe and persist, but never enforce assertions
    pub discovery: bool,
    pub workers: usize,
    /// Run only these ids (all cases when empty)
    pub only: Vec<String>,
    pub timing: TimingSettings,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            site_url: config.site.url.clone(),
            autocorrect_label: config.site.autocorrect_label.clone(),
            discovery: config.run.discovery,
            workers: config.run.workers,
            only: Vec::new(),
            timing: config.timing.clone(),
        }
    }
}

/// Executes cases against page drivers
pub struct Runner {
    options: RunOptions,
    artifacts: ArtifactStore,
    clock: Arc<dyn Clock>,
    probe: RealtimeProbe,
}

impl Runner {
    pub fn new(options: RunOptions, artifacts: ArtifactStore) -> Self {
        Self {
            options,
            artifacts,
            clock: Arc::new(SystemClock::new()),
            probe: RealtimeProbe::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RunOptions::from_config(config),
            ArtifactStore::from_settings(&config.paths),
        )
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_probe(mut self, probe: RealtimeProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run `cases`, building one driver per worker with `make_driver`.
    ///
    /// Outcomes come back in case order regardless of which worker ran them.
    pub fn run<F>(&self, cases: &[ScenarioCase], make_driver: F) -> RunResult
    where
        F: Fn() -> PageResult<Box<dyn PageDriver>> + Sync,
    {
        let started_at = Utc::now();
        let selected: Vec<&ScenarioCase> = cases
            .iter()
            .filter(|c| self.options.only.is_empty() || self.options.only.iter().any(|id| id == c.id()))
            .collect();
        let workers = self.options.workers.clamp(1, selected.len().max(1));

        info!(cases = selected.len(), workers, discovery = self.options.discovery, "starting run");

        let next = AtomicUsize::new(0);
        let outcomes: Mutex<Vec<(usize, CaseOutcome)>> = Mutex::new(Vec::with_capacity(selected.len()));

        std::thread::scope(|scope| {
            for worker in 0..workers {
                let next = &next;
                let outcomes = &outcomes;
                let selected = &selected;
                let make_driver = &make_driver;
                scope.spawn(move || {
                    let mut driver = make_driver();
                    if let Err(err) = &driver {
                        warn!(worker, error = %err, "could not start page driver");
                    }
                    loop {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(case) = selected.get(index) else {
                            break;
                        };
                        let outcome = match driver.as_mut() {
                            Ok(page) => self.run_case(page.as_mut(), case),
                            Err(err) => {
                                let mut outcome = CaseOutcome::new(case);
                                outcome.error = Some(format!("page driver unavailable: {}", err));
                                outcome
                            }
                        };
                        if let Ok(mut guard) = outcomes.lock() {
                            guard.push((index, outcome));
                        }
                    }
                });
            }
        });

        let mut outcomes = outcomes.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        outcomes.sort_by_key(|(index, _)| *index);

        let manifest = RunManifest {
            started_at,
            finished_at: Utc::now(),
            host: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
            site_url: self.options.site_url.clone(),
            discovery: self.options.discovery,
            workers,
        };

        let result = RunResult::from_outcomes(manifest, outcomes.into_iter().map(|(_, o)| o).collect());
        info!(
            passed = result.summary.passed,
            failed = result.summary.failed,
            unscored = result.summary.unscored,
            errors = result.summary.errors,
            success = result.success,
            "run finished"
        );
        result
    }

    /// Run one case on `page`; errors are recorded on the outcome
    pub fn run_case(&self, page: &mut dyn PageDriver, case: &ScenarioCase) -> CaseOutcome {
        let mut outcome = CaseOutcome::new(case);
        info!(id = case.id(), scenario = %case.scenario, "running case");

        if let Err(err) = self.drive(page, case, &mut outcome) {
            warn!(id = case.id(), error = %err, "case aborted");
            outcome.error = Some(err.to_string());
        }
        outcome
    }

    fn drive(
        &self,
        page: &mut dyn PageDriver,
        case: &ScenarioCase,
        outcome: &mut CaseOutcome,
    ) -> PageResult<()> {
        let id = case.id();
        let timing = &self.options.timing;
        let clock = self.clock.as_ref();

        goto_with_retry(page, clock, &self.options.site_url, RetryPolicy::from_settings(timing))?;
        page.wait_for_output(timing.output_visible)?;

        match page.set_toggle(&self.options.autocorrect_label, true) {
            Ok(true) => {}
            Ok(false) => debug!(id, label = %self.options.autocorrect_label, "option not offered"),
            Err(err) => debug!(id, error = %err, "could not set option"),
        }

        let observed = match case.scenario {
            Scenario::UiRealtime => {
                let probed = self.probe.run(page, clock, id)?;
                outcome.notes = probed.notes();
                probed.observed
            }
            scenario => observe(
                page,
                clock,
                id,
                &case.case.input,
                budget_for(scenario, timing),
                StabilityTiming::from_settings(timing),
            )?,
        };

        outcome.observed_path = Some(self.artifacts.write_observed(id, &observed.text)?);
        outcome.debug_path = self.snapshot(page, id);

        outcome.verdict = classify_with_tokens(
            &case.case.expected,
            &observed.text,
            &case.case.category,
            case.case.expected_tokens.as_deref(),
        );
        if case.scenario.is_positive_functional() && !self.options.discovery {
            outcome.assertion_failure = enforce_positive(case, &observed.text);
        }

        info!(
            id,
            verdict = %outcome.verdict,
            settled = observed.settled,
            elapsed_ms = observed.elapsed_ms,
            "case observed"
        );
        outcome.observed = Some(observed);
        Ok(())
    }

    /// Save the page markup; a failure here never fails the case
    fn snapshot(&self, page: &mut dyn PageDriver, id: &str) -> Option<PathBuf> {
        let markup = match page.content() {
            Ok(markup) => markup,
            Err(err) => {
                warn!(id, error = %err, "could not capture page content");
                return None;
            }
        };
        match self.artifacts.write_debug(id, &markup) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(id, error = %err, "could not write debug snapshot");
                None
            }
        }
    }
}

/// Positive cases must produce output containing every significant token
fn enforce_positive(case: &ScenarioCase, observed: &str) -> Option<String> {
    if observed.is_empty() {
        return Some("observed output is empty".to_string());
    }

    let expected = &case.case.expected;
    let tokens = case.case.significant_tokens();
    if tokens_present(expected, observed, &tokens) {
        return None;
    }

    if tokens.is_empty() {
        Some(format!("observed output does not contain {:?}", expected.trim()))
    } else {
        let missing: Vec<&str> = tokens
            .iter()
            .map(String::as_str)
            .filter(|t| !observed.contains(t))
            .collect();
        Some(format!("observed output is missing {:?}", missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::TestCase;
    use crate::observe::ManualClock;
    use crate::page::ScriptedPage;
    use tempfile::TempDir;

    fn runner(dir: &TempDir, clock: Arc<ManualClock>, discovery: bool) -> Runner {
        let mut options = RunOptions::from_config(&Config::defaults());
        options.discovery = discovery;
        Runner::new(
            options,
            ArtifactStore::new(dir.path().join("observed"), dir.path().join("debug")),
        )
        .with_clock(clock)
    }

    fn scenario_case(id: &str, category: &str, input: &str, expected: &str) -> ScenarioCase {
        ScenarioCase::new(TestCase::new(id, category, input, expected), "Pos_UI_0001")
    }

    #[test]
    fn test_positive_case_passes_and_persists() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new());
        let runner = runner(&dir, clock.clone(), false);
        let case = scenario_case("Pos_Fun_0001", "positive functional", "mama gedhara yanavaa", "I am going home");
        let mut page = ScriptedPage::timeline("", vec![(750, "going home, I am")]).with_clock(clock);

        let outcome = runner.run_case(&mut page, &case);

        assert_eq!(outcome.verdict, Verdict::Pass);
        assert!(!outcome.is_failure());
        let observed = std::fs::read_to_string(dir.path().join("observed/Pos_Fun_0001.txt")).unwrap();
        assert_eq!(observed, "going home, I am");
        assert!(dir.path().join("debug/Pos_Fun_0001.html").exists());
    }

    #[test]
    fn test_empty_positive_output_fails_assertion() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new());
        let runner = runner(&dir, clock.clone(), false);
        let case = scenario_case("Pos_Fun_0002", "positive", "mama", "මම");
        let mut page = ScriptedPage::timeline("", vec![]).with_clock(clock);

        let outcome = runner.run_case(&mut page, &case);

        assert_eq!(outcome.verdict, Verdict::Fail);
        assert_eq!(outcome.assertion_failure.as_deref(), Some("observed output is empty"));
    }

    #[test]
    fn test_discovery_mode_never_enforces() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new());
        let runner = runner(&dir, clock.clone(), true);
        let case = scenario_case("Pos_Fun_0002", "positive", "mama", "මම");
        let mut page = ScriptedPage::timeline("", vec![]).with_clock(clock);

        let outcome = runner.run_case(&mut page, &case);

        assert_eq!(outcome.verdict, Verdict::Fail);
        assert!(!outcome.is_failure());
    }

    #[test]
    fn test_negative_mismatch_is_recorded_only() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new());
        let runner = runner(&dir, clock.clone(), false);
        let case = scenario_case("Neg_Fun_0003", "negative functional", "thx", "ස්තූතියි");
        let mut page = ScriptedPage::timeline("", vec![(250, "ථx")]).with_clock(clock);

        let outcome = runner.run_case(&mut page, &case);

        assert_eq!(outcome.verdict, Verdict::Fail);
        assert!(!outcome.is_failure());
    }

    #[test]
    fn test_snapshot_failure_does_not_fail_case() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new());
        let runner = runner(&dir, clock.clone(), false);
        let case = scenario_case("Pos_Fun_0003", "positive", "mama", "මම");
        let mut page = ScriptedPage::timeline("", vec![(0, "මම")])
            .with_clock(clock)
            .failing_content();

        let outcome = runner.run_case(&mut page, &case);

        assert_eq!(outcome.verdict, Verdict::Pass);
        assert_eq!(outcome.debug_path, None);
        assert!(!outcome.is_failure());
    }

    #[test]
    fn test_navigation_error_fails_case() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new());
        let runner = runner(&dir, clock.clone(), false);
        let case = scenario_case("Neg_Fun_0004", "negative", "x", "y");
        let mut page = ScriptedPage::timeline("", vec![])
            .with_clock(clock)
            .fail_navigation("net::ERR_CERT_DATE_INVALID");

        let outcome = runner.run_case(&mut page, &case);

        assert!(outcome.is_failure());
        assert!(outcome.observed.is_none());
        assert!(outcome.error.unwrap().contains("ERR_CERT_DATE_INVALID"));
    }

    #[test]
    fn test_autocorrect_is_enabled() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new());
        let runner = runner(&dir, clock.clone(), true);
        let case = scenario_case("Pos_Fun_0004", "positive", "mama", "මම");
        let mut page = ScriptedPage::timeline("", vec![(0, "මම")])
            .with_clock(clock)
            .with_option("Word Autocorrect", false);

        runner.run_case(&mut page, &case);

        assert_eq!(page.option("Word Autocorrect"), Some(true));
    }

    #[test]
    fn test_enforce_reports_missing_tokens() {
        let case = scenario_case("Pos_Fun_0005", "positive", "x", "I am going home");
        assert_eq!(enforce_positive(&case, "I am"), Some(r#"observed output is missing ["going"]"#.to_string()));
        assert_eq!(enforce_positive(&case, "going I am"), None);
    }
}
