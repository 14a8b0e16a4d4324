//! The sampling loop.
//!
//! Submits an input, then reads the output region once per interval until
//! the stabilization predicate holds or the budget runs out. Running out of
//! budget is a normal outcome: the last text read is returned unsettled.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::clock::Clock;
use super::stabilize::{Expectation, StabilityTiming, StabilityTracker, is_settled};
use crate::cases::Scenario;
use crate::config::TimingSettings;
use crate::page::{InputEvent, PageDriver, PageResult, read_output_text};

/// What was read for one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedResult {
    pub id: String,
    pub text: String,
    /// Whether the stabilization predicate held before the budget ran out
    pub settled: bool,
    pub elapsed_ms: u64,
    /// Elapsed time at which the predicate held
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_at_ms: Option<u64>,
}

/// How long to wait for a case to settle.
///
/// Positive functional cases are expected to produce output and get the long
/// budget; everything else is expected to fail fast or stay empty.
/// A category tagged both positive and negative is negative and gets the
/// short budget.
pub fn budget_for(scenario: Scenario, timing: &TimingSettings) -> Duration {
    if scenario.is_positive_functional() {
        timing.positive_wait
    } else {
        timing.default_wait
    }
}

/// Submit `input` and wait for the output to settle
pub fn observe(
    page: &mut dyn PageDriver,
    clock: &dyn Clock,
    id: &str,
    input: &str,
    budget: Duration,
    timing: StabilityTiming,
) -> PageResult<ObservedResult> {
    let baseline = read_output_text(page).unwrap_or_else(|err| {
        debug!(id, error = %err, "baseline read failed, assuming empty output");
        String::new()
    });

    page.click_input()?;
    page.fill_input(input)?;
    page.dispatch_input_events(&InputEvent::COMMIT)?;

    Ok(sample_until_settled(
        page,
        clock,
        id,
        &Expectation::for_input(input, &baseline),
        budget,
        timing,
    ))
}

/// Sample the output region until `expectation` holds for the window
pub fn sample_until_settled(
    page: &mut dyn PageDriver,
    clock: &dyn Clock,
    id: &str,
    expectation: &Expectation,
    budget: Duration,
    timing: StabilityTiming,
) -> ObservedResult {
    let start = clock.now_ms();
    let budget_ms = budget.as_millis() as u64;
    let mut tracker = StabilityTracker::new(timing);
    let mut text = String::new();

    while clock.elapsed_since(start) < budget_ms {
        match read_output_text(page) {
            Ok(current) => {
                let stable_ms = tracker.record(&current);
                text = current;
                if is_settled(expectation, &text, stable_ms, timing) {
                    let elapsed_ms = clock.elapsed_since(start);
                    debug!(id, elapsed_ms, "output settled");
                    return ObservedResult {
                        id: id.to_string(),
                        text,
                        settled: true,
                        elapsed_ms,
                        stable_at_ms: Some(elapsed_ms),
                    };
                }
                debug!(id, stable_ms, chars = text.chars().count(), "output not settled yet");
            }
            Err(err) => debug!(id, error = %err, "output read failed, retrying next tick"),
        }
        clock.sleep(timing.interval);
    }

    debug!(id, budget_ms, "output did not settle within budget");
    ObservedResult {
        id: id.to_string(),
        text,
        settled: false,
        elapsed_ms: clock.elapsed_since(start),
        stable_at_ms: None,
    }
}
