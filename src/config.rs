//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for the probe, supporting:
//! - Environment variables for every path, selector and timing budget
//! - Defaults tuned for the public SwiftTranslator page
//! - A cached process-wide instance via [`get`]
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `TESTCASES_FILE` | Test case JSON document | `tests/testcases.sample.json` |
//! | `TRANSLIT_OBSERVED_DIR` | Observed-output directory | `observed` |
//! | `TRANSLIT_DEBUG_DIR` | Debug page snapshots | `debug` |
//! | `REPORT_OUT` | Report file | `testcases_report.csv` |
//! | `DISCOVERY` | `1` disables assertion enforcement | unset |
//! | `TRANSLIT_WORKERS` | Concurrent workers (forced to 1 when `CI` is set) | `1` |
//! | `TRANSLIT_SITE_URL` | Page under test | `https://www.swifttranslator.com/` |
//! | `TRANSLIT_INPUT_SELECTOR` | CSS selector of the input field | see [`DEFAULT_INPUT_SELECTOR`] |
//! | `TRANSLIT_OUTPUT_PANEL` | Title text of the output card | `Sinhala` |
//! | `TRANSLIT_HEADLESS` | `0` shows the browser window | `1` |
//! | `TRANSLIT_CHROME` | Chrome/Chromium executable | auto-detected |
//! | `TRANSLIT_REALTIME_CASE` | Id of the real-time UI case | `Pos_UI_0001` |
//! | `TRANSLIT_POSITIVE_WAIT_MS` | Budget for positive functional cases | `20000` |
//! | `TRANSLIT_DEFAULT_WAIT_MS` | Budget for every other case | `8000` |
//!
//! # Example
//!
//! ```bash
//! # Calibrate a new corpus without failing the run
//! export TESTCASES_FILE="tests/testcases.json"
//! export DISCOVERY=1
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default test case document, relative to the working directory
pub const DEFAULT_TESTCASES_FILE: &str = "tests/testcases.sample.json";

/// Default observed-output directory
pub const DEFAULT_OBSERVED_DIR: &str = "observed";

/// Default debug snapshot directory
pub const DEFAULT_DEBUG_DIR: &str = "debug";

/// Default report path
pub const DEFAULT_REPORT_OUT: &str = "testcases_report.csv";

/// Default page under test
pub const DEFAULT_SITE_URL: &str = "https://www.swifttranslator.com/";

/// Default input field selector
pub const DEFAULT_INPUT_SELECTOR: &str = r#"textarea[placeholder="Input Your Singlish Text Here."]"#;

/// Default title of the card that holds the output region
pub const DEFAULT_OUTPUT_PANEL: &str = "Sinhala";

/// Label of the option the probe switches on before each case
pub const DEFAULT_AUTOCORRECT_LABEL: &str = "Word Autocorrect";

/// Default id of the real-time UI case
pub const DEFAULT_REALTIME_CASE: &str = "Pos_UI_0001";

/// Default number of concurrent workers
pub const DEFAULT_WORKERS: usize = 1;

/// Sampling interval of the stabilization loop (milliseconds)
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 250;

/// Minimum continuous stable duration (milliseconds)
pub const DEFAULT_STABLE_WINDOW_MS: u64 = 750;

/// Budget for positive functional cases (milliseconds)
pub const DEFAULT_POSITIVE_WAIT_MS: u64 = 20_000;

/// Budget for every other case (milliseconds)
pub const DEFAULT_WAIT_MS: u64 = 8_000;

/// How long to wait for the output region after navigation (milliseconds)
pub const DEFAULT_OUTPUT_VISIBLE_MS: u64 = 15_000;

/// Navigation attempts before giving up
pub const DEFAULT_NAV_ATTEMPTS: u32 = 3;

/// Delay between navigation attempts (milliseconds)
pub const DEFAULT_NAV_BACKOFF_MS: u64 = 1_500;

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_TESTCASES_FILE: &str = "TESTCASES_FILE";
pub const ENV_OBSERVED_DIR: &str = "TRANSLIT_OBSERVED_DIR";
pub const ENV_DEBUG_DIR: &str = "TRANSLIT_DEBUG_DIR";
pub const ENV_REPORT_OUT: &str = "REPORT_OUT";
pub const ENV_DISCOVERY: &str = "DISCOVERY";
pub const ENV_WORKERS: &str = "TRANSLIT_WORKERS";
pub const ENV_CI: &str = "CI";
pub const ENV_SITE_URL: &str = "TRANSLIT_SITE_URL";
pub const ENV_INPUT_SELECTOR: &str = "TRANSLIT_INPUT_SELECTOR";
pub const ENV_OUTPUT_PANEL: &str = "TRANSLIT_OUTPUT_PANEL";
pub const ENV_HEADLESS: &str = "TRANSLIT_HEADLESS";
pub const ENV_CHROME: &str = "TRANSLIT_CHROME";
pub const ENV_REALTIME_CASE: &str = "TRANSLIT_REALTIME_CASE";
pub const ENV_POSITIVE_WAIT_MS: &str = "TRANSLIT_POSITIVE_WAIT_MS";
pub const ENV_DEFAULT_WAIT_MS: &str = "TRANSLIT_DEFAULT_WAIT_MS";

/// Legacy worker count variable kept from the Playwright setup
pub const ENV_WORKERS_LEGACY: &str = "PW_WORKERS";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub paths: PathSettings,
    pub site: SiteSettings,
    pub timing: TimingSettings,
    pub run: RunSettings,
}

/// Where the store and artifacts live
#[derive(Debug, Clone)]
pub struct PathSettings {
    pub testcases_file: PathBuf,
    pub observed_dir: PathBuf,
    pub debug_dir: PathBuf,
    pub report_out: PathBuf,
}

/// The page under test and how to find things on it
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub url: String,
    pub input_selector: String,
    /// Title text of the card wrapping the output region
    pub output_panel: String,
    pub autocorrect_label: String,
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
}

/// Budgets for the stabilization loop and navigation
#[derive(Debug, Clone)]
pub struct TimingSettings {
    pub sample_interval: Duration,
    pub stable_window: Duration,
    pub positive_wait: Duration,
    pub default_wait: Duration,
    pub output_visible: Duration,
    pub nav_attempts: u32,
    pub nav_backoff: Duration,
}

/// How a run behaves
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Observe and persist, but never enforce assertions
    pub discovery: bool,
    pub workers: usize,
    pub realtime_case: String,
    /// Running under CI, which pins `workers` to 1
    pub ci: bool,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            paths: PathSettings::from_env(),
            site: SiteSettings::from_env(),
            timing: TimingSettings::from_env(),
            run: RunSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            paths: PathSettings::defaults(),
            site: SiteSettings::defaults(),
            timing: TimingSettings::defaults(),
            run: RunSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PathSettings {
    pub fn from_env() -> Self {
        Self {
            testcases_file: env_path(ENV_TESTCASES_FILE, DEFAULT_TESTCASES_FILE),
            observed_dir: env_path(ENV_OBSERVED_DIR, DEFAULT_OBSERVED_DIR),
            debug_dir: env_path(ENV_DEBUG_DIR, DEFAULT_DEBUG_DIR),
            report_out: env_path(ENV_REPORT_OUT, DEFAULT_REPORT_OUT),
        }
    }

    pub fn defaults() -> Self {
        Self {
            testcases_file: PathBuf::from(DEFAULT_TESTCASES_FILE),
            observed_dir: PathBuf::from(DEFAULT_OBSERVED_DIR),
            debug_dir: PathBuf::from(DEFAULT_DEBUG_DIR),
            report_out: PathBuf::from(DEFAULT_REPORT_OUT),
        }
    }
}

impl SiteSettings {
    pub fn from_env() -> Self {
        Self {
            url: env::var(ENV_SITE_URL).unwrap_or_else(|_| DEFAULT_SITE_URL.to_string()),
            input_selector: env::var(ENV_INPUT_SELECTOR)
                .unwrap_or_else(|_| DEFAULT_INPUT_SELECTOR.to_string()),
            output_panel: env::var(ENV_OUTPUT_PANEL)
                .unwrap_or_else(|_| DEFAULT_OUTPUT_PANEL.to_string()),
            autocorrect_label: DEFAULT_AUTOCORRECT_LABEL.to_string(),
            headless: env::var(ENV_HEADLESS)
                .map(|v| !is_falsy(&v))
                .unwrap_or(true),
            chrome_executable: env::var(ENV_CHROME).ok().map(PathBuf::from),
        }
    }

    pub fn defaults() -> Self {
        Self {
            url: DEFAULT_SITE_URL.to_string(),
            input_selector: DEFAULT_INPUT_SELECTOR.to_string(),
            output_panel: DEFAULT_OUTPUT_PANEL.to_string(),
            autocorrect_label: DEFAULT_AUTOCORRECT_LABEL.to_string(),
            headless: true,
            chrome_executable: None,
        }
    }
}

impl TimingSettings {
    pub fn from_env() -> Self {
        Self {
            positive_wait: env_millis(ENV_POSITIVE_WAIT_MS, DEFAULT_POSITIVE_WAIT_MS),
            default_wait: env_millis(ENV_DEFAULT_WAIT_MS, DEFAULT_WAIT_MS),
            ..Self::defaults()
        }
    }

    pub fn defaults() -> Self {
        Self {
            sample_interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
            stable_window: Duration::from_millis(DEFAULT_STABLE_WINDOW_MS),
            positive_wait: Duration::from_millis(DEFAULT_POSITIVE_WAIT_MS),
            default_wait: Duration::from_millis(DEFAULT_WAIT_MS),
            output_visible: Duration::from_millis(DEFAULT_OUTPUT_VISIBLE_MS),
            nav_attempts: DEFAULT_NAV_ATTEMPTS,
            nav_backoff: Duration::from_millis(DEFAULT_NAV_BACKOFF_MS),
        }
    }
}

impl RunSettings {
    pub fn from_env() -> Self {
        let requested = env::var(ENV_WORKERS)
            .or_else(|_| env::var(ENV_WORKERS_LEGACY))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_WORKERS);
        let on_ci = env::var(ENV_CI).map(|v| !is_falsy(&v)).unwrap_or(false);

        Self {
            discovery: env::var(ENV_DISCOVERY)
                .map(|v| v.trim() == "1")
                .unwrap_or(false),
            workers: resolve_workers(requested, on_ci),
            realtime_case: env::var(ENV_REALTIME_CASE)
                .unwrap_or_else(|_| DEFAULT_REALTIME_CASE.to_string()),
            ci: on_ci,
        }
    }

    pub fn defaults() -> Self {
        Self {
            discovery: false,
            workers: DEFAULT_WORKERS,
            realtime_case: DEFAULT_REALTIME_CASE.to_string(),
            ci: false,
        }
    }

    /// Apply an explicit worker count, still capped to 1 under CI
    pub fn with_workers(mut self, requested: usize) -> Self {
        self.workers = resolve_workers(requested, self.ci);
        self
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// The public site must not be hammered: CI always runs a single worker.
fn resolve_workers(requested: usize, on_ci: bool) -> usize {
    if on_ci { 1 } else { requested.max(1) }
}

fn is_falsy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

fn env_path(var: &str, default: &str) -> PathBuf {
    env::var(var)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn env_millis(var: &str, default: u64) -> Duration {
    Duration::from_millis(
        env::var(var)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(default),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.site.url, DEFAULT_SITE_URL);
        assert_eq!(config.paths.observed_dir, PathBuf::from("observed"));
        assert_eq!(config.timing.positive_wait, Duration::from_secs(20));
        assert_eq!(config.timing.default_wait, Duration::from_secs(8));
        assert_eq!(config.run.workers, 1);
        assert!(!config.run.discovery);
    }

    #[test]
    fn test_resolve_workers() {
        assert_eq!(resolve_workers(4, false), 4);
        assert_eq!(resolve_workers(4, true), 1);
        assert_eq!(resolve_workers(0, false), 1);
    }

    #[test]
    fn test_explicit_workers_respect_ci() {
        let local = RunSettings::defaults().with_workers(4);
        assert_eq!(local.workers, 4);

        let ci = RunSettings {
            ci: true,
            ..RunSettings::defaults()
        };
        assert_eq!(ci.with_workers(4).workers, 1);
        assert_eq!(RunSettings::defaults().with_workers(0).workers, 1);
    }

    #[test]
    fn test_is_falsy() {
        assert!(is_falsy("0"));
        assert!(is_falsy(" False "));
        assert!(!is_falsy("1"));
        assert!(!is_falsy("true"));
    }
}
