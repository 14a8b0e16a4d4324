//! Translit Probe - acceptance testing for a web transliteration tool.
//!
//! This crate provides:
//! - A JSON test case store with scenario tagging at load time
//! - A page automation abstraction with a Chrome backend and a scripted mock
//! - An output stabilization engine for a UI with no completion signal
//! - An outcome classifier with empty, strict-negative and tolerant policies
//! - Navigation retry for transient network failures
//! - A CSV report builder and store maintenance utilities
//!
//! # Example
//!
//! ```rust,no_run
//! use translit_probe::cases::CaseStore;
//! use translit_probe::page::{ChromePage, PageDriver};
//! use translit_probe::runner::Runner;
//!
//! let config = translit_probe::config::get();
//! let store = CaseStore::load(&config.paths.testcases_file).unwrap();
//! let cases = store.scenario_cases(&config.run.realtime_case);
//!
//! let runner = Runner::from_config(config);
//! let result = runner.run(&cases, || {
//!     ChromePage::launch(&config.site).map(|page| Box::new(page) as Box<dyn PageDriver>)
//! });
//! println!("{} passed, {} failed", result.summary.passed, result.summary.failed);
//! ```

pub mod artifacts;
pub mod cases;
pub mod classify;
pub mod config;
pub mod maintenance;
pub mod navigate;
pub mod observe;
pub mod page;
pub mod report;
pub mod runner;

// Re-export the data model
pub use cases::{CaseStore, Polarity, Scenario, ScenarioCase, StoreError, TestCase};

// Re-export the core engine
pub use classify::{Verdict, classify, significant_tokens};
pub use navigate::{RetryPolicy, goto_with_retry};
pub use observe::{Clock, ManualClock, ObservedResult, SystemClock, observe, settle_index};

// Re-export page automation
pub use page::{ChromePage, PageDriver, PageError, PageResult, ScriptedPage};

// Re-export runner and outer layers
pub use artifacts::{ArtifactStore, sanitize_id};
pub use maintenance::{MaintenanceError, remap_ids, sync_observed, verify_counts};
pub use report::{ReportError, generate as generate_report};
pub use runner::{CaseOutcome, RunResult, Runner};
