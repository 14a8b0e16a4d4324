pub mod store;
pub mod types;

pub use store::{CaseStore, StoreError, StoreResult};
pub use types::{Polarity, Scenario, ScenarioCase, TestCase};
