//! Output observation: deciding when an asynchronously updating output is final.

pub mod clock;
pub mod engine;
pub mod realtime;
pub mod stabilize;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{ObservedResult, budget_for, observe, sample_until_settled};
pub use realtime::{RealtimeOutcome, RealtimeProbe};
pub use stabilize::{Expectation, StabilityTiming, StabilityTracker, is_settled, settle_index};
