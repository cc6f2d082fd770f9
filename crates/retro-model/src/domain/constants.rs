//! Defaults shared by configuration and the control loop.

/// Default number of required samples before a dataset is regenerated.
pub const DEFAULT_THRESHOLD: u64 = 1500;

/// Default delay between two dataset metadata checks.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default overall deadline for a dataset to appear.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 1800;

/// Default number of held-out examples sent to the live champion.
pub const DEFAULT_SAMPLE_SIZE: usize = 300;

/// Default minimal macro-F1 improvement a challenger needs over the champion.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.001;

/// Seed used to shuffle held-out examples before sampling.
///
/// Fixed so that two evaluations of the same held-out set query the same examples.
pub const EVALUATION_SEED: u64 = 42;
