use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MIN_ITERATIONS: usize = 100;
pub const MAX_ITERATIONS: usize = 100_000;

/// Probability distribution used to draw activity durations from a
/// three-point estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DistributionType {
    /// Inverse-CDF sampling from the (o, m, p) triangle.
    Triangular,
    /// Beta distribution parameterized from the classic PERT moments.
    Pert,
    /// Normal with PERT mean and std-dev, truncated at zero by resampling.
    Normal,
    /// Beta with caller-supplied shapes, scaled to [o, p].
    Beta { alpha: f64, beta: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub iterations: usize,
    pub distribution: DistributionType,
    /// Percentile levels to report, e.g. [50, 80, 90].
    pub confidence_levels: Vec<u8>,
    /// An explicit seed makes repeat runs byte-identical; absence draws
    /// entropy and makes the run non-reproducible.
    pub seed: Option<u64>,
    pub timeout: Option<Duration>,
    /// Total-float tolerance below which an activity counts as critical.
    pub float_epsilon: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            distribution: DistributionType::Pert,
            confidence_levels: vec![50, 80, 90],
            seed: None,
            timeout: None,
            float_epsilon: 1e-6,
        }
    }
}

impl SimulationConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_distribution(mut self, distribution: DistributionType) -> Self {
        self.distribution = distribution;
        self
    }
}

/// Run lifecycle. The orchestrator returns a fresh status with each
/// result instead of mutating shared state, so workers never contend on
/// a status field.
///
/// The core itself only ever produces `Completed`; failures and
/// cancellations travel as errors, and `SimulationError::run_status`
/// maps them back for callers that persist run records. `Pending` and
/// `Running` exist for those records too, covering the time before a
/// result or error is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Outcome of a single Monte Carlo iteration. Ephemeral: consumed by the
/// aggregator, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationOutcome {
    /// Project duration in working days on the primary calendar.
    pub duration_days: f64,
    /// Critical flag per activity, in network arena order.
    pub critical: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileEstimate {
    pub level: u8,
    pub duration_days: f64,
    pub date: NaiveDate,
}

/// Fraction of iterations in which the activity lay on the critical path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityCriticality {
    pub id: String,
    pub index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub status: RunStatus,
    pub iterations: usize,
    pub start_date: NaiveDate,
    /// One entry per configured confidence level, ascending.
    pub percentiles: Vec<PercentileEstimate>,
    pub mean_duration_days: f64,
    /// Population standard deviation over all iterations.
    pub std_dev_days: f64,
    pub min_duration_days: f64,
    pub max_duration_days: f64,
    pub criticality: Vec<ActivityCriticality>,
}

impl SimulationResult {
    pub fn percentile(&self, level: u8) -> Option<&PercentileEstimate> {
        self.percentiles.iter().find(|p| p.level == level)
    }

    pub fn criticality_of(&self, id: &str) -> Option<f64> {
        self.criticality
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.index)
    }
}
