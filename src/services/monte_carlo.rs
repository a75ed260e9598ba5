use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

use crate::domain::calendar::CalendarError;
use crate::domain::estimate::EstimateError;
use crate::domain::project::NetworkSnapshot;
use crate::domain::simulation::{
    IterationOutcome, MAX_ITERATIONS, MIN_ITERATIONS, RunStatus, SimulationConfig,
    SimulationResult,
};
use crate::services::aggregate;
use crate::services::cpm::{self, ComputationError};
use crate::services::network::{ActivityNetwork, NetworkError};
use crate::services::sampler::{DistributionSampler, DurationSampler, SamplerError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("iteration count {0} is outside {MIN_ITERATIONS}..={MAX_ITERATIONS}")]
    InvalidIterations(usize),
    #[error("no confidence levels configured")]
    NoConfidenceLevels,
    #[error("confidence level {0} is outside 1..=100")]
    InvalidConfidenceLevel(u8),
    #[error("float epsilon must be a non-negative finite number")]
    InvalidFloatEpsilon,
    #[error("invalid network: {0}")]
    Network(#[from] NetworkError),
    #[error("invalid calendar: {0}")]
    Calendar(#[from] CalendarError),
    #[error("invalid estimate for activity `{id}`: {source}")]
    InvalidEstimate { id: String, source: EstimateError },
    #[error("failed to sample a duration: {0}")]
    Sampler(#[from] SamplerError),
    #[error("schedule computation failed: {0}")]
    Computation(#[from] ComputationError),
    #[error("simulation exceeded its time limit of {0:?}")]
    Timeout(Duration),
    #[error("simulation was cancelled")]
    Cancelled,
}

impl SimulationError {
    /// Terminal run status this error corresponds to, for callers that
    /// persist run records.
    pub fn run_status(&self) -> RunStatus {
        match self {
            SimulationError::Cancelled => RunStatus::Cancelled,
            _ => RunStatus::Failed,
        }
    }
}

/// Cooperative cancellation signal, checked by workers between
/// iterations and never mid-iteration. A cancelled run returns no
/// partial payload.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Runs the full Monte Carlo simulation over a network snapshot.
pub fn run_simulation(
    snapshot: &NetworkSnapshot,
    config: &SimulationConfig,
) -> Result<SimulationResult, SimulationError> {
    run_simulation_with_cancellation(snapshot, config, &CancellationToken::new())
}

/// As [`run_simulation`], observing an external cancellation token.
///
/// All validation happens before the first iteration (fail fast, no
/// partial runs). Iterations are dispatched across rayon's worker pool;
/// every worker reads the immutable network and calendars and produces a
/// private outcome, so the hot path takes no locks. Any iteration error
/// aborts the whole run: silently dropping iterations would bias the
/// percentiles.
pub fn run_simulation_with_cancellation(
    snapshot: &NetworkSnapshot,
    config: &SimulationConfig,
    token: &CancellationToken,
) -> Result<SimulationResult, SimulationError> {
    validate_config(config)?;
    snapshot.calendars.validate()?;

    let network = ActivityNetwork::build(snapshot.activities.clone(), &snapshot.dependencies)?;
    for activity in network.activities() {
        activity
            .duration_estimate()
            .validate()
            .map_err(|source| SimulationError::InvalidEstimate {
                id: activity.id.clone(),
                source,
            })?;
    }

    let sampler = DistributionSampler::new(config.distribution);
    let base_seed = config
        .seed
        .unwrap_or_else(|| rand::thread_rng().next_u64());
    let started = Instant::now();

    tracing::debug!(
        project = %snapshot.name,
        iterations = config.iterations,
        seed = base_seed,
        "starting monte carlo simulation"
    );

    let outcomes: Result<Vec<IterationOutcome>, SimulationError> = (0..config.iterations)
        .into_par_iter()
        .map(|iteration| {
            if token.is_cancelled() {
                return Err(SimulationError::Cancelled);
            }
            if let Some(limit) = config.timeout {
                if started.elapsed() >= limit {
                    return Err(SimulationError::Timeout(limit));
                }
            }

            let mut rng = StdRng::seed_from_u64(iteration_seed(base_seed, iteration as u64));
            let durations = sample_duration_vector(&network, &sampler, &mut rng)?;
            let schedule = cpm::compute(
                &network,
                &snapshot.calendars,
                &durations,
                config.float_epsilon,
            )?;
            Ok(IterationOutcome {
                duration_days: schedule.duration_days,
                critical: schedule.critical,
            })
        })
        .collect();
    let outcomes = outcomes?;

    let result = aggregate::aggregate(
        &network,
        &outcomes,
        &config.confidence_levels,
        snapshot.start_date,
        &snapshot.calendars,
    );

    tracing::info!(
        project = %snapshot.name,
        iterations = result.iterations,
        mean_days = result.mean_duration_days,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "simulation completed"
    );
    Ok(result)
}

fn validate_config(config: &SimulationConfig) -> Result<(), SimulationError> {
    if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&config.iterations) {
        return Err(SimulationError::InvalidIterations(config.iterations));
    }
    if config.confidence_levels.is_empty() {
        return Err(SimulationError::NoConfidenceLevels);
    }
    for &level in &config.confidence_levels {
        if level == 0 || level > 100 {
            return Err(SimulationError::InvalidConfidenceLevel(level));
        }
    }
    if !config.float_epsilon.is_finite() || config.float_epsilon < 0.0 {
        return Err(SimulationError::InvalidFloatEpsilon);
    }
    Ok(())
}

/// Derives the per-iteration RNG stream. SplitMix64 over the base seed
/// and the iteration index keeps seeded runs byte-identical regardless
/// of which worker executes which iteration.
fn iteration_seed(base_seed: u64, iteration: u64) -> u64 {
    let mut z = base_seed.wrapping_add((iteration.wrapping_add(1)).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn sample_duration_vector(
    network: &ActivityNetwork,
    sampler: &dyn DurationSampler,
    rng: &mut StdRng,
) -> Result<Vec<f64>, SamplerError> {
    network
        .activities()
        .iter()
        .map(|activity| sampler.sample(&activity.duration_estimate(), rng))
        .collect()
}
