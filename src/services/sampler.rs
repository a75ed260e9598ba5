use rand::Rng;
use rand::RngCore;
use rand_distr::{Beta, Distribution, Normal};
use thiserror::Error;

use crate::domain::estimate::{EstimateError, ThreePointEstimate};
use crate::domain::simulation::DistributionType;

/// Truncated-normal draws resample negative values instead of clamping
/// them, so pathological parameters must be bounded somewhere.
const MAX_RESAMPLES: usize = 1_000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplerError {
    #[error("invalid estimate: {0}")]
    InvalidEstimate(#[from] EstimateError),
    #[error("beta shape parameters must be positive, got alpha={alpha}, beta={beta}")]
    InvalidShape { alpha: f64, beta: f64 },
    #[error("gave up drawing a non-negative duration after {0} resamples")]
    ResampleLimit(usize),
    #[error("sampled a non-finite duration")]
    NonFinite,
}

/// Seam between the orchestrator and the concrete distributions; tests
/// substitute a deterministic sampler here.
pub trait DurationSampler: Sync {
    fn sample(
        &self,
        estimate: &ThreePointEstimate,
        rng: &mut dyn RngCore,
    ) -> Result<f64, SamplerError>;
}

/// Draws durations from a three-point estimate under the configured
/// distribution. Stateless: the per-iteration RNG is passed in.
#[derive(Debug, Clone)]
pub struct DistributionSampler {
    distribution: DistributionType,
}

impl DistributionSampler {
    pub fn new(distribution: DistributionType) -> Self {
        Self { distribution }
    }
}

impl DurationSampler for DistributionSampler {
    fn sample(
        &self,
        estimate: &ThreePointEstimate,
        rng: &mut dyn RngCore,
    ) -> Result<f64, SamplerError> {
        estimate.validate()?;
        if estimate.is_fixed() {
            return Ok(estimate.most_likely);
        }

        let value = match self.distribution {
            DistributionType::Triangular => triangular_sample(estimate, rng),
            DistributionType::Pert => pert_sample(estimate, rng)?,
            DistributionType::Normal => truncated_normal_sample(estimate, rng)?,
            DistributionType::Beta { alpha, beta } => {
                scaled_beta_sample(estimate, alpha, beta, rng)?
            }
        };

        if !value.is_finite() {
            return Err(SamplerError::NonFinite);
        }
        Ok(value)
    }
}

/// Inverse-CDF draw from the (o, m, p) triangle.
fn triangular_sample(estimate: &ThreePointEstimate, rng: &mut dyn RngCore) -> f64 {
    let (o, m, p) = (
        estimate.optimistic,
        estimate.most_likely,
        estimate.pessimistic,
    );
    let u: f64 = rng.gen_range(0.0..1.0);
    let mode_fraction = (m - o) / (p - o);
    if u < mode_fraction {
        o + (u * (p - o) * (m - o)).sqrt()
    } else {
        p - ((1.0 - u) * (p - o) * (p - m)).sqrt()
    }
}

/// Beta draw with shapes derived from the classic PERT mean and variance,
/// scaled to [o, p]. Shapes that do not come out positive degenerate to
/// the fixed most-likely value.
fn pert_sample(
    estimate: &ThreePointEstimate,
    rng: &mut dyn RngCore,
) -> Result<f64, SamplerError> {
    let (o, p) = (estimate.optimistic, estimate.pessimistic);
    let mean = estimate.mean();
    let variance = estimate.std_dev().powi(2);

    let alpha = ((mean - o) / (p - o)) * ((mean - o) * (p - mean) / variance - 1.0);
    let beta = alpha * (p - mean) / (mean - o);
    if !(alpha > 0.0 && beta > 0.0) || !alpha.is_finite() || !beta.is_finite() {
        return Ok(estimate.most_likely);
    }

    let distribution = Beta::new(alpha, beta).map_err(|_| SamplerError::InvalidShape { alpha, beta })?;
    Ok(o + distribution.sample(rng) * (p - o))
}

/// Normal with PERT moments, truncated at zero by resampling (clamping
/// would pile probability mass on zero and bias the distribution).
fn truncated_normal_sample(
    estimate: &ThreePointEstimate,
    rng: &mut dyn RngCore,
) -> Result<f64, SamplerError> {
    let distribution = Normal::new(estimate.mean(), estimate.std_dev()).map_err(|_| {
        SamplerError::InvalidShape {
            alpha: estimate.mean(),
            beta: estimate.std_dev(),
        }
    })?;
    for _ in 0..MAX_RESAMPLES {
        let value = distribution.sample(rng);
        if value >= 0.0 {
            return Ok(value);
        }
    }
    Err(SamplerError::ResampleLimit(MAX_RESAMPLES))
}

/// Beta with caller-supplied shapes, scaled to [o, p].
fn scaled_beta_sample(
    estimate: &ThreePointEstimate,
    alpha: f64,
    beta: f64,
    rng: &mut dyn RngCore,
) -> Result<f64, SamplerError> {
    let distribution = Beta::new(alpha, beta).map_err(|_| SamplerError::InvalidShape { alpha, beta })?;
    let (o, p) = (estimate.optimistic, estimate.pessimistic);
    Ok(o + distribution.sample(rng) * (p - o))
}
