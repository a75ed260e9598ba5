use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    #[error("optimistic duration {0} is negative")]
    NegativeOptimistic(f64),
    #[error("optimistic {optimistic} exceeds most likely {most_likely}")]
    OptimisticAboveMostLikely { optimistic: f64, most_likely: f64 },
    #[error("most likely {most_likely} exceeds pessimistic {pessimistic}")]
    MostLikelyAbovePessimistic { most_likely: f64, pessimistic: f64 },
    #[error("estimate contains a non-finite value")]
    NonFinite,
}

/// Three-point duration estimate in working days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreePointEstimate {
    pub optimistic: f64,
    pub most_likely: f64,
    pub pessimistic: f64,
}

impl ThreePointEstimate {
    pub fn new(optimistic: f64, most_likely: f64, pessimistic: f64) -> Self {
        Self {
            optimistic,
            most_likely,
            pessimistic,
        }
    }

    /// An estimate with zero spread: every draw returns `days`.
    pub fn fixed(days: f64) -> Self {
        Self::new(days, days, days)
    }

    pub fn validate(&self) -> Result<(), EstimateError> {
        if !self.optimistic.is_finite()
            || !self.most_likely.is_finite()
            || !self.pessimistic.is_finite()
        {
            return Err(EstimateError::NonFinite);
        }
        if self.optimistic < 0.0 {
            return Err(EstimateError::NegativeOptimistic(self.optimistic));
        }
        if self.optimistic > self.most_likely {
            return Err(EstimateError::OptimisticAboveMostLikely {
                optimistic: self.optimistic,
                most_likely: self.most_likely,
            });
        }
        if self.most_likely > self.pessimistic {
            return Err(EstimateError::MostLikelyAbovePessimistic {
                most_likely: self.most_likely,
                pessimistic: self.pessimistic,
            });
        }
        Ok(())
    }

    /// Classic PERT mean (o + 4m + p) / 6.
    pub fn mean(&self) -> f64 {
        (self.optimistic + 4.0 * self.most_likely + self.pessimistic) / 6.0
    }

    /// Classic PERT standard deviation (p - o) / 6.
    pub fn std_dev(&self) -> f64 {
        (self.pessimistic - self.optimistic) / 6.0
    }

    /// Whether the estimate has no spread (optimistic == pessimistic).
    pub fn is_fixed(&self) -> bool {
        (self.pessimistic - self.optimistic).abs() < f64::EPSILON
    }
}
