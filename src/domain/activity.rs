use serde::{Deserialize, Serialize};

use crate::domain::estimate::ThreePointEstimate;

/// A schedulable unit of work, immutable for the duration of a run.
///
/// `duration_days` is the deterministic baseline used by single CPM runs
/// and by time-impact analysis; the optional three-point estimate feeds
/// the Monte Carlo sampler. Without an estimate the sampler returns the
/// baseline for every iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub duration_days: f64,
    pub estimate: Option<ThreePointEstimate>,
    /// Calendar name, resolved against the run's `CalendarSet`.
    pub calendar: Option<String>,
}

impl Activity {
    pub fn new(id: impl Into<String>, duration_days: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            duration_days,
            estimate: None,
            calendar: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_estimate(mut self, estimate: ThreePointEstimate) -> Self {
        self.estimate = Some(estimate);
        self
    }

    pub fn with_calendar(mut self, calendar: impl Into<String>) -> Self {
        self.calendar = Some(calendar.into());
        self
    }

    /// The estimate the sampler draws from: the three-point triplet if
    /// present, otherwise the fixed baseline duration.
    pub fn duration_estimate(&self) -> ThreePointEstimate {
        self.estimate
            .unwrap_or_else(|| ThreePointEstimate::fixed(self.duration_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn an_activity_without_estimate_samples_its_baseline() {
        let activity = Activity::new("A", 5.0);
        assert_eq!(activity.duration_estimate(), ThreePointEstimate::fixed(5.0));
    }

    #[test]
    fn an_explicit_estimate_takes_precedence() {
        let activity =
            Activity::new("A", 3.0).with_estimate(ThreePointEstimate::new(2.0, 3.0, 7.0));
        assert_eq!(
            activity.duration_estimate(),
            ThreePointEstimate::new(2.0, 3.0, 7.0)
        );
    }
}
