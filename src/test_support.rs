use chrono::NaiveDate;
use rand::RngCore;

use crate::domain::activity::Activity;
use crate::domain::dependency::Dependency;
use crate::domain::estimate::ThreePointEstimate;
use crate::domain::project::NetworkSnapshot;
use crate::services::sampler::{DurationSampler, SamplerError};

// A sampler that always returns the most likely value.
pub struct MockSampler;

impl DurationSampler for MockSampler {
    fn sample(
        &self,
        estimate: &ThreePointEstimate,
        _rng: &mut dyn RngCore,
    ) -> Result<f64, SamplerError> {
        Ok(estimate.most_likely)
    }
}

pub fn on_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// The reference network: A(5d) -> B(3d) -> C(2d), all finish-to-start
/// with zero lag, five-day week, starting Monday 2026-01-05.
pub fn chain_snapshot() -> NetworkSnapshot {
    NetworkSnapshot::new("chain", on_date(2026, 1, 5))
        .with_activity(Activity::new("A", 5.0))
        .with_activity(Activity::new("B", 3.0))
        .with_activity(Activity::new("C", 2.0))
        .with_dependency(Dependency::finish_to_start("A", "B"))
        .with_dependency(Dependency::finish_to_start("B", "C"))
}
