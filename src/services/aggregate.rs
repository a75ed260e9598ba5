use chrono::NaiveDate;

use crate::domain::calendar::CalendarSet;
use crate::domain::simulation::{
    ActivityCriticality, IterationOutcome, PercentileEstimate, RunStatus, SimulationResult,
};
use crate::services::network::ActivityNetwork;

/// Nearest-rank percentile over an ascending-sorted slice: the value at
/// index ceil(p/100 * N), 1-indexed. No interpolation, so every reported
/// percentile is an actually observed outcome and the series is monotone
/// in the level by construction.
pub fn nearest_rank(sorted_values: &[f64], level: u8) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    let n = sorted_values.len();
    let rank = ((f64::from(level) / 100.0) * n as f64).ceil() as usize;
    sorted_values[rank.clamp(1, n) - 1]
}

/// Reduces iteration outcomes into the final result. Aggregation is
/// order-independent: outcomes are sorted by duration before any rank
/// lookup, so workers may finish in any order.
pub fn aggregate(
    network: &ActivityNetwork,
    outcomes: &[IterationOutcome],
    confidence_levels: &[u8],
    start_date: NaiveDate,
    calendars: &CalendarSet,
) -> SimulationResult {
    let n = outcomes.len();
    let mut durations: Vec<f64> = outcomes.iter().map(|o| o.duration_days).collect();
    durations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut levels = confidence_levels.to_vec();
    levels.sort_unstable();
    let percentiles = levels
        .into_iter()
        .map(|level| {
            let duration_days = nearest_rank(&durations, level);
            PercentileEstimate {
                level,
                duration_days,
                date: calendars.finish_date_at(start_date, duration_days),
            }
        })
        .collect();

    let mean = if n == 0 {
        0.0
    } else {
        durations.iter().sum::<f64>() / n as f64
    };
    let std_dev = if n == 0 {
        0.0
    } else {
        // Population standard deviation over all iterations.
        (durations.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n as f64).sqrt()
    };

    let mut critical_counts = vec![0_usize; network.len()];
    for outcome in outcomes {
        for (i, critical) in outcome.critical.iter().enumerate() {
            if *critical {
                critical_counts[i] += 1;
            }
        }
    }
    let criticality = network
        .activities()
        .iter()
        .enumerate()
        .map(|(i, activity)| ActivityCriticality {
            id: activity.id.clone(),
            index: if n == 0 {
                0.0
            } else {
                critical_counts[i] as f64 / n as f64
            },
        })
        .collect();

    SimulationResult {
        status: RunStatus::Completed,
        iterations: n,
        start_date,
        percentiles,
        mean_duration_days: mean,
        std_dev_days: std_dev,
        min_duration_days: durations.first().copied().unwrap_or(0.0),
        max_duration_days: durations.last().copied().unwrap_or(0.0),
        criticality,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::activity::Activity;
    use crate::test_support::on_date;

    #[test]
    fn nearest_rank_uses_the_ceiling_of_the_scaled_rank() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        // N=10: p50 -> rank 5, p80 -> rank 8, p90 -> rank 9.
        assert_eq!(nearest_rank(&values, 50), 5.0);
        assert_eq!(nearest_rank(&values, 80), 8.0);
        assert_eq!(nearest_rank(&values, 90), 9.0);
        assert_eq!(nearest_rank(&values, 100), 10.0);
        // p1 of 10 values -> ceil(0.1) = rank 1.
        assert_eq!(nearest_rank(&values, 1), 1.0);
    }

    #[test]
    fn nearest_rank_of_an_empty_slice_is_zero() {
        assert_eq!(nearest_rank(&[], 50), 0.0);
    }

    fn outcome(duration_days: f64, critical: Vec<bool>) -> IterationOutcome {
        IterationOutcome {
            duration_days,
            critical,
        }
    }

    #[test]
    fn aggregate_sorts_outcomes_and_reports_monotone_percentiles() {
        let network = ActivityNetwork::build(vec![Activity::new("A", 1.0)], &[]).unwrap();
        let outcomes: Vec<IterationOutcome> = [12.0, 10.0, 14.0, 11.0, 13.0]
            .iter()
            .map(|d| outcome(*d, vec![true]))
            .collect();

        let result = aggregate(
            &network,
            &outcomes,
            &[90, 50, 80],
            on_date(2026, 1, 5),
            &CalendarSet::standard(),
        );

        assert_eq!(result.iterations, 5);
        let levels: Vec<u8> = result.percentiles.iter().map(|p| p.level).collect();
        assert_eq!(levels, vec![50, 80, 90]);
        let days: Vec<f64> = result.percentiles.iter().map(|p| p.duration_days).collect();
        assert_eq!(days, vec![12.0, 13.0, 14.0]);
        assert!(days.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(result.min_duration_days, 10.0);
        assert_eq!(result.max_duration_days, 14.0);
        assert_eq!(result.mean_duration_days, 12.0);
    }

    #[test]
    fn aggregate_computes_the_population_standard_deviation() {
        let network = ActivityNetwork::build(vec![Activity::new("A", 1.0)], &[]).unwrap();
        let outcomes: Vec<IterationOutcome> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .iter()
            .map(|d| outcome(*d, vec![true]))
            .collect();

        let result = aggregate(
            &network,
            &outcomes,
            &[50],
            on_date(2026, 1, 5),
            &CalendarSet::standard(),
        );
        assert_eq!(result.mean_duration_days, 5.0);
        assert_eq!(result.std_dev_days, 2.0);
    }

    #[test]
    fn criticality_index_is_the_fraction_of_critical_iterations() {
        let network = ActivityNetwork::build(
            vec![Activity::new("A", 1.0), Activity::new("B", 1.0)],
            &[],
        )
        .unwrap();
        let outcomes = vec![
            outcome(1.0, vec![true, false]),
            outcome(1.0, vec![true, false]),
            outcome(1.0, vec![true, true]),
            outcome(1.0, vec![false, true]),
        ];

        let result = aggregate(
            &network,
            &outcomes,
            &[50],
            on_date(2026, 1, 5),
            &CalendarSet::standard(),
        );
        assert_eq!(result.criticality_of("A"), Some(0.75));
        assert_eq!(result.criticality_of("B"), Some(0.5));
    }
}
