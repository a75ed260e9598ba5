use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::calendar::CalendarSet;
use crate::domain::dependency::DependencyType;
use crate::services::network::{ActivityNetwork, DependencyEdge};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputationError {
    #[error("duration vector has {actual} entries for {expected} activities")]
    DurationVectorMismatch { expected: usize, actual: usize },
    #[error("activity `{0}` has a negative duration")]
    NegativeDuration(String),
    #[error("non-finite value while scheduling activity `{0}`")]
    NonFiniteValue(String),
    #[error("schedule dates for activity `{0}` did not advance")]
    NonAdvancingDates(String),
}

/// Result of one forward/backward CPM pass.
///
/// All values are working-day offsets from the project start on the
/// primary calendar; dates materialize only through the calendar set.
/// Vectors are indexed in network arena order.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub early_start: Vec<f64>,
    pub early_finish: Vec<f64>,
    pub late_start: Vec<f64>,
    pub late_finish: Vec<f64>,
    /// late_start - early_start.
    pub total_float: Vec<f64>,
    /// Slack before the earliest successor constraint binds.
    pub free_float: Vec<f64>,
    pub critical: Vec<bool>,
    /// Maximal chain of critical activities linked by driving edges,
    /// in execution order (arena indices).
    pub critical_path: Vec<usize>,
    /// Project duration in working days.
    pub duration_days: f64,
}

/// Calendar dates for one activity of a deterministic schedule.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ActivitySchedule {
    pub id: String,
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
    pub total_float_days: f64,
    pub free_float_days: f64,
    pub critical: bool,
}

impl Schedule {
    pub fn finish_date(&self, start_date: NaiveDate, calendars: &CalendarSet) -> NaiveDate {
        calendars.finish_date_at(start_date, self.duration_days)
    }

    pub fn activity_dates(
        &self,
        network: &ActivityNetwork,
        calendars: &CalendarSet,
        start_date: NaiveDate,
    ) -> Vec<ActivitySchedule> {
        network
            .activities()
            .iter()
            .enumerate()
            .map(|(i, activity)| ActivitySchedule {
                id: activity.id.clone(),
                early_start: calendars.start_date_at(start_date, self.early_start[i]),
                early_finish: calendars.finish_date_at(start_date, self.early_finish[i]),
                late_start: calendars.start_date_at(start_date, self.late_start[i]),
                late_finish: calendars.finish_date_at(start_date, self.late_finish[i]),
                total_float_days: self.total_float[i],
                free_float_days: self.free_float[i],
                critical: self.critical[i],
            })
            .collect()
    }
}

/// Earliest start implied by one predecessor constraint.
fn early_start_candidate(
    edge: &DependencyEdge,
    early_start: &[f64],
    early_finish: &[f64],
    successor_duration: f64,
) -> f64 {
    match edge.kind {
        DependencyType::FinishToStart => early_finish[edge.other] + edge.lag_days,
        DependencyType::StartToStart => early_start[edge.other] + edge.lag_days,
        DependencyType::FinishToFinish => {
            early_finish[edge.other] + edge.lag_days - successor_duration
        }
        DependencyType::StartToFinish => {
            early_start[edge.other] + edge.lag_days - successor_duration
        }
    }
}

/// Latest finish implied by one successor constraint.
fn late_finish_candidate(
    edge: &DependencyEdge,
    late_start: &[f64],
    late_finish: &[f64],
    predecessor_duration: f64,
) -> f64 {
    match edge.kind {
        DependencyType::FinishToStart => late_start[edge.other] - edge.lag_days,
        DependencyType::StartToStart => {
            late_start[edge.other] - edge.lag_days + predecessor_duration
        }
        DependencyType::FinishToFinish => late_finish[edge.other] - edge.lag_days,
        DependencyType::StartToFinish => {
            late_finish[edge.other] - edge.lag_days + predecessor_duration
        }
    }
}

/// Forward/backward pass over the cached topological order.
///
/// `durations` is in working days of each activity's own calendar, arena
/// order; it is rescaled onto the primary calendar axis before the pass.
/// When several dependency types constrain the same activity the
/// governing (latest) date wins on the forward pass and the earliest on
/// the backward pass.
pub fn compute(
    network: &ActivityNetwork,
    calendars: &CalendarSet,
    durations: &[f64],
    float_epsilon: f64,
) -> Result<Schedule, ComputationError> {
    let n = network.len();
    if durations.len() != n {
        return Err(ComputationError::DurationVectorMismatch {
            expected: n,
            actual: durations.len(),
        });
    }

    let mut scaled = Vec::with_capacity(n);
    for (i, activity) in network.activities().iter().enumerate() {
        let duration = calendars.scale_duration(activity.calendar.as_deref(), durations[i]);
        if !duration.is_finite() {
            return Err(ComputationError::NonFiniteValue(activity.id.clone()));
        }
        if duration < 0.0 {
            return Err(ComputationError::NegativeDuration(activity.id.clone()));
        }
        scaled.push(duration);
    }

    let mut early_start = vec![0.0_f64; n];
    let mut early_finish = vec![0.0_f64; n];
    for &i in network.topo_order() {
        let mut es = 0.0_f64;
        for edge in network.predecessors_of(i) {
            es = es.max(early_start_candidate(
                edge,
                &early_start,
                &early_finish,
                scaled[i],
            ));
        }
        let ef = es + scaled[i];
        if !es.is_finite() || !ef.is_finite() {
            return Err(ComputationError::NonFiniteValue(network.activity(i).id.clone()));
        }
        if ef + float_epsilon < es {
            return Err(ComputationError::NonAdvancingDates(
                network.activity(i).id.clone(),
            ));
        }
        early_start[i] = es;
        early_finish[i] = ef;
    }

    let duration_days = early_finish.iter().fold(0.0_f64, |acc, ef| acc.max(*ef));

    let mut late_start = vec![0.0_f64; n];
    let mut late_finish = vec![0.0_f64; n];
    for &i in network.topo_order().iter().rev() {
        let successors = network.successors_of(i);
        let mut lf = duration_days;
        if !successors.is_empty() {
            lf = f64::INFINITY;
            for edge in successors {
                lf = lf.min(late_finish_candidate(edge, &late_start, &late_finish, scaled[i]));
            }
        }
        if !lf.is_finite() {
            return Err(ComputationError::NonFiniteValue(network.activity(i).id.clone()));
        }
        late_finish[i] = lf;
        late_start[i] = lf - scaled[i];
    }

    let mut total_float = Vec::with_capacity(n);
    let mut critical = Vec::with_capacity(n);
    for i in 0..n {
        let float = late_start[i] - early_start[i];
        critical.push(float.abs() <= float_epsilon);
        total_float.push(float);
    }

    let free_float = compute_free_float(network, &early_start, &early_finish, duration_days);
    let critical_path = extract_critical_path(
        network,
        &scaled,
        &early_start,
        &early_finish,
        &critical,
        float_epsilon,
    );

    Ok(Schedule {
        early_start,
        early_finish,
        late_start,
        late_finish,
        total_float,
        free_float,
        critical,
        critical_path,
        duration_days,
    })
}

fn compute_free_float(
    network: &ActivityNetwork,
    early_start: &[f64],
    early_finish: &[f64],
    duration_days: f64,
) -> Vec<f64> {
    (0..network.len())
        .map(|i| {
            let successors = network.successors_of(i);
            if successors.is_empty() {
                return (duration_days - early_finish[i]).max(0.0);
            }
            successors
                .iter()
                .map(|edge| {
                    let s = edge.other;
                    match edge.kind {
                        DependencyType::FinishToStart => {
                            early_start[s] - (early_finish[i] + edge.lag_days)
                        }
                        DependencyType::StartToStart => {
                            early_start[s] - (early_start[i] + edge.lag_days)
                        }
                        DependencyType::FinishToFinish => {
                            early_finish[s] - (early_finish[i] + edge.lag_days)
                        }
                        DependencyType::StartToFinish => {
                            early_finish[s] - (early_start[i] + edge.lag_days)
                        }
                    }
                })
                .fold(f64::INFINITY, f64::min)
                .max(0.0)
        })
        .collect()
}

/// The critical path is the longest chain of critical activities whose
/// linking dependency is driving, i.e. its lag offset is fully consumed
/// so the predecessor constraint is what fixes the successor's dates.
fn extract_critical_path(
    network: &ActivityNetwork,
    durations: &[f64],
    early_start: &[f64],
    early_finish: &[f64],
    critical: &[bool],
    float_epsilon: f64,
) -> Vec<usize> {
    let n = network.len();
    let mut chain_len = vec![0_usize; n];
    let mut chain_pred: Vec<Option<usize>> = vec![None; n];

    for &i in network.topo_order() {
        if !critical[i] {
            continue;
        }
        chain_len[i] = 1;
        for edge in network.predecessors_of(i) {
            let p = edge.other;
            if !critical[p] {
                continue;
            }
            let candidate = early_start_candidate(edge, early_start, early_finish, durations[i]);
            let driving = (candidate - early_start[i]).abs() <= float_epsilon;
            if driving && chain_len[p] + 1 > chain_len[i] {
                chain_len[i] = chain_len[p] + 1;
                chain_pred[i] = Some(p);
            }
        }
    }

    // Prefer the longest chain; break ties towards the latest finish.
    let mut end = None;
    for i in 0..n {
        if chain_len[i] == 0 {
            continue;
        }
        let better = match end {
            None => true,
            Some(current) => {
                chain_len[i] > chain_len[current]
                    || (chain_len[i] == chain_len[current]
                        && early_finish[i] > early_finish[current])
            }
        };
        if better {
            end = Some(i);
        }
    }

    let mut path = Vec::new();
    let mut cursor = end;
    while let Some(i) = cursor {
        path.push(i);
        cursor = chain_pred[i];
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::activity::Activity;
    use crate::domain::calendar::{CalendarSet, WorkCalendar};
    use crate::domain::dependency::Dependency;
    use crate::test_support::on_date;

    fn network(activities: Vec<Activity>, dependencies: Vec<Dependency>) -> ActivityNetwork {
        ActivityNetwork::build(activities, &dependencies).unwrap()
    }

    fn baseline_durations(network: &ActivityNetwork) -> Vec<f64> {
        network.activities().iter().map(|a| a.duration_days).collect()
    }

    #[test]
    fn a_linear_chain_is_fully_critical() {
        let network = network(
            vec![
                Activity::new("A", 5.0),
                Activity::new("B", 3.0),
                Activity::new("C", 2.0),
            ],
            vec![
                Dependency::finish_to_start("A", "B"),
                Dependency::finish_to_start("B", "C"),
            ],
        );
        let durations = baseline_durations(&network);
        let schedule = compute(&network, &CalendarSet::standard(), &durations, 1e-6).unwrap();

        assert_eq!(schedule.duration_days, 10.0);
        assert_eq!(schedule.early_start, vec![0.0, 5.0, 8.0]);
        assert_eq!(schedule.early_finish, vec![5.0, 8.0, 10.0]);
        assert!(schedule.total_float.iter().all(|f| f.abs() < 1e-9));
        assert!(schedule.critical.iter().all(|c| *c));
        assert_eq!(schedule.critical_path, vec![0, 1, 2]);
    }

    #[test]
    fn float_is_zero_exactly_on_the_critical_path() {
        // A(5) and B(3) both feed C(2); B has two days of slack.
        let network = network(
            vec![
                Activity::new("A", 5.0),
                Activity::new("B", 3.0),
                Activity::new("C", 2.0),
            ],
            vec![
                Dependency::finish_to_start("A", "C"),
                Dependency::finish_to_start("B", "C"),
            ],
        );
        let durations = baseline_durations(&network);
        let schedule = compute(&network, &CalendarSet::standard(), &durations, 1e-6).unwrap();

        assert_eq!(schedule.duration_days, 7.0);
        assert!(schedule.critical[0]);
        assert!(!schedule.critical[1]);
        assert!(schedule.critical[2]);
        assert_eq!(schedule.total_float[1], 2.0);
        assert_eq!(schedule.free_float[1], 2.0);
        assert_eq!(schedule.critical_path, vec![0, 2]);
    }

    #[test]
    fn start_to_start_lag_governs_the_successor_start() {
        let network = network(
            vec![Activity::new("A", 5.0), Activity::new("B", 3.0)],
            vec![Dependency::new("A", "B", DependencyType::StartToStart, 2.0)],
        );
        let durations = baseline_durations(&network);
        let schedule = compute(&network, &CalendarSet::standard(), &durations, 1e-6).unwrap();

        assert_eq!(schedule.early_start[1], 2.0);
        assert_eq!(schedule.early_finish[1], 5.0);
        assert_eq!(schedule.duration_days, 5.0);
        assert!(schedule.critical.iter().all(|c| *c));
        assert_eq!(schedule.critical_path, vec![0, 1]);
    }

    #[test]
    fn finish_to_finish_anchors_the_successor_finish() {
        let network = network(
            vec![Activity::new("A", 5.0), Activity::new("B", 2.0)],
            vec![Dependency::new("A", "B", DependencyType::FinishToFinish, 0.0)],
        );
        let durations = baseline_durations(&network);
        let schedule = compute(&network, &CalendarSet::standard(), &durations, 1e-6).unwrap();

        assert_eq!(schedule.early_start[1], 3.0);
        assert_eq!(schedule.early_finish[1], 5.0);
        assert!(schedule.critical.iter().all(|c| *c));
    }

    #[test]
    fn start_to_finish_anchors_the_finish_to_the_predecessor_start() {
        let network = network(
            vec![Activity::new("A", 5.0), Activity::new("B", 3.0)],
            vec![Dependency::new("A", "B", DependencyType::StartToFinish, 7.0)],
        );
        let durations = baseline_durations(&network);
        let schedule = compute(&network, &CalendarSet::standard(), &durations, 1e-6).unwrap();

        assert_eq!(schedule.early_finish[1], 7.0);
        assert_eq!(schedule.early_start[1], 4.0);
        assert_eq!(schedule.duration_days, 7.0);
    }

    #[test]
    fn a_negative_lag_pulls_the_successor_forward() {
        let network = network(
            vec![Activity::new("A", 5.0), Activity::new("B", 3.0)],
            vec![Dependency::new("A", "B", DependencyType::FinishToStart, -2.0)],
        );
        let durations = baseline_durations(&network);
        let schedule = compute(&network, &CalendarSet::standard(), &durations, 1e-6).unwrap();

        assert_eq!(schedule.early_start[1], 3.0);
        assert_eq!(schedule.early_finish[1], 6.0);
    }

    #[test]
    fn the_governing_constraint_wins_when_several_apply() {
        // FS from A says start at 5; SS from B with lag 1 says start at 1.
        let network = network(
            vec![
                Activity::new("A", 5.0),
                Activity::new("B", 4.0),
                Activity::new("C", 2.0),
            ],
            vec![
                Dependency::finish_to_start("A", "C"),
                Dependency::new("B", "C", DependencyType::StartToStart, 1.0),
            ],
        );
        let durations = baseline_durations(&network);
        let schedule = compute(&network, &CalendarSet::standard(), &durations, 1e-6).unwrap();

        assert_eq!(schedule.early_start[2], 5.0);
        assert_eq!(schedule.critical_path, vec![0, 2]);
    }

    #[test]
    fn activity_calendars_rescale_durations_onto_the_primary_axis() {
        let calendars = CalendarSet::standard()
            .with_calendar(WorkCalendar::standard("extended").with_hours_per_day(16.0));
        let network = network(
            vec![
                Activity::new("A", 2.0).with_calendar("extended"),
                Activity::new("B", 1.0),
            ],
            vec![Dependency::finish_to_start("A", "B")],
        );
        let durations = baseline_durations(&network);
        let schedule = compute(&network, &calendars, &durations, 1e-6).unwrap();

        // Two 16-hour days are four 8-hour days of work.
        assert_eq!(schedule.early_finish[0], 4.0);
        assert_eq!(schedule.duration_days, 5.0);
    }

    #[test]
    fn a_mismatched_duration_vector_is_rejected() {
        let network = network(vec![Activity::new("A", 5.0)], vec![]);
        let error = compute(&network, &CalendarSet::standard(), &[], 1e-6).unwrap_err();
        assert_eq!(
            error,
            ComputationError::DurationVectorMismatch {
                expected: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn negative_and_non_finite_durations_are_rejected() {
        let network = network(vec![Activity::new("A", 5.0)], vec![]);
        assert_eq!(
            compute(&network, &CalendarSet::standard(), &[-1.0], 1e-6).unwrap_err(),
            ComputationError::NegativeDuration("A".to_string())
        );
        assert_eq!(
            compute(&network, &CalendarSet::standard(), &[f64::NAN], 1e-6).unwrap_err(),
            ComputationError::NonFiniteValue("A".to_string())
        );
    }

    #[test]
    fn schedule_dates_follow_the_calendar() {
        let network = network(
            vec![
                Activity::new("A", 5.0),
                Activity::new("B", 3.0),
                Activity::new("C", 2.0),
            ],
            vec![
                Dependency::finish_to_start("A", "B"),
                Dependency::finish_to_start("B", "C"),
            ],
        );
        let calendars = CalendarSet::standard();
        let durations = baseline_durations(&network);
        let schedule = compute(&network, &calendars, &durations, 1e-6).unwrap();
        let start = on_date(2026, 1, 5); // Monday

        assert_eq!(schedule.finish_date(start, &calendars), on_date(2026, 1, 16));

        let dates = schedule.activity_dates(&network, &calendars, start);
        assert_eq!(dates[0].early_start, on_date(2026, 1, 5));
        assert_eq!(dates[0].early_finish, on_date(2026, 1, 9));
        assert_eq!(dates[1].early_start, on_date(2026, 1, 12));
        assert_eq!(dates[2].early_finish, on_date(2026, 1, 16));
        assert!(dates.iter().all(|d| d.critical));
    }
}
