use std::collections::HashSet;

use thiserror::Error;

use crate::domain::activity::Activity;
use crate::domain::calendar::CalendarError;
use crate::domain::dependency::{Dependency, DependencyType};
use crate::domain::fragment::{DelayPolicy, Fragment, FragmentImpact, TimeImpactResult};
use crate::domain::project::NetworkSnapshot;
use crate::services::cpm::{self, ComputationError, Schedule};
use crate::services::network::{ActivityNetwork, NetworkError};

/// Working-day tolerance for delay comparisons.
const DELAY_EPSILON: f64 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeImpactError {
    #[error("no fragments supplied")]
    NoFragments,
    #[error("fragment `{0}` collides with an existing id")]
    DuplicateFragment(String),
    #[error("fragment `{fragment}` references unknown task `{task}`")]
    UnknownTask { fragment: String, task: String },
    #[error("fragment `{0}` has an invalid duration")]
    InvalidImpact(String),
    #[error("fragment `{0}` has a window that starts after it ends")]
    InvertedWindow(String),
    #[error("invalid network: {0}")]
    Network(#[from] NetworkError),
    #[error("invalid calendar: {0}")]
    Calendar(#[from] CalendarError),
    #[error("schedule computation failed: {0}")]
    Computation(#[from] ComputationError),
}

/// Splices delay fragments into a copy of the baseline network, reruns
/// CPM and classifies the resulting slippage.
///
/// The baseline snapshot is never mutated. With an as-built snapshot the
/// same network minus the fragments (matched by name) shows what other
/// delays would have caused anyway; that overlap is concurrent delay,
/// and the policy may attribute part of the remainder to pacing.
pub fn run_time_impact_analysis(
    snapshot: &NetworkSnapshot,
    fragments: &[Fragment],
    as_built: Option<&NetworkSnapshot>,
    policy: &DelayPolicy,
) -> Result<TimeImpactResult, TimeImpactError> {
    if fragments.is_empty() {
        return Err(TimeImpactError::NoFragments);
    }
    snapshot.calendars.validate()?;

    let baseline = deterministic_schedule(snapshot)?;
    let (activities, dependencies) = splice_fragments(snapshot, fragments)?;
    let impacted_network = ActivityNetwork::build(activities, &dependencies)?;
    let impacted = compute_schedule(&impacted_network, snapshot)?;

    let delay_days = (impacted.duration_days - baseline.duration_days).max(0.0);

    let (concurrent_delay_days, pacing_delay_days) = match as_built {
        Some(as_built) if delay_days > DELAY_EPSILON => {
            let independent = independent_finish(as_built, fragments)?;
            let overlap = (independent - baseline.duration_days).clamp(0.0, delay_days);
            let concurrent = if overlap >= policy.concurrent_threshold_days {
                overlap
            } else {
                0.0
            };
            let pacing = policy
                .pacing_allowance_days
                .min(delay_days - concurrent)
                .max(0.0);
            (concurrent, pacing)
        }
        _ => (0.0, 0.0),
    };

    let net_delay_days = (delay_days - concurrent_delay_days - pacing_delay_days).max(0.0);
    let classification = policy.classify(delay_days, net_delay_days, DELAY_EPSILON);

    tracing::debug!(
        project = %snapshot.name,
        fragments = fragments.len(),
        delay_days,
        concurrent_delay_days,
        net_delay_days,
        "time impact analysis completed"
    );

    Ok(TimeImpactResult {
        baseline_completion: snapshot
            .calendars
            .finish_date_at(snapshot.start_date, baseline.duration_days),
        impacted_completion: snapshot
            .calendars
            .finish_date_at(snapshot.start_date, impacted.duration_days),
        delay_days,
        concurrent_delay_days,
        pacing_delay_days,
        net_delay_days,
        classification,
    })
}

fn deterministic_schedule(snapshot: &NetworkSnapshot) -> Result<Schedule, TimeImpactError> {
    let network = ActivityNetwork::build(snapshot.activities.clone(), &snapshot.dependencies)?;
    compute_schedule(&network, snapshot)
}

fn compute_schedule(
    network: &ActivityNetwork,
    snapshot: &NetworkSnapshot,
) -> Result<Schedule, TimeImpactError> {
    let durations: Vec<f64> = network
        .activities()
        .iter()
        .map(|activity| activity.duration_days)
        .collect();
    Ok(cpm::compute(
        network,
        &snapshot.calendars,
        &durations,
        DELAY_EPSILON,
    )?)
}

/// Clones the baseline activities and wires every fragment in as a new
/// node: the declared dependency type and lag connect the predecessor to
/// the fragment, and the fragment feeds its successor finish-to-start.
/// Endpoints may name other fragments of the same batch.
fn splice_fragments(
    snapshot: &NetworkSnapshot,
    fragments: &[Fragment],
) -> Result<(Vec<Activity>, Vec<Dependency>), TimeImpactError> {
    let mut known: HashSet<&str> = snapshot
        .activities
        .iter()
        .map(|activity| activity.id.as_str())
        .collect();
    for fragment in fragments {
        if !known.insert(fragment.name.as_str()) {
            return Err(TimeImpactError::DuplicateFragment(fragment.name.clone()));
        }
    }

    let mut activities = snapshot.activities.clone();
    let mut dependencies = snapshot.dependencies.clone();
    for fragment in fragments {
        for endpoint in [&fragment.predecessor, &fragment.successor] {
            if !known.contains(endpoint.as_str()) {
                return Err(TimeImpactError::UnknownTask {
                    fragment: fragment.name.clone(),
                    task: endpoint.clone(),
                });
            }
        }

        let duration_days = resolve_impact(snapshot, fragment)?;
        activities.push(Activity::new(fragment.name.clone(), duration_days));
        dependencies.push(Dependency::new(
            fragment.predecessor.clone(),
            fragment.name.clone(),
            fragment.kind,
            fragment.lag_days,
        ));
        dependencies.push(Dependency::new(
            fragment.name.clone(),
            fragment.successor.clone(),
            DependencyType::FinishToStart,
            0.0,
        ));
    }
    Ok((activities, dependencies))
}

fn resolve_impact(snapshot: &NetworkSnapshot, fragment: &Fragment) -> Result<f64, TimeImpactError> {
    match fragment.impact {
        FragmentImpact::Duration(days) => {
            if !days.is_finite() || days < 0.0 {
                return Err(TimeImpactError::InvalidImpact(fragment.name.clone()));
            }
            Ok(days)
        }
        FragmentImpact::Window { start, end } => {
            if end < start {
                return Err(TimeImpactError::InvertedWindow(fragment.name.clone()));
            }
            Ok(f64::from(
                snapshot.calendars.primary().count_working_days(start, end),
            ))
        }
    }
}

/// Project finish of the as-built network with this analysis' fragments
/// removed: what the remaining, independent delays push on their own.
fn independent_finish(
    as_built: &NetworkSnapshot,
    fragments: &[Fragment],
) -> Result<f64, TimeImpactError> {
    let removed: HashSet<&str> = fragments.iter().map(|f| f.name.as_str()).collect();
    let activities: Vec<Activity> = as_built
        .activities
        .iter()
        .filter(|activity| !removed.contains(activity.id.as_str()))
        .cloned()
        .collect();
    let dependencies: Vec<Dependency> = as_built
        .dependencies
        .iter()
        .filter(|dependency| {
            !removed.contains(dependency.predecessor.as_str())
                && !removed.contains(dependency.successor.as_str())
        })
        .cloned()
        .collect();

    let network = ActivityNetwork::build(activities, &dependencies)?;
    let schedule = compute_schedule(&network, as_built)?;
    Ok(schedule.duration_days)
}
