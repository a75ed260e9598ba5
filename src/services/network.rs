use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::domain::activity::Activity;
use crate::domain::dependency::{Dependency, DependencyType};
use crate::domain::project::NetworkSnapshot;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("network has no activities")]
    Empty,
    #[error("duplicate activity id `{0}`")]
    DuplicateActivity(String),
    #[error("dependency references unknown activity `{0}`")]
    UnknownActivity(String),
    #[error("dependency graph has a cycle")]
    CyclicDependencies,
}

/// One incoming or outgoing edge, seen from a single activity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DependencyEdge {
    /// Arena index of the activity on the other end.
    pub other: usize,
    pub kind: DependencyType,
    pub lag_days: f64,
}

/// Immutable activity network, built once per run.
///
/// Activities live in an arena indexed by position; dependencies are
/// stored as index pairs, which keeps cloning and topological iteration
/// cheap and avoids ownership cycles. The topological order is computed
/// once at build time and reused by every CPM pass.
#[derive(Debug, Clone)]
pub struct ActivityNetwork {
    activities: Vec<Activity>,
    index_by_id: HashMap<String, usize>,
    predecessors: Vec<Vec<DependencyEdge>>,
    successors: Vec<Vec<DependencyEdge>>,
    topo_order: Vec<usize>,
}

impl ActivityNetwork {
    /// Builds and validates the network. A cyclic dependency set rejects
    /// the whole network; no partial network is ever returned.
    pub fn build(
        activities: Vec<Activity>,
        dependencies: &[Dependency],
    ) -> Result<Self, NetworkError> {
        if activities.is_empty() {
            return Err(NetworkError::Empty);
        }

        let mut index_by_id = HashMap::with_capacity(activities.len());
        for (index, activity) in activities.iter().enumerate() {
            if index_by_id.insert(activity.id.clone(), index).is_some() {
                return Err(NetworkError::DuplicateActivity(activity.id.clone()));
            }
        }

        let mut predecessors: Vec<Vec<DependencyEdge>> = vec![Vec::new(); activities.len()];
        let mut successors: Vec<Vec<DependencyEdge>> = vec![Vec::new(); activities.len()];
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(activities.len(), dependencies.len());
        let nodes: Vec<NodeIndex> = (0..activities.len()).map(|i| graph.add_node(i)).collect();

        for dependency in dependencies {
            let pred = *index_by_id
                .get(&dependency.predecessor)
                .ok_or_else(|| NetworkError::UnknownActivity(dependency.predecessor.clone()))?;
            let succ = *index_by_id
                .get(&dependency.successor)
                .ok_or_else(|| NetworkError::UnknownActivity(dependency.successor.clone()))?;
            predecessors[succ].push(DependencyEdge {
                other: pred,
                kind: dependency.kind,
                lag_days: dependency.lag_days,
            });
            successors[pred].push(DependencyEdge {
                other: succ,
                kind: dependency.kind,
                lag_days: dependency.lag_days,
            });
            graph.add_edge(nodes[pred], nodes[succ], ());
        }

        let sorted = toposort(&graph, None).map_err(|_| NetworkError::CyclicDependencies)?;
        let topo_order = sorted.into_iter().map(|node| graph[node]).collect();

        Ok(Self {
            activities,
            index_by_id,
            predecessors,
            successors,
            topo_order,
        })
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn activity(&self, index: usize) -> &Activity {
        &self.activities[index]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub(crate) fn topo_order(&self) -> &[usize] {
        &self.topo_order
    }

    pub(crate) fn predecessors_of(&self, index: usize) -> &[DependencyEdge] {
        &self.predecessors[index]
    }

    pub(crate) fn successors_of(&self, index: usize) -> &[DependencyEdge] {
        &self.successors[index]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssueKind {
    EmptyNetwork,
    DuplicateActivity,
    UnknownActivity,
    UnknownCalendar,
    CyclicDependencies,
    InvalidEstimate,
    NegativeDuration,
    InvalidCalendar,
}

/// One pre-flight finding. All findings are gathered in a single pass so
/// callers can surface everything at once before committing to a long run.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub kind: ValidationIssueKind,
    pub message: String,
}

impl ValidationIssue {
    fn new(kind: ValidationIssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Pre-flight check over a network snapshot: structural integrity,
/// estimate triplets and calendars.
pub fn validate_network(snapshot: &NetworkSnapshot) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if snapshot.activities.is_empty() {
        issues.push(ValidationIssue::new(
            ValidationIssueKind::EmptyNetwork,
            "network has no activities",
        ));
    }

    let mut seen = HashMap::new();
    for activity in &snapshot.activities {
        if seen.insert(activity.id.as_str(), ()).is_some() {
            issues.push(ValidationIssue::new(
                ValidationIssueKind::DuplicateActivity,
                format!("duplicate activity id `{}`", activity.id),
            ));
        }
        if let Err(error) = activity.duration_estimate().validate() {
            issues.push(ValidationIssue::new(
                ValidationIssueKind::InvalidEstimate,
                format!("activity `{}`: {error}", activity.id),
            ));
        }
        if activity.duration_days < 0.0 || !activity.duration_days.is_finite() {
            issues.push(ValidationIssue::new(
                ValidationIssueKind::NegativeDuration,
                format!(
                    "activity `{}` has an invalid baseline duration {}",
                    activity.id, activity.duration_days
                ),
            ));
        }
        if let Some(calendar) = activity.calendar.as_deref() {
            if !snapshot.calendars.contains(calendar) {
                issues.push(ValidationIssue::new(
                    ValidationIssueKind::UnknownCalendar,
                    format!(
                        "activity `{}` references unknown calendar `{calendar}`",
                        activity.id
                    ),
                ));
            }
        }
    }

    for dependency in &snapshot.dependencies {
        for endpoint in [&dependency.predecessor, &dependency.successor] {
            if !seen.contains_key(endpoint.as_str()) {
                issues.push(ValidationIssue::new(
                    ValidationIssueKind::UnknownActivity,
                    format!("dependency references unknown activity `{endpoint}`"),
                ));
            }
        }
    }

    if let Err(error) = snapshot.calendars.validate() {
        issues.push(ValidationIssue::new(
            ValidationIssueKind::InvalidCalendar,
            error.to_string(),
        ));
    }

    // Cycle detection only makes sense once the id space is coherent.
    if issues.is_empty() {
        if let Err(NetworkError::CyclicDependencies) =
            ActivityNetwork::build(snapshot.activities.clone(), &snapshot.dependencies)
        {
            issues.push(ValidationIssue::new(
                ValidationIssueKind::CyclicDependencies,
                "dependency graph has a cycle",
            ));
        }
    }

    if issues.is_empty() { Ok(()) } else { Err(issues) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::estimate::ThreePointEstimate;
    use crate::test_support::{chain_snapshot, on_date};

    fn chain_activities() -> Vec<Activity> {
        vec![
            Activity::new("A", 5.0),
            Activity::new("B", 3.0),
            Activity::new("C", 2.0),
        ]
    }

    fn chain_dependencies() -> Vec<Dependency> {
        vec![
            Dependency::finish_to_start("A", "B"),
            Dependency::finish_to_start("B", "C"),
        ]
    }

    #[test]
    fn build_caches_a_topological_order() {
        let network = ActivityNetwork::build(chain_activities(), &chain_dependencies()).unwrap();
        assert_eq!(network.topo_order(), &[0, 1, 2]);
        assert_eq!(network.predecessors_of(1).len(), 1);
        assert_eq!(network.successors_of(1).len(), 1);
        assert_eq!(network.index_of("C"), Some(2));
    }

    #[test]
    fn an_empty_network_is_rejected() {
        let error = ActivityNetwork::build(Vec::new(), &[]).unwrap_err();
        assert_eq!(error, NetworkError::Empty);
    }

    #[test]
    fn duplicate_activity_ids_are_rejected() {
        let activities = vec![Activity::new("A", 1.0), Activity::new("A", 2.0)];
        let error = ActivityNetwork::build(activities, &[]).unwrap_err();
        assert_eq!(error, NetworkError::DuplicateActivity("A".to_string()));
    }

    #[test]
    fn an_unknown_dependency_endpoint_is_rejected() {
        let error = ActivityNetwork::build(
            vec![Activity::new("A", 1.0)],
            &[Dependency::finish_to_start("A", "missing")],
        )
        .unwrap_err();
        assert_eq!(error, NetworkError::UnknownActivity("missing".to_string()));
    }

    #[test]
    fn a_cycle_rejects_the_whole_network() {
        let activities = vec![Activity::new("A", 1.0), Activity::new("B", 1.0)];
        let dependencies = vec![
            Dependency::finish_to_start("A", "B"),
            Dependency::finish_to_start("B", "A"),
        ];
        let error = ActivityNetwork::build(activities, &dependencies).unwrap_err();
        assert_eq!(error, NetworkError::CyclicDependencies);
    }

    #[test]
    fn validate_network_accepts_a_well_formed_snapshot() {
        assert!(validate_network(&chain_snapshot()).is_ok());
    }

    #[test]
    fn validate_network_gathers_all_issues_in_one_pass() {
        let mut snapshot = chain_snapshot();
        snapshot.activities[0].estimate = Some(ThreePointEstimate::new(5.0, 3.0, 7.0));
        snapshot.activities[1].calendar = Some("missing".to_string());
        snapshot
            .dependencies
            .push(Dependency::finish_to_start("C", "ghost"));

        let issues = validate_network(&snapshot).unwrap_err();
        let kinds: Vec<_> = issues.iter().map(|issue| issue.kind.clone()).collect();
        assert!(kinds.contains(&ValidationIssueKind::InvalidEstimate));
        assert!(kinds.contains(&ValidationIssueKind::UnknownCalendar));
        assert!(kinds.contains(&ValidationIssueKind::UnknownActivity));
    }

    #[test]
    fn validate_network_reports_cycles_before_any_simulation_runs() {
        let mut snapshot = NetworkSnapshot::new("cyclic", on_date(2026, 1, 5));
        snapshot = snapshot
            .with_activity(Activity::new("A", 1.0))
            .with_activity(Activity::new("B", 1.0))
            .with_dependency(Dependency::finish_to_start("A", "B"))
            .with_dependency(Dependency::finish_to_start("B", "A"));

        let issues = validate_network(&snapshot).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, ValidationIssueKind::CyclicDependencies);
    }
}
