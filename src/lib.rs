//! Schedule risk core: Monte Carlo simulation and time-impact analysis
//! over CPM activity networks.
//!
//! The crate answers two questions about a project network with
//! uncertain activity durations: what is the distribution of the project
//! finish date, and how much of an actual slippage is attributable to a
//! given delaying event. Both reduce to repeated Critical-Path-Method
//! passes over an immutable activity network with calendar-aware date
//! arithmetic.
//!
//! The core is a pure computation: it receives a read-only
//! [`NetworkSnapshot`] from the caller's network source, computes, and
//! returns a result value. Persistence, rendering and file formats stay
//! with the caller.
//!
//! # Entry points
//!
//! - [`validate_network`]: pre-flight integrity check
//! - [`run_simulation`] / [`run_simulation_with_cancellation`]: Monte
//!   Carlo schedule risk simulation
//! - [`run_time_impact_analysis`]: fragnet delay analysis

pub mod domain;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

pub use domain::activity::Activity;
pub use domain::calendar::{CalendarError, CalendarException, CalendarSet, WorkCalendar};
pub use domain::dependency::{Dependency, DependencyType};
pub use domain::estimate::{EstimateError, ThreePointEstimate};
pub use domain::fragment::{
    DelayClassification, DelayPolicy, Fragment, FragmentImpact, TimeImpactResult,
};
pub use domain::project::NetworkSnapshot;
pub use domain::simulation::{
    ActivityCriticality, DistributionType, IterationOutcome, MAX_ITERATIONS, MIN_ITERATIONS,
    PercentileEstimate, RunStatus, SimulationConfig, SimulationResult,
};
pub use services::cpm::{ActivitySchedule, ComputationError, Schedule};
pub use services::fragnet::{TimeImpactError, run_time_impact_analysis};
pub use services::monte_carlo::{
    CancellationToken, SimulationError, run_simulation, run_simulation_with_cancellation,
};
pub use services::network::{
    ActivityNetwork, NetworkError, ValidationIssue, ValidationIssueKind, validate_network,
};
pub use services::sampler::{DistributionSampler, DurationSampler, SamplerError};
