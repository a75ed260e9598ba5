use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::dependency::DependencyType;

/// How long a delay fragment lasts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FragmentImpact {
    /// Working days on the primary calendar.
    Duration(f64),
    /// A dated window, resolved to working days at analysis time.
    Window { start: NaiveDate, end: NaiveDate },
}

/// A delay event spliced into a copy of the baseline network.
///
/// Endpoints may name baseline activities or other fragments of the same
/// batch; fragments therefore form their own sub-graph, validated for
/// acyclicity together with the rest of the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub name: String,
    pub predecessor: String,
    pub successor: String,
    pub impact: FragmentImpact,
    /// Relationship used to wire the predecessor to the fragment.
    pub kind: DependencyType,
    pub lag_days: f64,
}

impl Fragment {
    /// A finish-to-start delay of `days` working days between two tasks.
    pub fn delay(
        name: impl Into<String>,
        predecessor: impl Into<String>,
        successor: impl Into<String>,
        days: f64,
    ) -> Self {
        Self {
            name: name.into(),
            predecessor: predecessor.into(),
            successor: successor.into(),
            impact: FragmentImpact::Duration(days),
            kind: DependencyType::FinishToStart,
            lag_days: 0.0,
        }
    }

    pub fn with_kind(mut self, kind: DependencyType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_lag(mut self, lag_days: f64) -> Self {
        self.lag_days = lag_days;
        self
    }

    pub fn with_window(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.impact = FragmentImpact::Window { start, end };
        self
    }
}

/// How the net delay relates to what would have happened anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayClassification {
    /// The fragment does not move project completion.
    NoImpact,
    /// The whole delay is absorbed by concurrent or pacing delays.
    FullyConcurrent,
    /// Part of the delay overlaps other causes.
    PartiallyConcurrent,
    /// The fragment alone accounts for the slippage.
    Independent,
}

/// Attribution policy for concurrent and pacing delay.
///
/// The source system leaves the exact split configurable, so the
/// thresholds are parameters rather than constants: overlap below
/// `concurrent_threshold_days` is ignored, and up to
/// `pacing_allowance_days` of the non-concurrent remainder is treated as
/// pacing (deliberate slack absorption by the owner).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayPolicy {
    pub concurrent_threshold_days: f64,
    pub pacing_allowance_days: f64,
}

impl DelayPolicy {
    pub fn classify(&self, delay_days: f64, net_delay_days: f64, epsilon: f64) -> DelayClassification {
        if delay_days <= epsilon {
            DelayClassification::NoImpact
        } else if net_delay_days <= epsilon {
            DelayClassification::FullyConcurrent
        } else if net_delay_days + epsilon < delay_days {
            DelayClassification::PartiallyConcurrent
        } else {
            DelayClassification::Independent
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeImpactResult {
    pub baseline_completion: NaiveDate,
    pub impacted_completion: NaiveDate,
    /// Working-day slippage caused by the spliced fragments.
    pub delay_days: f64,
    /// Portion that other, independent delays would have caused anyway.
    pub concurrent_delay_days: f64,
    /// Portion attributed to deliberate slack absorption.
    pub pacing_delay_days: f64,
    /// delay - concurrent - pacing, floored at zero.
    pub net_delay_days: f64,
    pub classification: DelayClassification,
}
