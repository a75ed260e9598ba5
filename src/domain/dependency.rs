use std::fmt;

use serde::{Deserialize, Serialize};

/// Precedence relationship between two activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyType {
    /// Successor starts after the predecessor finishes.
    FinishToStart,
    /// Successor starts after the predecessor starts.
    StartToStart,
    /// Successor finishes after the predecessor finishes.
    FinishToFinish,
    /// Successor finishes after the predecessor starts.
    StartToFinish,
}

impl DependencyType {
    pub fn code(&self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "FS",
            DependencyType::StartToStart => "SS",
            DependencyType::FinishToFinish => "FF",
            DependencyType::StartToFinish => "SF",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A typed, lagged edge of the activity network.
///
/// Lag is in working days and may be negative (a lead).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub predecessor: String,
    pub successor: String,
    pub kind: DependencyType,
    pub lag_days: f64,
}

impl Dependency {
    pub fn new(
        predecessor: impl Into<String>,
        successor: impl Into<String>,
        kind: DependencyType,
        lag_days: f64,
    ) -> Self {
        Self {
            predecessor: predecessor.into(),
            successor: successor.into(),
            kind,
            lag_days,
        }
    }

    /// The common case: finish-to-start with no lag.
    pub fn finish_to_start(predecessor: impl Into<String>, successor: impl Into<String>) -> Self {
        Self::new(predecessor, successor, DependencyType::FinishToStart, 0.0)
    }
}
