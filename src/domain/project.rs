use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::activity::Activity;
use crate::domain::calendar::CalendarSet;
use crate::domain::dependency::Dependency;

/// Read-only view of a project network as supplied by the network source.
///
/// The core never mutates a snapshot; simulations and time-impact runs
/// clone what they need and return result values to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub name: String,
    pub activities: Vec<Activity>,
    pub dependencies: Vec<Dependency>,
    pub calendars: CalendarSet,
    pub start_date: NaiveDate,
}

impl NetworkSnapshot {
    pub fn new(name: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            activities: Vec::new(),
            dependencies: Vec::new(),
            calendars: CalendarSet::standard(),
            start_date,
        }
    }

    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_calendars(mut self, calendars: CalendarSet) -> Self {
        self.calendars = calendars;
        self
    }
}
