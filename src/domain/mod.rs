pub mod activity;
pub mod calendar;
pub mod dependency;
pub mod estimate;
pub mod fragment;
pub mod project;
pub mod simulation;
