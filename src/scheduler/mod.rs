// Scheduler module
// Fixed-step time grid shared by the animation and sonification drivers

pub mod timeline;

pub use timeline::{run, Onset, RunSummary, ScheduleError, ScheduleSettings, Scheduler, Tick};
