//! Scan orchestration
//!
//! - [`orchestrator`] runs one fetch-then-broadcast cycle
//! - [`schedule`] fires cycles on a timer and after startup

pub mod orchestrator;
pub mod schedule;

pub use orchestrator::{CycleOutcome, CycleReport, ScanOrchestrator, RECONNECTING_MESSAGE};
pub use schedule::{ScanSchedule, ScheduleConfig, ScheduleHandle};
