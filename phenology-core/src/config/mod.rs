//! Configuration schema
//!
//! `schema` describes a crop's ordered phase list and rewind settings;
//! `schedule` describes the day-by-day driver input consumed by the
//! simulation clock.

pub mod schedule;
pub mod schema;

pub use schedule::{DayDrivers, DayRecord, ManagementAction, ScheduleConfig, SowingConfig};
pub use schema::*;
