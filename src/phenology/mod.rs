//! Phenology orchestrator
//!
//! Drives a plant through its ordered phase list one simulated day at a
//! time.
//!
//! # Architecture
//!
//! - [`Phenology`]: phase list, current-phase pointer, thermal-time totals
//!   and the daily step ([`engine`])
//! - Temporal queries such as on-day-of, in-phase, between and beyond
//!   ([`queries`])
//! - Biomass-removal rewind and explicit stage setting ([`rewind`])
//! - [`PhaseLookup`]: name → index maps built once per configuration
//! - [`StagesToday`]: the stages reached during the current day
//! - [`Notification`]: what each mutating call published

pub mod engine;
pub mod lookup;
pub mod notification;
pub mod queries;
pub mod rewind;
pub mod stages_today;

pub use engine::Phenology;
pub use lookup::PhaseLookup;
pub use notification::{Notification, PhaseChange};
pub use queries::PhenologySnapshot;
pub use stages_today::StagesToday;
