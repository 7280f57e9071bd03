//! `phenology` - daily crop phenology engine
//!
//! Models a plant's progression through an ordered list of growth phases,
//! one simulated day at a time: completion criteria, carry-over of unused
//! day-fractions, redirects, explicit stage changes and biomass-loss
//! rewinds. The binary wraps the engine with a schedule-driven simulation
//! clock and a CLI.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod phase;
pub mod phenology;
pub mod simulation;
