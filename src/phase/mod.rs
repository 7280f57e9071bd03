//! Phase model
//!
//! - [`Phase`]: progress accumulated within one growth segment and the
//!   day-step contract
//! - [`Criterion`]: the closed set of completion criteria
//! - [`Drivers`]: the external rate providers a phase reads

pub mod criterion;
pub mod drivers;
pub mod state;

pub use criterion::{CounterState, Criterion};
pub use drivers::{Counter, Drivers};
pub use state::{Phase, PhaseRow};
