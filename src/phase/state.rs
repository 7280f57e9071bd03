//! Phase state and the day-step contract
//!
//! A [`Phase`] owns the progress accumulated while it is current. Each
//! simulated day it is asked to consume a fraction of the day's rate;
//! when its criterion is met it reports the fraction it did not need, which
//! the orchestrator hands to the next phase.

use phenology_core::config::PhaseConfig;
use serde::Serialize;

use crate::error::PhaseError;

use super::criterion::{CounterGoal, Criterion};
use super::drivers::{Counter, Drivers};

/// One configured growth phase and its accumulated progress.
#[derive(Debug, Clone)]
pub struct Phase {
    name: String,
    start: String,
    end: String,
    criterion: Criterion,
    emerged: bool,
    stressed: bool,
    /// Progress accumulated since entry (thermal time)
    progress: f64,
    /// Progress added by the most recent step
    today: f64,
}

/// Read-only row describing a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseRow {
    /// 1-based phase number
    pub number: usize,
    /// Phase name
    pub name: String,
    /// Start stage
    pub start: String,
    /// End stage
    pub end: String,
    /// Criterion tag
    pub criterion: &'static str,
}

impl Phase {
    /// Builds a phase from its configuration.
    #[must_use]
    pub fn from_config(config: &PhaseConfig) -> Self {
        Self {
            name: config.name.clone(),
            start: config.start.clone(),
            end: config.end.clone(),
            criterion: Criterion::from(&config.criterion),
            emerged: config.emerged,
            stressed: config.stressed,
            progress: 0.0,
            today: 0.0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn start_stage(&self) -> &str {
        &self.start
    }

    #[must_use]
    pub fn end_stage(&self) -> &str {
        &self.end
    }

    #[must_use]
    pub const fn criterion(&self) -> &Criterion {
        &self.criterion
    }

    /// Whether the plant counts as emerged while this phase is current.
    #[must_use]
    pub const fn is_emerged(&self) -> bool {
        self.emerged
    }

    #[must_use]
    pub const fn is_stressed(&self) -> bool {
        self.stressed
    }

    /// Progress accumulated since entry.
    #[must_use]
    pub const fn progress(&self) -> f64 {
        self.progress
    }

    /// Progress added by the most recent step.
    #[must_use]
    pub const fn progress_today(&self) -> f64 {
        self.today
    }

    /// Thermal-time target, if the criterion has one.
    #[must_use]
    pub const fn target(&self) -> Option<f64> {
        self.criterion.target()
    }

    /// Destination of a redirect phase.
    #[must_use]
    pub fn goto(&self) -> Option<&str> {
        match &self.criterion {
            Criterion::Redirect { goto } => Some(goto),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.criterion, Criterion::Terminal)
    }

    /// Fraction of the phase complete, in `[0, 1]`.
    ///
    /// Always `0.0` for terminal and redirect phases, and for a generic
    /// phase without a target.
    #[must_use]
    pub fn fraction_complete(&self) -> f64 {
        match &self.criterion {
            Criterion::Generic { target: Some(target) } if *target > 0.0 => {
                (self.progress / target).clamp(0.0, 1.0)
            }
            Criterion::Generic { .. } | Criterion::Terminal | Criterion::Redirect { .. } => 0.0,
            _ => self.criterion.counter_state().map_or(0.0, |s| s.fraction),
        }
    }

    /// Whether [`Phase::set_fraction_complete`] can succeed.
    #[must_use]
    pub const fn accepts_fraction(&self) -> bool {
        match self.criterion {
            Criterion::Generic { target } => target.is_some(),
            Criterion::Terminal | Criterion::Redirect { .. } => false,
            Criterion::LeafCount(_) | Criterion::NodeCount { .. } | Criterion::Expression { .. } => {
                true
            }
        }
    }

    /// Sets the fraction complete.
    ///
    /// For a generic phase this sets progress to `target × fraction`.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::FractionNotSettable`] for terminal and redirect
    /// phases and [`PhaseError::MissingTarget`] for a generic phase without
    /// a target.
    pub fn set_fraction_complete(&mut self, fraction: f64) -> Result<(), PhaseError> {
        let fraction = fraction.clamp(0.0, 1.0);
        match &mut self.criterion {
            Criterion::Generic { target: Some(target) } => {
                self.progress = *target * fraction;
                Ok(())
            }
            Criterion::Generic { target: None } => Err(PhaseError::MissingTarget {
                phase: self.name.clone(),
            }),
            Criterion::Terminal | Criterion::Redirect { .. } => {
                Err(PhaseError::FractionNotSettable {
                    phase: self.name.clone(),
                })
            }
            Criterion::LeafCount(state)
            | Criterion::NodeCount { state, .. }
            | Criterion::Expression { state, .. } => {
                state.set(fraction);
                Ok(())
            }
        }
    }

    /// Fills the phase as if it had just completed, returning the progress
    /// added. Terminal and redirect phases are left untouched.
    pub fn fill(&mut self) -> f64 {
        if let Some(target) = self.target() {
            let added = (target - self.progress).max(0.0);
            self.progress = target;
            return added;
        }
        if let Some(state) = self.criterion.counter_state_mut() {
            state.set(1.0);
        }
        0.0
    }

    /// Removes `amount` of progress without leaving the phase.
    ///
    /// Counter phases also forget their retained fraction, so that it is
    /// recomputed from the counters on the next step.
    pub fn rewind_progress(&mut self, amount: f64) {
        self.progress = (self.progress - amount).max(0.0);
        if let Some(state) = self.criterion.counter_state_mut() {
            state.clear_fraction();
        }
    }

    /// Clears all accumulated progress.
    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.today = 0.0;
        self.criterion.reset();
    }

    /// Today's rate of progress for this phase.
    fn rate(&self, drivers: &dyn Drivers) -> f64 {
        let thermal_time = drivers.thermal_time();
        if self.stressed {
            thermal_time * drivers.stress_multiplier().unwrap_or(1.0)
        } else {
            thermal_time
        }
    }

    /// Consumes `day_fraction` of today's rate.
    ///
    /// Returns `Some(leftover)` when the phase completed, where `leftover`
    /// is the part of `day_fraction` it did not need, and `None` otherwise.
    ///
    /// # Errors
    ///
    /// - [`PhaseError::MissingTarget`] for a generic phase without a target
    /// - [`PhaseError::RedirectStepped`] for a redirect phase
    /// - [`PhaseError::MissingDriver`] when a counter criterion has no value
    pub fn step(
        &mut self,
        day_fraction: f64,
        drivers: &dyn Drivers,
    ) -> Result<Option<f64>, PhaseError> {
        let rate = self.rate(drivers);
        match &self.criterion {
            Criterion::Generic { target } => {
                let target = target.ok_or_else(|| PhaseError::MissingTarget {
                    phase: self.name.clone(),
                })?;
                Ok(self.step_thermal(target, rate, day_fraction))
            }
            Criterion::Terminal => {
                self.today = rate * day_fraction;
                self.progress += self.today;
                Ok(None)
            }
            Criterion::Redirect { .. } => Err(PhaseError::RedirectStepped {
                phase: self.name.clone(),
            }),
            Criterion::LeafCount(_) | Criterion::NodeCount { .. } | Criterion::Expression { .. } => {
                self.step_counter(rate, day_fraction, drivers)
            }
        }
    }

    fn step_thermal(&mut self, target: f64, rate: f64, day_fraction: f64) -> Option<f64> {
        self.today = rate * day_fraction;
        self.progress += self.today;
        if self.progress <= target {
            return None;
        }

        // Overshoot goes back to the next phase as a fraction of the day.
        let excess = self.progress - target;
        self.progress = target;
        self.today -= excess;
        let leftover = if rate > 0.0 { excess / rate } else { 0.0 };
        Some(leftover.clamp(0.0, day_fraction))
    }

    fn step_counter(
        &mut self,
        rate: f64,
        day_fraction: f64,
        drivers: &dyn Drivers,
    ) -> Result<Option<f64>, PhaseError> {
        let (value, final_leaves) = {
            let Some(goal) = self.criterion.goal() else {
                return Ok(None);
            };
            let counter = goal.counter();
            let value = self.read(drivers, counter)?;
            let final_leaves = match goal {
                CounterGoal::Leaves => self.read(drivers, Counter::FinalLeafNumber)?,
                _ => 0.0,
            };
            (value, final_leaves)
        };

        let Some(state) = self.criterion.counter_state_mut() else {
            return Ok(None);
        };
        let at_entry = *state.at_entry.get_or_insert(value);

        let raw = match self.criterion.goal() {
            Some(goal) => goal.raw_fraction(value, at_entry, final_leaves),
            None => return Ok(None),
        };

        self.today = rate * day_fraction;
        self.progress += self.today;

        let Some(state) = self.criterion.counter_state_mut() else {
            return Ok(None);
        };
        let fraction = state.observe(raw);
        if fraction < 1.0 {
            state.roll();
            return Ok(None);
        }

        let share = state.overshoot_share(raw);
        state.roll();
        let unused = self.today * share;
        self.today -= unused;
        self.progress -= unused;
        Ok(Some(day_fraction * share))
    }

    fn read(&self, drivers: &dyn Drivers, counter: Counter<'_>) -> Result<f64, PhaseError> {
        drivers
            .counter(counter)
            .ok_or_else(|| PhaseError::MissingDriver {
                phase: self.name.clone(),
                driver: counter.to_string(),
            })
    }

    /// Describes this phase as a table row.
    #[must_use]
    pub fn row(&self, number: usize) -> PhaseRow {
        PhaseRow {
            number,
            name: self.name.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            criterion: self.criterion_kind(),
        }
    }

    const fn criterion_kind(&self) -> &'static str {
        match self.criterion {
            Criterion::Generic { .. } => "generic",
            Criterion::Terminal => "terminal",
            Criterion::Redirect { .. } => "redirect",
            Criterion::LeafCount(_) => "leaf_count",
            Criterion::NodeCount { .. } => "node_count",
            Criterion::Expression { .. } => "expression",
        }
    }
}
