//! Phenology orchestration
//!
//! [`Phenology`] owns the ordered phase list and the current-phase pointer.
//! Once per simulated day [`Phenology::do_phenology`] hands the day's rate
//! to the current phase and keeps advancing for as long as completed phases
//! report leftover day-fractions, so several boundaries can be crossed in a
//! single day.

use chrono::NaiveDate;
use phenology_core::config::{PhenologyConfig, RewindConfig};
use tracing::{debug, info, trace};

use crate::error::PhaseError;
use crate::phase::{Drivers, Phase};

use super::lookup::PhaseLookup;
use super::notification::{Notification, PhaseChange};
use super::stages_today::StagesToday;

/// Development state of one plant.
///
/// Exclusively owns its phases; nothing is shared between instances.
#[derive(Debug, Clone)]
pub struct Phenology {
    pub(super) crop: String,
    pub(super) phases: Vec<Phase>,
    pub(super) lookup: PhaseLookup,
    pub(super) rewind: RewindConfig,
    pub(super) current: usize,
    pub(super) stage: f64,
    pub(super) accumulated_tt: f64,
    pub(super) accumulated_emerged_tt: f64,
    pub(super) stages_today: StagesToday,
    /// `(phase index, day-fraction consumed)` for each phase stepped today
    pub(super) day_fractions: Vec<(usize, f64)>,
    pub(super) sow_date: Option<NaiveDate>,
    pub(super) bud_number: f64,
    pub(super) days_after_sowing: u32,
    pub(super) alive: bool,
    /// Set by every reset; the next step records the start stage
    pub(super) fresh: bool,
}

impl Phenology {
    /// Builds the orchestrator for a crop configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::NoPhases`] for an empty phase list.
    pub fn new(config: &PhenologyConfig) -> Result<Self, PhaseError> {
        if config.phases.is_empty() {
            return Err(PhaseError::NoPhases {
                crop: config.crop.name.clone(),
            });
        }
        let phases: Vec<Phase> = config.phases.iter().map(Phase::from_config).collect();
        let lookup = PhaseLookup::new(&phases);
        debug!(
            crop = %config.crop.name,
            phases = phases.len(),
            "phenology configured"
        );
        Ok(Self {
            crop: config.crop.name.clone(),
            phases,
            lookup,
            rewind: config.rewind.clone().unwrap_or_default(),
            current: 0,
            stage: 1.0,
            accumulated_tt: 0.0,
            accumulated_emerged_tt: 0.0,
            stages_today: StagesToday::new(),
            day_fractions: Vec::new(),
            sow_date: None,
            bud_number: 0.0,
            days_after_sowing: 0,
            alive: false,
            fresh: true,
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Clears all state at simulation start.
    pub fn commence(&mut self) {
        self.clear();
        self.alive = false;
        self.sow_date = None;
    }

    /// Clears state and starts a new crop.
    pub fn sow(&mut self, date: NaiveDate, bud_number: f64) {
        self.clear();
        self.alive = true;
        self.sow_date = Some(date);
        self.bud_number = bud_number;
        self.days_after_sowing = 0;
        let start = self.phases[0].start_stage().to_string();
        self.stages_today.insert(&start);
        info!(crop = %self.crop, %date, bud_number, "sown");
    }

    /// Begins a new day.
    pub fn start_of_day(&mut self) {
        self.stages_today.clear();
        self.day_fractions.clear();
        if self.alive {
            self.days_after_sowing = self.days_after_sowing.saturating_add(1);
        }
    }

    /// Terminates the crop.
    pub fn end_crop(&mut self) {
        self.clear();
        self.alive = false;
        info!(crop = %self.crop, "crop ended");
    }

    /// Jumps to the last phase.
    ///
    /// # Errors
    ///
    /// Propagates phase-selection errors (an unresolvable redirect).
    pub fn harvest(&mut self) -> Result<Vec<Notification>, PhaseError> {
        let last = self.phases.len() - 1;
        let mut notifications = Vec::new();
        self.select_phase(last, &mut notifications)?;
        info!(crop = %self.crop, phase = %self.phases[self.current].name(), "harvested");
        Ok(notifications)
    }

    /// Jumps to the named phase.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::PhaseNotFound`] for an unknown name.
    pub fn set_phase(&mut self, name: &str) -> Result<Vec<Notification>, PhaseError> {
        let index = self.lookup.phase_index(name)?;
        let mut notifications = Vec::new();
        self.select_phase(index, &mut notifications)?;
        Ok(notifications)
    }

    pub(super) fn clear(&mut self) {
        self.current = 0;
        self.stage = 1.0;
        self.accumulated_tt = 0.0;
        self.accumulated_emerged_tt = 0.0;
        self.stages_today.clear();
        self.day_fractions.clear();
        self.days_after_sowing = 0;
        self.fresh = true;
        for phase in &mut self.phases {
            phase.reset();
        }
    }

    // ------------------------------------------------------------------
    // Daily step
    // ------------------------------------------------------------------

    /// Advances development by one day.
    ///
    /// Does nothing while no crop is alive.
    ///
    /// # Errors
    ///
    /// - [`PhaseError::NegativeThermalTime`] for a negative rate
    /// - [`PhaseError::NoMorePhases`] when the last phase completes
    /// - any error raised by the phases stepped today
    pub fn do_phenology(&mut self, drivers: &dyn Drivers) -> Result<Vec<Notification>, PhaseError> {
        let mut notifications = Vec::new();
        if !self.alive {
            return Ok(notifications);
        }

        let thermal_time = drivers.thermal_time();
        if thermal_time < 0.0 || thermal_time.is_nan() {
            return Err(PhaseError::NegativeThermalTime {
                phase: self.phases[self.current].name().to_string(),
                value: thermal_time,
            });
        }

        if self.fresh {
            let start = self.phases[self.current].start_stage().to_string();
            self.stages_today.insert(&start);
            self.fresh = false;
        }

        // Day-fraction left when each phase was last entered today. Only a
        // redirect can re-enter a phase, and each lap must use up some of
        // the day.
        let mut entered: Vec<Option<f64>> = vec![None; self.phases.len()];
        entered[self.current] = Some(1.0);
        let mut leftover = self.step_current(1.0, drivers)?;

        while let Some(remaining) = leftover {
            let next = self.current + 1;
            if next >= self.phases.len() {
                return Err(PhaseError::NoMorePhases {
                    phase: self.phases[self.current].name().to_string(),
                });
            }

            let end = self.phases[self.current].end_stage().to_string();
            self.stages_today.insert(&end);
            self.select_phase(next, &mut notifications)?;

            let index = self.current;
            if entered[index].is_some_and(|before| remaining >= before) {
                return Err(PhaseError::RedirectCycle {
                    phase: self.phases[index].name().to_string(),
                });
            }
            entered[index] = Some(remaining);
            leftover = self.step_current(remaining, drivers)?;
        }

        self.refresh_stage();
        self.accumulated_tt += thermal_time;
        if self.is_emerged() {
            self.accumulated_emerged_tt += thermal_time;
        }

        trace!(
            phase = %self.phases[self.current].name(),
            stage = self.stage,
            thermal_time,
            accumulated = self.accumulated_tt,
            "phenology step"
        );

        if self.is_emerged() {
            notifications.push(Notification::PostPhenology);
        }
        Ok(notifications)
    }

    fn step_current(
        &mut self,
        fraction: f64,
        drivers: &dyn Drivers,
    ) -> Result<Option<f64>, PhaseError> {
        let index = self.current;
        let leftover = self.phases[index].step(fraction, drivers)?;
        self.day_fractions
            .push((index, fraction - leftover.unwrap_or(0.0)));
        Ok(leftover)
    }

    /// Makes `target` current, resolving redirects.
    ///
    /// Redirects clear every phase's progress and jump straight to their
    /// destination.
    pub(super) fn select_phase(
        &mut self,
        target: usize,
        notifications: &mut Vec<Notification>,
    ) -> Result<(), PhaseError> {
        let old_phase = self.phases[self.current].name().to_string();
        let was_emerged = self.is_emerged();

        let start = self.phases[target].start_stage().to_string();
        self.stages_today.insert(&start);
        let index = self.resolve_redirects(target)?;

        self.current = index;
        self.phases[index].reset();
        self.refresh_stage();

        let new_phase = self.phases[index].name().to_string();
        let stage = self.phases[index].start_stage().to_string();
        info!(from = %old_phase, to = %new_phase, %stage, "phase transition");
        notifications.push(Notification::PhaseChanged(PhaseChange {
            old_phase,
            new_phase,
            stage,
        }));

        if !was_emerged && self.is_emerged() {
            info!(crop = %self.crop, "plant emerged");
            notifications.push(Notification::PlantEmerged);
        }
        Ok(())
    }

    /// Follows redirects from `index` to the first phase that can be
    /// stepped. Each hop clears every phase's progress and records the
    /// destination's start stage as reached today.
    ///
    /// # Errors
    ///
    /// - [`PhaseError::PhaseNotFound`] for an unknown destination
    /// - [`PhaseError::RedirectCycle`] if redirects only lead to redirects
    pub(super) fn resolve_redirects(&mut self, index: usize) -> Result<usize, PhaseError> {
        let mut index = index;
        let mut hops = 0;
        while let Some(goto) = self.phases[index].goto() {
            hops += 1;
            if hops > self.phases.len() {
                return Err(PhaseError::RedirectCycle {
                    phase: self.phases[index].name().to_string(),
                });
            }
            let destination = self.lookup.phase_index(goto)?;
            info!(
                from = %self.phases[index].name(),
                to = %self.phases[destination].name(),
                "redirect"
            );
            for phase in &mut self.phases {
                phase.reset();
            }
            index = destination;
            let start = self.phases[index].start_stage().to_string();
            self.stages_today.insert(&start);
        }
        Ok(index)
    }

    /// Recomputes the fractional stage number.
    #[allow(clippy::cast_precision_loss)]
    pub(super) fn refresh_stage(&mut self) {
        self.stage = (self.current + 1) as f64 + self.phases[self.current].fraction_complete();
    }
}
