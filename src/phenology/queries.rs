//! Read-only queries
//!
//! None of these mutate state; between day-steps they are idempotent.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::PhaseError;
use crate::phase::{Phase, PhaseRow};

use super::engine::Phenology;
use super::stages_today::StagesToday;

/// Serializable view of the development state at the end of a day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhenologySnapshot {
    /// Zero-based current phase index
    pub phase_index: usize,
    /// Current phase name
    pub phase: String,
    /// Fractional stage number
    pub stage: f64,
    /// Current stage name, empty unless reached today
    pub stage_name: String,
    /// Fraction complete of the current phase
    pub fraction: f64,
    /// Thermal time since sowing
    pub accumulated_thermal_time: f64,
    /// Thermal time since emergence
    pub accumulated_emerged_thermal_time: f64,
    /// Days since sowing
    pub days_after_sowing: u32,
    /// Whether the plant has emerged
    pub emerged: bool,
    /// Stages reached today, in order
    pub stages_today: Vec<String>,
}

impl Phenology {
    /// Whether `stage` was reached today.
    #[must_use]
    pub fn on_day_of(&self, stage: &str) -> bool {
        self.stages_today.contains(stage)
    }

    /// Whether the current phase is called `name` (case-insensitive).
    #[must_use]
    pub fn in_phase(&self, name: &str) -> bool {
        self.current_phase().name().to_lowercase() == name.to_lowercase()
    }

    /// Whether development lies between the phase starting at `start` and
    /// the phase ending at `end`.
    ///
    /// Strictly inside the span this is always true. In the start phase it
    /// is true as soon as the phase is entered. In the end phase it is true
    /// until that phase is complete.
    ///
    /// # Errors
    ///
    /// Fails if either stage is unknown or `end` comes before `start`.
    pub fn between(&self, start: &str, end: &str) -> Result<bool, PhaseError> {
        let (first, last) = self.lookup.period(start, end)?;
        Ok(self.within(first, last))
    }

    /// Index form of [`Phenology::between`], without the end-phase
    /// fraction check.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::StageOrder`] if `start > end`.
    pub fn between_indices(&self, start: usize, end: usize) -> Result<bool, PhaseError> {
        if start > end {
            return Err(PhaseError::StageOrder {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(self.current >= start && self.current <= end)
    }

    fn within(&self, first: usize, last: usize) -> bool {
        if self.current == last {
            return self.fraction_in_current_phase() < 1.0;
        }
        self.current >= first && self.current < last
    }

    /// Whether development is at or past the phase starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::StageNotFound`] for an unknown stage.
    pub fn beyond(&self, start: &str) -> Result<bool, PhaseError> {
        Ok(self.current >= self.lookup.start_index(start)?)
    }

    /// Whether the current index is past `index`.
    #[must_use]
    pub const fn beyond_phase(&self, index: usize) -> bool {
        self.current > index
    }

    /// Whether the current index is before `index`.
    #[must_use]
    pub const fn before_phase(&self, index: usize) -> bool {
        self.current < index
    }

    #[must_use]
    pub fn crop_name(&self) -> &str {
        &self.crop
    }

    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    #[must_use]
    pub fn current_phase(&self) -> &Phase {
        &self.phases[self.current]
    }

    #[must_use]
    pub const fn current_phase_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_phase_name(&self) -> &str {
        self.current_phase().name()
    }

    /// Start stage of the current phase if it was reached today, else `""`.
    #[must_use]
    pub fn current_stage_name(&self) -> &str {
        let start = self.current_phase().start_stage();
        if self.on_day_of(start) { start } else { "" }
    }

    /// Fractional stage number: 1-based phase index plus fraction complete.
    #[must_use]
    pub const fn stage(&self) -> f64 {
        self.stage
    }

    #[must_use]
    pub fn fraction_in_current_phase(&self) -> f64 {
        self.current_phase().fraction_complete()
    }

    /// Whether the current phase counts as emerged.
    #[must_use]
    pub fn is_emerged(&self) -> bool {
        self.current_phase().is_emerged()
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    #[must_use]
    pub const fn days_after_sowing(&self) -> u32 {
        self.days_after_sowing
    }

    #[must_use]
    pub const fn accumulated_thermal_time(&self) -> f64 {
        self.accumulated_tt
    }

    #[must_use]
    pub const fn accumulated_emerged_thermal_time(&self) -> f64 {
        self.accumulated_emerged_tt
    }

    #[must_use]
    pub const fn sow_date(&self) -> Option<NaiveDate> {
        self.sow_date
    }

    #[must_use]
    pub const fn bud_number(&self) -> f64 {
        self.bud_number
    }

    #[must_use]
    pub const fn stages_today(&self) -> &StagesToday {
        &self.stages_today
    }

    /// Day-fraction consumed by each phase stepped today.
    #[must_use]
    pub fn day_fractions(&self) -> &[(usize, f64)] {
        &self.day_fractions
    }

    /// Every stage name: the first phase's start, then each phase's end.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        std::iter::once(self.phases[0].start_stage())
            .chain(self.phases.iter().map(Phase::end_stage))
            .collect()
    }

    /// Stage codes matching [`Phenology::stage_names`].
    #[must_use]
    pub fn stage_codes(&self) -> Vec<usize> {
        (0..=self.phases.len()).collect()
    }

    /// One row per phase.
    #[must_use]
    pub fn phase_table(&self) -> Vec<PhaseRow> {
        self.phases
            .iter()
            .enumerate()
            .map(|(i, phase)| phase.row(i + 1))
            .collect()
    }

    #[must_use]
    pub fn snapshot(&self) -> PhenologySnapshot {
        PhenologySnapshot {
            phase_index: self.current,
            phase: self.current_phase_name().to_string(),
            stage: self.stage,
            stage_name: self.current_stage_name().to_string(),
            fraction: self.fraction_in_current_phase(),
            accumulated_thermal_time: self.accumulated_tt,
            accumulated_emerged_thermal_time: self.accumulated_emerged_tt,
            days_after_sowing: self.days_after_sowing,
            emerged: self.is_emerged(),
            stages_today: self.stages_today.iter().map(str::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phenology_core::config::{CriterionConfig, CropMetadata, PhaseConfig, PhenologyConfig};

    fn crop() -> Phenology {
        let phase = |name: &str, start: &str, end: &str, target: Option<f64>| PhaseConfig {
            name: name.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            criterion: target.map_or(CriterionConfig::Terminal, |t| CriterionConfig::Generic {
                target: Some(t),
            }),
            emerged: false,
            stressed: false,
        };
        let config = PhenologyConfig {
            crop: CropMetadata {
                name: "maize".into(),
                description: None,
            },
            phases: vec![
                phase("Germinating", "Sowing", "Germination", Some(10.0)),
                phase("Emerging", "Germination", "Emergence", Some(10.0)),
                phase("Juvenile", "Emergence", "EndJuvenile", Some(10.0)),
                phase("Maturing", "EndJuvenile", "Maturity", Some(10.0)),
                phase("Ready", "Maturity", "Unused", None),
            ],
            rewind: None,
        };
        let mut p = Phenology::new(&config).unwrap();
        p.sow(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 1.0);
        p
    }

    #[test]
    fn test_between_boundaries() {
        let mut p = crop();
        // In the start phase on entry.
        assert!(p.between("Sowing", "Emergence").unwrap());

        p.set_phase("Emerging").unwrap();
        assert!(p.between("Sowing", "Emergence").unwrap());
        p.phases[1].set_fraction_complete(1.0).unwrap();
        assert!(!p.between("Sowing", "Emergence").unwrap());

        p.set_phase("Juvenile").unwrap();
        assert!(!p.between("Sowing", "Emergence").unwrap());
        assert!(p.between("Emergence", "Maturity").unwrap());
    }

    #[test]
    fn test_between_errors() {
        let p = crop();
        assert!(matches!(
            p.between("Maturity", "Germination"),
            Err(PhaseError::StageOrder { .. })
        ));
        assert!(matches!(
            p.between("Sowingg", "Maturity"),
            Err(PhaseError::StageNotFound { suggestion: Some(_), .. })
        ));
    }

    #[test]
    fn test_beyond() {
        let mut p = crop();
        assert!(p.beyond("Sowing").unwrap());
        assert!(!p.beyond("Emergence").unwrap());
        p.set_phase("juvenile").unwrap();
        assert!(p.beyond("Emergence").unwrap());
        assert!(p.beyond_phase(1));
        assert!(!p.beyond_phase(2));
        assert!(p.before_phase(3));
        assert!(p.between_indices(1, 2).unwrap());
        assert!(p.between_indices(3, 1).is_err());
    }

    #[test]
    fn test_in_phase_and_names() {
        let p = crop();
        assert!(p.in_phase("germinating"));
        assert!(!p.in_phase("Emerging"));
        assert_eq!(p.current_stage_name(), "Sowing");
        assert_eq!(
            p.stage_names(),
            vec!["Sowing", "Germination", "Emergence", "EndJuvenile", "Maturity", "Unused"]
        );
        assert_eq!(p.stage_codes(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(p.phase_table()[4].criterion, "terminal");
    }

    #[test]
    fn test_queries_do_not_mutate() {
        let mut p = crop();
        p.do_phenology(&4.0_f64).unwrap();
        let before = p.snapshot();
        for _ in 0..3 {
            let _ = p.on_day_of("Sowing");
            let _ = p.in_phase("Germinating");
            let _ = p.between("Sowing", "Maturity");
            let _ = p.beyond("Emergence");
        }
        assert_eq!(p.snapshot(), before);
    }

    #[test]
    fn test_current_stage_name_empty_after_day_start() {
        let mut p = crop();
        p.start_of_day();
        assert_eq!(p.current_stage_name(), "");
    }
}
