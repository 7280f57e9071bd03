//! Backward adjustments: biomass-removal rewind and explicit stage setting

use tracing::{debug, info};

use crate::error::PhaseError;

use super::engine::Phenology;
use super::notification::{Notification, PhaseChange};

impl Phenology {
    /// Rewinds development after a fraction of biomass was removed.
    ///
    /// The rewind budget is the progress accumulated across the
    /// above-ground phases, scaled by the rewind function of
    /// `removed_fraction`. Starting at the current phase and walking
    /// backwards, each phase with progress is either cleared entirely
    /// (and the walk continues) or reduced by what is left of the budget
    /// (and the walk stops). The walk never goes below the configured
    /// minimum phase index.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::MissingAboveGroundPeriod`] when no above-ground
    /// period is configured, and a lookup error if its stages are unknown.
    pub fn remove_biomass(&mut self, removed_fraction: f64) -> Result<Vec<Notification>, PhaseError> {
        let period = self
            .rewind
            .above_ground
            .as_ref()
            .ok_or(PhaseError::MissingAboveGroundPeriod)?;
        let (first, last) = self.lookup.period(&period.start, &period.end)?;

        let removed_fraction = if removed_fraction.is_finite() {
            removed_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let window: f64 = self.phases[first..=last].iter().map(|p| p.progress()).sum();
        let scale = self
            .rewind
            .function
            .as_ref()
            .map_or(removed_fraction, |f| f.value(removed_fraction));
        let mut budget = (window * scale).max(0.0);

        let floor = self.rewind.min_phase_index.min(self.phases.len() - 1);
        let from = self.current;
        let from_stage = self.phases[from].start_stage().to_string();
        let mut index = from;
        let mut removed = 0.0;

        while budget > 0.0 {
            let progress = self.phases[index].progress();
            if progress > 0.0 {
                if budget >= progress {
                    self.phases[index].reset();
                    budget -= progress;
                    removed += progress;
                } else {
                    self.phases[index].rewind_progress(budget);
                    removed += budget;
                    break;
                }
            }
            if index <= floor {
                break;
            }
            index -= 1;
        }

        self.current = index;
        self.accumulated_tt = (self.accumulated_tt - removed).max(0.0);
        self.accumulated_emerged_tt = (self.accumulated_emerged_tt - removed).max(0.0);
        self.refresh_stage();

        let old_phase = self.phases[from].name().to_string();
        let new_phase = self.phases[index].name().to_string();
        info!(
            from = %old_phase,
            to = %new_phase,
            removed_fraction,
            thermal_time_removed = removed,
            "phenology rewound"
        );

        let mut notifications = vec![Notification::PhaseRewound {
            from: old_phase.clone(),
            to: new_phase.clone(),
            thermal_time_removed: removed,
        }];
        let stage = self.phases[index].start_stage().to_string();
        if stage != from_stage {
            notifications.push(Notification::PhaseChanged(PhaseChange {
                old_phase,
                new_phase,
                stage,
            }));
        }
        Ok(notifications)
    }

    /// Sets the fractional stage number.
    ///
    /// Moving backwards clears every phase between the new and old
    /// positions and takes their progress off both thermal-time totals.
    /// Moving forwards fills every skipped phase, adds the progress it still
    /// needed to the totals and marks its end stage as reached today.
    /// The new phase's fraction complete is set to the fractional part of
    /// `stage`. A stage inside a redirect phase follows the redirect, as a
    /// daily step would.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::InvalidStage`] unless `0 < stage <= phases + 1`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn set_to_stage(&mut self, stage: f64) -> Result<Vec<Notification>, PhaseError> {
        let count = self.phases.len();
        let max = (count + 1) as f64;
        if !(stage > 0.0 && stage <= max) {
            return Err(PhaseError::InvalidStage { stage, max });
        }

        let old = self.current;
        let was_emerged = self.is_emerged();
        let target = ((stage.floor() as usize).saturating_sub(1)).min(count - 1);
        let fraction = (stage - (target + 1) as f64).clamp(0.0, 1.0);
        let mut notifications = Vec::new();
        self.stages_today.clear();

        if stage < self.stage {
            let mut removed = 0.0;
            for phase in &mut self.phases[target.min(old)..=old.max(target)] {
                removed += phase.progress();
                phase.reset();
            }
            self.accumulated_tt = (self.accumulated_tt - removed).max(0.0);
            self.accumulated_emerged_tt = (self.accumulated_emerged_tt - removed).max(0.0);
            debug!(from = old, to = target, removed, "stage set backwards");
        } else {
            for index in old..target {
                let added = self.phases[index].fill();
                self.accumulated_tt += added;
                if self.phases[index].is_emerged() {
                    self.accumulated_emerged_tt += added;
                }
                let end = self.phases[index].end_stage().to_string();
                self.stages_today.insert(&end);
                notifications.push(Notification::PhaseChanged(PhaseChange {
                    old_phase: self.phases[index].name().to_string(),
                    new_phase: self.phases[index + 1].name().to_string(),
                    stage: end,
                }));
            }
            if target != old {
                self.phases[target].reset();
            }
            debug!(from = old, to = target, "stage set forwards");
        }

        // A redirect lands on its destination with no progress.
        let index = self.resolve_redirects(target)?;
        if index == target {
            if self.phases[index].accepts_fraction() {
                self.phases[index].set_fraction_complete(fraction)?;
            }
        } else {
            notifications.push(Notification::PhaseChanged(PhaseChange {
                old_phase: self.phases[target].name().to_string(),
                new_phase: self.phases[index].name().to_string(),
                stage: self.phases[index].start_stage().to_string(),
            }));
        }
        self.current = index;
        if self.phases[index].fraction_complete() <= 0.0 {
            let start = self.phases[index].start_stage().to_string();
            self.stages_today.insert(&start);
        }
        self.refresh_stage();

        if !was_emerged && self.is_emerged() {
            notifications.push(Notification::PlantEmerged);
        }
        info!(stage, phase = %self.phases[index].name(), "stage reset");
        notifications.push(Notification::StageReset { stage });
        Ok(notifications)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use phenology_core::config::{
        CriterionConfig, CropMetadata, PhaseConfig, PhenologyConfig, PiecewiseLinear,
        RewindConfig, StagePeriod,
    };

    use super::*;

    fn config(rewind: Option<RewindConfig>) -> PhenologyConfig {
        let stages = ["Sowing", "Germination", "Emergence", "FloralInit", "Flowering", "Ripe", "Unused"];
        let phases = (0..6)
            .map(|i| PhaseConfig {
                name: format!("P{i}"),
                start: stages[i].to_string(),
                end: stages[i + 1].to_string(),
                criterion: if i == 5 {
                    CriterionConfig::Terminal
                } else {
                    CriterionConfig::Generic { target: Some(100.0) }
                },
                emerged: i >= 2,
                stressed: false,
            })
            .collect();
        PhenologyConfig {
            crop: CropMetadata {
                name: "lucerne".into(),
                description: None,
            },
            phases,
            rewind,
        }
    }

    fn above_ground() -> RewindConfig {
        RewindConfig {
            above_ground: Some(StagePeriod {
                start: "Emergence".into(),
                end: "Ripe".into(),
            }),
            ..RewindConfig::default()
        }
    }

    /// Sown and advanced to 40% through phase 4 (stage 5.4).
    fn advanced(rewind: Option<RewindConfig>) -> Phenology {
        let mut p = Phenology::new(&config(rewind)).unwrap();
        p.sow(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(), 1.0);
        for _ in 0..11 {
            p.start_of_day();
            p.do_phenology(&40.0_f64).unwrap();
        }
        p
    }

    #[test]
    fn test_advanced_fixture() {
        let p = advanced(None);
        assert_eq!(p.current, 4);
        assert!((p.stage - 5.4).abs() < 1e-9);
        assert!((p.accumulated_tt - 440.0).abs() < 1e-9);
    }

    #[test]
    fn test_remove_biomass_requires_period() {
        let mut p = advanced(None);
        assert_eq!(
            p.remove_biomass(0.5).unwrap_err(),
            PhaseError::MissingAboveGroundPeriod
        );
    }

    #[test]
    fn test_remove_biomass_partial_within_current_phase() {
        let mut p = advanced(Some(above_ground()));
        // Window: phases 2..=4 hold 100 + 100 + 40 = 240; 10% is 24.
        let notifications = p.remove_biomass(0.1).unwrap();
        assert_eq!(p.current, 4);
        assert!((p.phases[4].progress() - 16.0).abs() < 1e-9);
        assert!((p.accumulated_tt - 416.0).abs() < 1e-9);
        assert_eq!(notifications.len(), 1);
        assert!(matches!(
            &notifications[0],
            Notification::PhaseRewound { thermal_time_removed, .. } if (*thermal_time_removed - 24.0).abs() < 1e-9
        ));
    }

    #[test]
    fn test_remove_biomass_walks_back() {
        let mut p = advanced(Some(above_ground()));
        // Half of 240 is 120: clears phase 4 (40) then takes 80 from phase 3.
        let notifications = p.remove_biomass(0.5).unwrap();
        assert_eq!(p.current, 3);
        assert!(p.phases[4].progress().abs() < f64::EPSILON);
        assert!((p.phases[3].progress() - 20.0).abs() < 1e-9);
        assert!((p.stage - 4.2).abs() < 1e-9);
        assert!(notifications.iter().any(|n| matches!(
            n,
            Notification::PhaseChanged(change) if change.stage == "FloralInit"
        )));
    }

    #[test]
    fn test_remove_biomass_stops_at_floor() {
        let mut p = advanced(Some(above_ground()));
        let tt_before = p.accumulated_tt;
        p.remove_biomass(1.0).unwrap();
        assert_eq!(p.current, 2);
        assert!(p.phases[2..].iter().all(|phase| phase.progress() == 0.0));
        // Phases below the floor keep their progress.
        assert!((p.phases[1].progress() - 100.0).abs() < 1e-9);
        assert!(p.accumulated_tt <= tt_before);
    }

    #[test]
    fn test_remove_biomass_uses_function() {
        let rewind = RewindConfig {
            function: Some(PiecewiseLinear {
                x: vec![0.0, 1.0],
                y: vec![0.0, 0.1],
            }),
            ..above_ground()
        };
        let mut p = advanced(Some(rewind));
        p.remove_biomass(1.0).unwrap();
        assert!((p.phases[4].progress() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_to_stage_backwards() {
        let mut p = advanced(None);
        let notifications = p.set_to_stage(3.5).unwrap();
        assert_eq!(p.current, 2);
        assert!((p.phases[2].progress() - 50.0).abs() < 1e-9);
        assert!(p.phases[3].progress().abs() < f64::EPSILON);
        // 100 (phase 2) + 100 (phase 3) + 40 (phase 4) taken off.
        assert!((p.accumulated_tt - 200.0).abs() < 1e-9);
        assert_eq!(notifications, vec![Notification::StageReset { stage: 3.5 }]);
        assert!((p.stage - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_set_to_stage_forwards() {
        let mut p = Phenology::new(&config(None)).unwrap();
        p.sow(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(), 1.0);
        let notifications = p.set_to_stage(3.0).unwrap();
        assert_eq!(p.current, 2);
        assert!((p.accumulated_tt - 200.0).abs() < 1e-9);
        assert!(p.on_day_of("Germination"));
        assert!(p.on_day_of("Emergence"));
        let changes = notifications
            .iter()
            .filter(|n| n.as_phase_change().is_some())
            .count();
        assert_eq!(changes, 2);
        assert!(notifications.contains(&Notification::PlantEmerged));
        assert_eq!(notifications.last(), Some(&Notification::StageReset { stage: 3.0 }));
    }

    #[test]
    fn test_set_to_stage_bounds() {
        let mut p = advanced(None);
        assert!(matches!(
            p.set_to_stage(0.0),
            Err(PhaseError::InvalidStage { .. })
        ));
        assert!(matches!(
            p.set_to_stage(7.5),
            Err(PhaseError::InvalidStage { .. })
        ));
        // The terminal phase accepts no fraction; stage 7 lands at its start.
        p.set_to_stage(7.0).unwrap();
        assert_eq!(p.current, 5);
        assert!(p.on_day_of("Ripe"));
        assert!((p.accumulated_tt - 500.0).abs() < 1e-9);
    }
}
