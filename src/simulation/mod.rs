//! Daily simulation clock
//!
//! Drives one [`Phenology`] through a [`ScheduleConfig`], one day record at
//! a time: start the day, sow on the sow date, step phenology, then apply
//! the day's management actions in order. Every notification is turned
//! into an [`Event`] and recorded in metrics before the day's
//! [`DayReport`] is handed to the caller.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PhaseError, SimulationError};
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter};
use crate::phenology::{Notification, Phenology, PhenologySnapshot};
use phenology_core::config::{ManagementAction, PhenologyConfig, ScheduleConfig};

/// State at the end of one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayReport {
    /// Zero-based day index
    pub day: usize,
    /// Simulated date
    pub date: NaiveDate,
    /// Development state after the day's step and actions
    #[serde(flatten)]
    pub state: PhenologySnapshot,
    /// Notifications published today, `post_phenology` excluded
    pub notifications: Vec<Notification>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub days: usize,
    pub transitions: usize,
    pub final_phase: String,
    pub stage: f64,
    pub accumulated_thermal_time: f64,
}

/// A crop bound to an event sink.
#[derive(Debug)]
pub struct Simulation {
    phenology: Phenology,
    emitter: EventEmitter,
    transitions: usize,
}

impl Simulation {
    /// Builds a simulation for a crop configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::NoPhases`] for an empty phase list.
    pub fn new(config: &PhenologyConfig, emitter: EventEmitter) -> Result<Self, PhaseError> {
        Ok(Self {
            phenology: Phenology::new(config)?,
            emitter,
            transitions: 0,
        })
    }

    #[must_use]
    pub const fn phenology(&self) -> &Phenology {
        &self.phenology
    }

    /// Runs every day of `schedule`, passing each report to `on_day`.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::InvalidSchedule`] for an empty schedule, a sow
    ///   date before the first day or a date outside the calendar
    /// - [`SimulationError::Engine`] for any engine failure, tagged with
    ///   the day and date
    /// - [`SimulationError::Output`] if `on_day` fails
    pub fn run<F>(
        &mut self,
        schedule: &ScheduleConfig,
        mut on_day: F,
    ) -> Result<SimulationSummary, SimulationError>
    where
        F: FnMut(&DayReport) -> std::io::Result<()>,
    {
        if schedule.days.is_empty() {
            return Err(SimulationError::InvalidSchedule(
                "schedule has no days".to_string(),
            ));
        }
        let sow_date = schedule.sow_date();
        if sow_date < schedule.start_date {
            return Err(SimulationError::InvalidSchedule(format!(
                "sow date {sow_date} is before start date {}",
                schedule.start_date
            )));
        }
        if schedule.date_of(schedule.days.len() - 1).is_some_and(|last| sow_date > last) {
            warn!(%sow_date, "sow date is after the last scheduled day; nothing will develop");
        }

        self.phenology.commence();
        self.transitions = 0;
        self.emitter.emit(&Event::SimulationStarted {
            timestamp: Utc::now(),
            crop: self.phenology.crop_name().to_string(),
            phases: self.phenology.phases().len(),
            start_date: schedule.start_date,
            days: schedule.days.len(),
        });
        info!(
            crop = %self.phenology.crop_name(),
            days = schedule.days.len(),
            start = %schedule.start_date,
            "simulation started"
        );

        for (day, record) in schedule.days.iter().enumerate() {
            let date = schedule.date_of(day).ok_or_else(|| {
                SimulationError::InvalidSchedule(format!("day {day} is outside the calendar"))
            })?;
            let engine = |source| SimulationError::Engine { day, date, source };

            self.phenology.start_of_day();
            if date == sow_date {
                self.phenology.sow(date, schedule.bud_number());
                metrics::set_current_phase(self.phenology.current_phase_name(), None);
            }

            let mut notifications = self.phenology.do_phenology(&record.drivers).map_err(engine)?;
            for action in &record.actions {
                debug!(day, %date, ?action, "applying management action");
                notifications.extend(self.apply(action).map_err(engine)?);
            }

            self.publish(day, date, &notifications);
            notifications.retain(|n| !matches!(n, Notification::PostPhenology));

            let report = DayReport {
                day,
                date,
                state: self.phenology.snapshot(),
                notifications,
            };
            metrics::record_day(report.state.accumulated_thermal_time);
            self.emitter.emit(&Event::DayCompleted {
                day,
                date,
                phase: report.state.phase.clone(),
                stage: report.state.stage,
                accumulated_thermal_time: report.state.accumulated_thermal_time,
            });
            on_day(&report)?;
        }

        let summary = SimulationSummary {
            days: schedule.days.len(),
            transitions: self.transitions,
            final_phase: self.phenology.current_phase_name().to_string(),
            stage: self.phenology.stage(),
            accumulated_thermal_time: self.phenology.accumulated_thermal_time(),
        };
        self.emitter.emit(&Event::SimulationFinished {
            timestamp: Utc::now(),
            days: summary.days,
            final_phase: summary.final_phase.clone(),
            stage: summary.stage,
        });
        self.emitter.flush();
        info!(
            days = summary.days,
            transitions = summary.transitions,
            phase = %summary.final_phase,
            stage = summary.stage,
            "simulation finished"
        );
        Ok(summary)
    }

    fn apply(&mut self, action: &ManagementAction) -> Result<Vec<Notification>, PhaseError> {
        match action {
            ManagementAction::Harvest => self.phenology.harvest(),
            ManagementAction::EndCrop => {
                self.phenology.end_crop();
                Ok(Vec::new())
            }
            ManagementAction::RemoveBiomass(fraction) => self.phenology.remove_biomass(*fraction),
            ManagementAction::SetStage(stage) => self.phenology.set_to_stage(*stage),
            ManagementAction::SetPhase(name) => self.phenology.set_phase(name),
        }
    }

    fn publish(&mut self, day: usize, date: NaiveDate, notifications: &[Notification]) {
        let phase = self.phenology.current_phase_name().to_string();
        for notification in notifications {
            match notification {
                Notification::PhaseChanged(change) => {
                    self.transitions += 1;
                    metrics::record_phase_transition(&change.old_phase, &change.new_phase);
                    metrics::set_current_phase(&change.new_phase, Some(&change.old_phase));
                }
                Notification::PhaseRewound { .. } => metrics::record_rewind(),
                _ => {}
            }
            if let Some(event) = Event::from_notification(day, date, &phase, notification) {
                self.emitter.emit(&event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phenology_core::config::{DayDrivers, DayRecord, SowingConfig};
    use std::sync::{Arc, Mutex};

    const CROP: &str = r"
crop: { name: bean }
phases:
  - { name: Germinating, start: Sowing, end: Germination, type: generic, target: 50 }
  - { name: Emerging, start: Germination, end: Emergence, type: generic, target: 80 }
  - { name: Vegetative, start: Emergence, end: Flowering, type: generic, target: 200, emerged: true }
  - { name: Ready, start: Flowering, end: Unused, type: terminal, emerged: true }
";

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn types(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .lines()
                .map(|l| {
                    let v: serde_json::Value = serde_json::from_str(l).unwrap();
                    v["type"].as_str().unwrap().to_string()
                })
                .collect()
        }
    }

    fn config() -> PhenologyConfig {
        serde_yaml::from_str(CROP).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    fn schedule(tt: &[f64]) -> ScheduleConfig {
        ScheduleConfig {
            start_date: date(1),
            sow: None,
            days: tt
                .iter()
                .map(|&t| DayRecord {
                    drivers: DayDrivers::thermal(t),
                    actions: Vec::new(),
                })
                .collect(),
        }
    }

    fn run(schedule: &ScheduleConfig) -> (Result<SimulationSummary, SimulationError>, Vec<DayReport>) {
        let mut sim = Simulation::new(&config(), EventEmitter::noop()).unwrap();
        let mut reports = Vec::new();
        let result = sim.run(schedule, |r| {
            reports.push(r.clone());
            Ok(())
        });
        (result, reports)
    }

    #[test]
    fn runs_every_day() {
        let (result, reports) = run(&schedule(&[30.0; 10]));
        let summary = result.unwrap();
        assert_eq!(summary.days, 10);
        assert_eq!(reports.len(), 10);
        assert_eq!(reports[9].date, date(10));
        assert!((summary.accumulated_thermal_time - 300.0).abs() < 1e-9);
        // 50 + 80 = 130 TT to emergence, reached on day 5 (150 TT).
        assert_eq!(reports[4].state.phase, "Vegetative");
        assert!(reports[4].state.emerged);
        assert!(reports[4]
            .notifications
            .iter()
            .any(|n| matches!(n, Notification::PlantEmerged)));
        assert_eq!(summary.transitions, 2);
    }

    #[test]
    fn post_phenology_filtered_from_reports() {
        let (_, reports) = run(&schedule(&[30.0; 8]));
        assert!(reports
            .iter()
            .flat_map(|r| &r.notifications)
            .all(|n| !matches!(n, Notification::PostPhenology)));
    }

    #[test]
    fn nothing_develops_before_sowing() {
        let mut s = schedule(&[30.0; 4]);
        s.sow = Some(SowingConfig {
            date: date(3),
            bud_number: 2.0,
        });
        let (result, reports) = run(&s);
        result.unwrap();
        assert!(reports[0].state.accumulated_thermal_time.abs() < f64::EPSILON);
        assert!(reports[1].state.accumulated_thermal_time.abs() < f64::EPSILON);
        assert!((reports[2].state.accumulated_thermal_time - 30.0).abs() < 1e-9);
        assert_eq!(reports[3].state.days_after_sowing, 1);
    }

    #[test]
    fn actions_apply_after_step() {
        let mut s = schedule(&[10.0; 3]);
        s.days[1].actions = vec![ManagementAction::Harvest];
        s.days[2].actions = vec![ManagementAction::EndCrop];
        let (result, reports) = run(&s);
        result.unwrap();
        assert_eq!(reports[1].state.phase, "Ready");
        let change = reports[1].notifications[0].as_phase_change().unwrap();
        assert_eq!(change.old_phase, "Germinating");
        assert_eq!(change.new_phase, "Ready");
        assert_eq!(reports[2].state.phase, "Germinating");
        assert!(reports[2].state.accumulated_thermal_time.abs() < f64::EPSILON);
    }

    #[test]
    fn engine_error_names_day() {
        let mut s = schedule(&[10.0, -1.0]);
        s.days[0].actions = vec![ManagementAction::SetPhase("Nope".into())];
        let (result, _) = run(&s);
        assert!(matches!(
            result,
            Err(SimulationError::Engine { day: 0, source: PhaseError::PhaseNotFound { .. }, .. })
        ));

        let (result, reports) = run(&schedule(&[10.0, -1.0]));
        assert_eq!(reports.len(), 1);
        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("day 1 (2024-04-02)"));
    }

    #[test]
    fn invalid_schedules() {
        let (result, _) = run(&schedule(&[]));
        assert!(matches!(result, Err(SimulationError::InvalidSchedule(_))));

        let mut s = schedule(&[1.0]);
        s.sow = Some(SowingConfig {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            bud_number: 1.0,
        });
        let (result, _) = run(&s);
        assert!(matches!(result, Err(SimulationError::InvalidSchedule(_))));
    }

    #[test]
    fn emits_events_in_order() {
        let capture = Capture::default();
        let emitter = EventEmitter::new(Box::new(capture.clone()));
        let mut sim = Simulation::new(&config(), emitter).unwrap();
        sim.run(&schedule(&[60.0, 10.0]), |_| Ok(())).unwrap();

        assert_eq!(
            capture.types(),
            vec![
                "SimulationStarted",
                "PhaseChanged",
                "DayCompleted",
                "DayCompleted",
                "SimulationFinished",
            ]
        );
    }

    #[test]
    fn output_failure_aborts() {
        let mut sim = Simulation::new(&config(), EventEmitter::noop()).unwrap();
        let result = sim.run(&schedule(&[1.0; 3]), |_| {
            Err(std::io::Error::other("broken pipe"))
        });
        assert!(matches!(result, Err(SimulationError::Output(_))));
    }
}
