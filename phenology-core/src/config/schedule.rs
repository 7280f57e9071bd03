//! Daily schedule types
//!
//! A schedule supplies one record per simulated day: the rate-of-progress
//! drivers consumed by the phase criteria and any management actions applied
//! after that day's phenology step.

use chrono::{Days, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default number of buds recorded at sowing.
const DEFAULT_BUD_NUMBER: f64 = 1.0;

/// A simulation schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Date of the first day record
    pub start_date: NaiveDate,

    /// Sowing event; sows on `start_date` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sow: Option<SowingConfig>,

    /// One record per consecutive day
    #[serde(default)]
    pub days: Vec<DayRecord>,
}

impl ScheduleConfig {
    /// Returns the effective sow date.
    #[must_use]
    pub fn sow_date(&self) -> NaiveDate {
        self.sow.as_ref().map_or(self.start_date, |s| s.date)
    }

    /// Returns the effective bud number.
    #[must_use]
    pub fn bud_number(&self) -> f64 {
        self.sow
            .as_ref()
            .map_or(DEFAULT_BUD_NUMBER, |s| s.bud_number)
    }

    /// Returns the date of the zero-based day `index`, or `None` if it
    /// falls outside the calendar.
    #[must_use]
    pub fn date_of(&self, index: usize) -> Option<NaiveDate> {
        let offset = u64::try_from(index).ok()?;
        self.start_date.checked_add_days(Days::new(offset))
    }
}

/// Sowing event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SowingConfig {
    /// Sow date
    pub date: NaiveDate,

    /// Number of buds per plant
    #[serde(default = "default_bud_number")]
    pub bud_number: f64,
}

/// One day of input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayRecord {
    /// Rate-of-progress drivers for the day
    #[serde(flatten)]
    pub drivers: DayDrivers,

    /// Management actions applied after the day's phenology step
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ManagementAction>,
}

/// Plain-data driver values for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayDrivers {
    /// Thermal time (degree days)
    pub thermal_time: f64,

    /// Stress multiplier applied to phases flagged `stressed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress: Option<f64>,

    /// Current main-stem leaf number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_number: Option<f64>,

    /// Final main-stem leaf number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_leaf_number: Option<f64>,

    /// Current node number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_number: Option<f64>,

    /// Named external signals (e.g. a vernalisation index)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub signals: IndexMap<String, f64>,
}

impl DayDrivers {
    /// Drivers carrying only a thermal time.
    #[must_use]
    pub fn thermal(thermal_time: f64) -> Self {
        Self {
            thermal_time,
            ..Self::default()
        }
    }
}

/// A management action applied after the day's phenology step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagementAction {
    /// Jump to the final phase
    Harvest,
    /// Terminate the crop
    EndCrop,
    /// Remove a fraction of biomass and rewind phenology
    RemoveBiomass(f64),
    /// Set the fractional stage number
    SetStage(f64),
    /// Jump to the named phase
    SetPhase(String),
}

fn default_bud_number() -> f64 {
    DEFAULT_BUD_NUMBER
}
