//! Error types for the phenology engine
//!
//! Every engine failure is fatal to the simulation: progression must be a
//! total, reproducible function of its inputs, so nothing here is retried
//! or skipped. Messages always name the offending phase or stage.

use chrono::NaiveDate;
use thiserror::Error;

pub use phenology_core::error::{ConfigError, Severity, ValidationIssue};

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `phenology` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Phase engine error (exhausted phases, unresolvable name)
    pub const PHASE_ERROR: i32 = 5;

    /// Simulation error (schedule problem, engine failure on a given day)
    pub const SIMULATION_ERROR: i32 = 6;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `phenology` operations.
#[derive(Debug, Error)]
pub enum PhenologyError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Phase engine error
    #[error(transparent)]
    Phase(#[from] PhaseError),

    /// Simulation driver error
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PhenologyError {
    /// Returns the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Phase(_) => ExitCode::PHASE_ERROR,
            Self::Simulation(_) => ExitCode::SIMULATION_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Phase Engine Errors
// ============================================================================

/// Phase state machine errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhaseError {
    /// The configuration has no phases
    #[error("crop '{crop}' has no phases")]
    NoPhases {
        /// Crop name
        crop: String,
    },

    /// A generic phase was stepped without a thermal-time target
    #[error("phase '{phase}' has no target")]
    MissingTarget {
        /// Phase name
        phase: String,
    },

    /// No phase has the requested name
    #[error("phase not found: '{name}'{}", did_you_mean(suggestion.as_deref()))]
    PhaseNotFound {
        /// Requested name
        name: String,
        /// Closest known phase name
        suggestion: Option<String>,
    },

    /// No phase starts (or ends) at the requested stage
    #[error("no phase {bound} at stage '{stage}'{}", did_you_mean(suggestion.as_deref()))]
    StageNotFound {
        /// Requested stage name
        stage: String,
        /// `"starts"` or `"ends"`
        bound: &'static str,
        /// Closest known stage name
        suggestion: Option<String>,
    },

    /// A stage period whose end phase precedes its start phase
    #[error("stage '{end}' comes before stage '{start}'")]
    StageOrder {
        /// Start stage name
        start: String,
        /// End stage name
        end: String,
    },

    /// The last phase completed with progress left over
    #[error("cannot transition past the last phase '{phase}'")]
    NoMorePhases {
        /// Name of the last phase
        phase: String,
    },

    /// A redirect phase was asked to step
    #[error("redirect phase '{phase}' cannot be stepped")]
    RedirectStepped {
        /// Phase name
        phase: String,
    },

    /// Redirects never reached a non-redirect phase
    #[error("redirect chain starting at '{phase}' never settles")]
    RedirectCycle {
        /// First redirect phase of the chain
        phase: String,
    },

    /// Fraction complete cannot be set on this phase
    #[error("cannot set fraction complete on phase '{phase}'")]
    FractionNotSettable {
        /// Phase name
        phase: String,
    },

    /// A rewind was requested without an above-ground period
    #[error("rewind requires an above-ground stage period")]
    MissingAboveGroundPeriod,

    /// A counter criterion had no value for its driver
    #[error("phase '{phase}' needs driver '{driver}'")]
    MissingDriver {
        /// Phase name
        phase: String,
        /// Driver name
        driver: String,
    },

    /// Thermal time below zero
    #[error("negative thermal time {value} in phase '{phase}'")]
    NegativeThermalTime {
        /// Current phase name
        phase: String,
        /// Offending value
        value: f64,
    },

    /// Stage number outside `(0, phases + 1]`
    #[error("stage {stage} is outside (0, {max}]")]
    InvalidStage {
        /// Requested stage number
        stage: f64,
        /// Highest valid stage number
        max: f64,
    },
}

fn did_you_mean(suggestion: Option<&str>) -> String {
    suggestion.map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"))
}

// ============================================================================
// Simulation Errors
// ============================================================================

/// Errors raised by the daily simulation driver.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The engine failed on a given day
    #[error("day {day} ({date}): {source}")]
    Engine {
        /// Zero-based day index
        day: usize,
        /// Calendar date
        date: NaiveDate,
        /// Underlying engine error
        #[source]
        source: PhaseError,
    },

    /// The schedule is unusable
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Writing output failed
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `phenology` operations.
pub type Result<T> = std::result::Result<T, PhenologyError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::PHASE_ERROR, 5);
        assert_eq!(ExitCode::SIMULATION_ERROR, 6);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
    }

    #[test]
    fn test_phase_error_exit_code() {
        let err: PhenologyError = PhaseError::MissingAboveGroundPeriod.into();
        assert_eq!(err.exit_code(), ExitCode::PHASE_ERROR);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: PhenologyError = ConfigError::MissingFile {
            path: PathBuf::from("/crop.yaml"),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_simulation_error_exit_code() {
        let err: PhenologyError = SimulationError::InvalidSchedule("no days".into()).into();
        assert_eq!(err.exit_code(), ExitCode::SIMULATION_ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: PhenologyError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_phase_not_found_suggestion() {
        let err = PhaseError::PhaseNotFound {
            name: "Emergng".into(),
            suggestion: Some("Emerging".into()),
        };
        assert_eq!(
            err.to_string(),
            "phase not found: 'Emergng' (did you mean 'Emerging'?)"
        );

        let err = PhaseError::StageNotFound {
            stage: "Zzz".into(),
            bound: "ends",
            suggestion: None,
        };
        assert_eq!(err.to_string(), "no phase ends at stage 'Zzz'");
    }

    #[test]
    fn test_simulation_error_names_day() {
        let err = SimulationError::Engine {
            day: 4,
            date: NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
            source: PhaseError::NoMorePhases {
                phase: "Ready".into(),
            },
        };
        let text = err.to_string();
        assert!(text.starts_with("day 4 (2024-04-05)"));
        assert!(text.contains("'Ready'"));
    }
}
