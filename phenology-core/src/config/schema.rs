//! Configuration schema types
//!
//! This module defines the crop phenology configuration: an ordered list
//! of phases, each bounded by a start and end stage and carrying a
//! completion criterion, plus optional settings for biomass-removal rewinds.
//! These types are deserialized from YAML configuration files.

use serde::{Deserialize, Serialize};

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration for a crop's phenology.
///
/// The phase list is fixed after loading; the engine never adds or removes
/// phases at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PhenologyConfig {
    /// Crop metadata (required)
    pub crop: CropMetadata,

    /// Ordered phase definitions
    #[serde(default)]
    pub phases: Vec<PhaseConfig>,

    /// Settings for rewinding phenology after biomass removal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewind: Option<RewindConfig>,
}

/// Crop identification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropMetadata {
    /// Crop name (required)
    pub name: String,

    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ============================================================================
// Phases
// ============================================================================

/// A single phase definition.
///
/// Phase N's `end` stage is expected to equal phase N+1's `start` stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Phase name, looked up case-insensitively
    pub name: String,

    /// Stage reached when the phase is entered
    pub start: String,

    /// Stage reached when the phase completes
    pub end: String,

    /// Completion criterion, keyed by the `type` field
    #[serde(flatten)]
    pub criterion: CriterionConfig,

    /// Whether the plant counts as emerged while this phase is current
    #[serde(default, skip_serializing_if = "is_false")]
    pub emerged: bool,

    /// Whether the day's rate is scaled by the stress multiplier
    #[serde(default, skip_serializing_if = "is_false")]
    pub stressed: bool,
}

/// Completion criterion for a phase.
///
/// Serialized with an internal `type` tag, e.g.
/// `type: generic` with `target: 120.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CriterionConfig {
    /// Completes when accumulated thermal time exceeds `target`.
    ///
    /// A missing target is only reported when the phase is stepped.
    Generic {
        /// Thermal-time target
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<f64>,
    },

    /// Never completes; accumulates thermal time for reporting.
    Terminal,

    /// Zero-duration jump to another phase.
    Redirect {
        /// Name of the destination phase
        goto: String,
    },

    /// Completes when the leaf number reaches the final leaf number.
    LeafCount,

    /// Completes after `nodes` further nodes have appeared.
    NodeCount {
        /// Number of nodes to appear within the phase
        nodes: f64,
    },

    /// Completes when an external signal reaches `target`.
    Expression {
        /// Name of the driver signal
        signal: String,
        /// Signal value at which the phase completes
        target: f64,
    },
}

impl CriterionConfig {
    /// Returns the `type` tag of this criterion.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Generic { .. } => "generic",
            Self::Terminal => "terminal",
            Self::Redirect { .. } => "redirect",
            Self::LeafCount => "leaf_count",
            Self::NodeCount { .. } => "node_count",
            Self::Expression { .. } => "expression",
        }
    }
}

// ============================================================================
// Rewind
// ============================================================================

/// Default safety floor for rewinds: never rewind into sowing or germination.
const DEFAULT_MIN_PHASE_INDEX: usize = 2;

/// Settings for biomass-removal rewinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewindConfig {
    /// Stage period whose phases make up the above-ground window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub above_ground: Option<StagePeriod>,

    /// Maps removed-biomass fraction to the fraction of the window rewound.
    /// Identity when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<PiecewiseLinear>,

    /// Lowest phase index a rewind may reach
    #[serde(default = "default_min_phase_index")]
    pub min_phase_index: usize,
}

impl Default for RewindConfig {
    fn default() -> Self {
        Self {
            above_ground: None,
            function: None,
            min_phase_index: DEFAULT_MIN_PHASE_INDEX,
        }
    }
}

/// A span of phases from the phase starting at `start` to the phase
/// ending at `end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePeriod {
    /// Start stage name
    pub start: String,
    /// End stage name
    pub end: String,
}

/// Piecewise-linear function given as paired `x`/`y` points.
///
/// Values outside the `x` range are clamped to the first/last `y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiecewiseLinear {
    /// Ascending x coordinates
    pub x: Vec<f64>,
    /// y coordinates, one per x
    pub y: Vec<f64>,
}

impl PiecewiseLinear {
    /// The identity over `[0, 1]`.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            x: vec![0.0, 1.0],
            y: vec![0.0, 1.0],
        }
    }

    /// Evaluates the function at `at`.
    ///
    /// Returns `0.0` for an empty table.
    #[must_use]
    pub fn value(&self, at: f64) -> f64 {
        let n = self.x.len().min(self.y.len());
        if n == 0 {
            return 0.0;
        }
        if at <= self.x[0] {
            return self.y[0];
        }
        if at >= self.x[n - 1] {
            return self.y[n - 1];
        }
        for i in 1..n {
            if at <= self.x[i] {
                let (x0, x1) = (self.x[i - 1], self.x[i]);
                let (y0, y1) = (self.y[i - 1], self.y[i]);
                if (x1 - x0).abs() < f64::EPSILON {
                    return y1;
                }
                return (at - x0).mul_add((y1 - y0) / (x1 - x0), y0);
            }
        }
        self.y[n - 1]
    }
}

fn default_min_phase_index() -> usize {
    DEFAULT_MIN_PHASE_INDEX
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

// ============================================================================
// Tests
// ============================================================================
