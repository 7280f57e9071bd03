//! Configuration validation
//!
//! Runs on the fully deserialized [`PhenologyConfig`] and collects ALL
//! issues instead of stopping at the first one, so a single `validate`
//! run reports everything wrong with a file.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::loader::ConfigLimits;
use crate::error::{Severity, ValidationIssue};
use phenology_core::config::{CriterionConfig, PhaseConfig, PhenologyConfig, RewindConfig};

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_\-]*$").expect("valid regex"));

const MAX_CROP_NAME_LEN: usize = 100;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading)
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational)
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Promotes every warning to an error.
    #[must_use]
    pub fn strict(mut self) -> Self {
        for mut warning in self.warnings.drain(..) {
            warning.severity = Severity::Error;
            self.errors.push(warning);
        }
        self
    }

    /// All issues, errors first.
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().chain(&self.warnings)
    }
}

/// Crop configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &PhenologyConfig, limits: &ConfigLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_crop(config);
        self.validate_phases(&config.phases);
        self.validate_chain(&config.phases);
        self.validate_redirects(&config.phases);
        if let Some(rewind) = &config.rewind {
            self.validate_rewind(rewind, &config.phases);
        }
        self.validate_limits(config, limits);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Crop
    // ========================================================================

    fn validate_crop(&mut self, config: &PhenologyConfig) {
        let name = &config.crop.name;
        if name.trim().is_empty() {
            self.add_error("crop.name", "crop name is required and cannot be empty");
        } else if name.len() > MAX_CROP_NAME_LEN {
            self.add_warning(
                "crop.name",
                format!("crop name is unusually long (> {MAX_CROP_NAME_LEN} characters)"),
            );
        }
    }

    // ========================================================================
    // Phases
    // ========================================================================

    fn validate_phases(&mut self, phases: &[PhaseConfig]) {
        if phases.is_empty() {
            self.add_error("phases", "at least one phase is required");
            return;
        }

        let mut seen = HashSet::new();
        let last = phases.len() - 1;
        for (i, phase) in phases.iter().enumerate() {
            let path = format!("phases[{i}]");

            self.check_name(&format!("{path}.name"), &phase.name, "phase");
            self.check_name(&format!("{path}.start"), &phase.start, "stage");
            self.check_name(&format!("{path}.end"), &phase.end, "stage");

            if !phase.name.is_empty() && !seen.insert(phase.name.to_lowercase()) {
                self.add_warning(
                    format!("{path}.name"),
                    format!(
                        "duplicate phase name '{}'; lookups resolve to the first",
                        phase.name
                    ),
                );
            }

            self.validate_criterion(&path, phase);

            let terminal = matches!(phase.criterion, CriterionConfig::Terminal);
            if terminal && i != last {
                self.add_warning(
                    format!("{path}.type"),
                    format!("terminal phase '{}' is not the last phase", phase.name),
                );
            }
            if !terminal && i == last {
                self.add_warning(
                    format!("{path}.type"),
                    format!(
                        "last phase '{}' is not terminal; completing it is fatal",
                        phase.name
                    ),
                );
            }
        }
    }

    fn check_name(&mut self, path: &str, name: &str, what: &str) {
        if name.is_empty() {
            self.add_error(path, format!("{what} name cannot be empty"));
        } else if !NAME_RE.is_match(name) {
            self.add_error(
                path,
                format!(
                    "invalid {what} name '{name}': must start with a letter and \
                     contain only letters, digits, '_' or '-'"
                ),
            );
        }
    }

    fn validate_criterion(&mut self, path: &str, phase: &PhaseConfig) {
        match &phase.criterion {
            CriterionConfig::Generic { target: None } => self.add_warning(
                format!("{path}.target"),
                format!(
                    "generic phase '{}' has no target; stepping it will fail",
                    phase.name
                ),
            ),
            CriterionConfig::Generic { target: Some(t) }
            | CriterionConfig::Expression { target: t, .. } => {
                self.check_positive(&format!("{path}.target"), "target", *t);
            }
            CriterionConfig::NodeCount { nodes } => {
                self.check_positive(&format!("{path}.nodes"), "nodes", *nodes);
            }
            CriterionConfig::Redirect { goto } if goto.eq_ignore_ascii_case(&phase.name) => {
                self.add_error(
                    format!("{path}.goto"),
                    format!("redirect phase '{}' points at itself", phase.name),
                );
            }
            CriterionConfig::Terminal
            | CriterionConfig::Redirect { .. }
            | CriterionConfig::LeafCount => {}
        }
        if let CriterionConfig::Expression { signal, .. } = &phase.criterion {
            if signal.trim().is_empty() {
                self.add_error(format!("{path}.signal"), "signal name cannot be empty");
            }
        }
    }

    fn check_positive(&mut self, path: &str, field: &str, value: f64) {
        if !value.is_finite() || value <= 0.0 {
            self.add_error(
                path,
                format!("{field} must be a positive finite number, got {value}"),
            );
        }
    }

    /// Phase N must end where phase N+1 starts.
    fn validate_chain(&mut self, phases: &[PhaseConfig]) {
        for (i, pair) in phases.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.end != next.start {
                self.add_error(
                    format!("phases[{}].start", i + 1),
                    format!(
                        "phase '{}' starts at '{}' but the previous phase '{}' ends at '{}'",
                        next.name, next.start, prev.name, prev.end
                    ),
                );
            }
        }
    }

    fn validate_redirects(&mut self, phases: &[PhaseConfig]) {
        for (i, phase) in phases.iter().enumerate() {
            let CriterionConfig::Redirect { goto } = &phase.criterion else {
                continue;
            };
            // Sowing makes phase 0 current without resolving it.
            if i == 0 {
                self.add_error(
                    "phases[0].type",
                    format!("first phase '{}' cannot be a redirect", phase.name),
                );
            }
            if !phases.iter().any(|p| p.name.eq_ignore_ascii_case(goto)) {
                let names = phases.iter().map(|p| &p.name);
                let hint = crate::phenology::lookup::suggest(goto, names, true)
                    .map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"));
                self.add_error(
                    format!("phases[{i}].goto"),
                    format!("redirect target '{goto}' is not a phase{hint}"),
                );
            }
        }
    }

    // ========================================================================
    // Rewind
    // ========================================================================

    fn validate_rewind(&mut self, rewind: &RewindConfig, phases: &[PhaseConfig]) {
        if let Some(period) = &rewind.above_ground {
            let first = phases.iter().position(|p| p.start == period.start);
            let last = phases.iter().position(|p| p.end == period.end);
            if first.is_none() {
                self.add_error(
                    "rewind.above_ground.start",
                    format!("no phase starts at stage '{}'", period.start),
                );
            }
            if last.is_none() {
                self.add_error(
                    "rewind.above_ground.end",
                    format!("no phase ends at stage '{}'", period.end),
                );
            }
            if let (Some(first), Some(last)) = (first, last) {
                if last < first {
                    self.add_error(
                        "rewind.above_ground",
                        format!(
                            "stage '{}' comes before stage '{}'",
                            period.end, period.start
                        ),
                    );
                }
            }
        }

        if let Some(function) = &rewind.function {
            if function.x.is_empty() {
                self.add_error("rewind.function.x", "function needs at least one point");
            } else if function.x.len() != function.y.len() {
                self.add_error(
                    "rewind.function",
                    format!(
                        "x has {} points but y has {}",
                        function.x.len(),
                        function.y.len()
                    ),
                );
            }
            if function.x.windows(2).any(|w| w[1] <= w[0]) {
                self.add_error("rewind.function.x", "x values must be strictly increasing");
            }
            if function.x.iter().chain(&function.y).any(|v| !v.is_finite()) {
                self.add_error("rewind.function", "function values must be finite");
            }
        }
    }

    // ========================================================================
    // Limits
    // ========================================================================

    fn validate_limits(&mut self, config: &PhenologyConfig, limits: &ConfigLimits) {
        if config.phases.len() > limits.max_phases {
            self.add_error(
                "phases",
                format!(
                    "too many phases: {} (max {})",
                    config.phases.len(),
                    limits.max_phases
                ),
            );
        }
    }

    fn add_error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue::error(path, message));
    }

    fn add_warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::warning(path, message));
    }
}

// ============================================================================
// Tests
// ============================================================================
