//! Name → index lookup for phases and stages
//!
//! Built once when the orchestrator is constructed. Phase names are matched
//! case-insensitively; stage names exactly. When several phases share a
//! name or stage, the first one wins.

use indexmap::IndexMap;

use crate::error::PhaseError;
use crate::phase::Phase;

/// Maximum Damerau-Levenshtein distance for "did you mean" suggestions.
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Index maps over a fixed phase list.
#[derive(Debug, Clone, Default)]
pub struct PhaseLookup {
    names: Vec<String>,
    by_name: IndexMap<String, usize>,
    by_start: IndexMap<String, usize>,
    by_end: IndexMap<String, usize>,
}

impl PhaseLookup {
    /// Builds the maps for `phases`.
    #[must_use]
    pub fn new(phases: &[Phase]) -> Self {
        let mut lookup = Self::default();
        for (index, phase) in phases.iter().enumerate() {
            lookup.names.push(phase.name().to_string());
            lookup
                .by_name
                .entry(phase.name().to_lowercase())
                .or_insert(index);
            lookup
                .by_start
                .entry(phase.start_stage().to_string())
                .or_insert(index);
            lookup
                .by_end
                .entry(phase.end_stage().to_string())
                .or_insert(index);
        }
        lookup
    }

    /// Index of the phase called `name` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::PhaseNotFound`] if no phase has that name.
    pub fn phase_index(&self, name: &str) -> Result<usize, PhaseError> {
        self.by_name
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| PhaseError::PhaseNotFound {
                name: name.to_string(),
                suggestion: suggest(name, self.names.iter(), true),
            })
    }

    /// Index of the first phase starting at `stage`.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::StageNotFound`] if no phase starts there.
    pub fn start_index(&self, stage: &str) -> Result<usize, PhaseError> {
        self.by_start
            .get(stage)
            .copied()
            .ok_or_else(|| PhaseError::StageNotFound {
                stage: stage.to_string(),
                bound: "starts",
                suggestion: suggest(stage, self.by_start.keys(), false),
            })
    }

    /// Index of the first phase ending at `stage`.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::StageNotFound`] if no phase ends there.
    pub fn end_index(&self, stage: &str) -> Result<usize, PhaseError> {
        self.by_end
            .get(stage)
            .copied()
            .ok_or_else(|| PhaseError::StageNotFound {
                stage: stage.to_string(),
                bound: "ends",
                suggestion: suggest(stage, self.by_end.keys(), false),
            })
    }

    /// Resolves a stage period to an inclusive phase-index range.
    ///
    /// # Errors
    ///
    /// Fails if either stage is unknown or the end phase precedes the
    /// start phase.
    pub fn period(&self, start: &str, end: &str) -> Result<(usize, usize), PhaseError> {
        let first = self.start_index(start)?;
        let last = self.end_index(end)?;
        if first > last {
            return Err(PhaseError::StageOrder {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok((first, last))
    }
}

/// Closest candidate within [`MAX_SUGGESTION_DISTANCE`], if any.
pub(crate) fn suggest<'a>(
    input: &str,
    candidates: impl Iterator<Item = &'a String>,
    fold_case: bool,
) -> Option<String> {
    let distance = |candidate: &str| {
        if fold_case {
            strsim::damerau_levenshtein(&input.to_lowercase(), &candidate.to_lowercase())
        } else {
            strsim::damerau_levenshtein(input, candidate)
        }
    };
    candidates
        .map(|c| (c, distance(c.as_str())))
        .filter(|(_, dist)| *dist <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use phenology_core::config::{CriterionConfig, PhaseConfig};

    fn phases() -> Vec<Phase> {
        [
            ("Germinating", "Sowing", "Germination"),
            ("Emerging", "Germination", "Emergence"),
            ("Juvenile", "Emergence", "EndJuvenile"),
            ("emerging", "EndJuvenile", "Flowering"),
        ]
        .iter()
        .map(|(name, start, end)| {
            Phase::from_config(&PhaseConfig {
                name: (*name).to_string(),
                start: (*start).to_string(),
                end: (*end).to_string(),
                criterion: CriterionConfig::Generic { target: Some(1.0) },
                emerged: false,
                stressed: false,
            })
        })
        .collect()
    }

    #[test]
    fn test_phase_index_case_insensitive_first_match() {
        let lookup = PhaseLookup::new(&phases());
        assert_eq!(lookup.phase_index("EMERGING").unwrap(), 1);
        assert_eq!(lookup.phase_index("juvenile").unwrap(), 2);
    }

    #[test]
    fn test_phase_not_found_suggests() {
        let lookup = PhaseLookup::new(&phases());
        let err = lookup.phase_index("Juvenil").unwrap_err();
        assert_eq!(
            err,
            PhaseError::PhaseNotFound {
                name: "Juvenil".into(),
                suggestion: Some("Juvenile".into())
            }
        );
        let err = lookup.phase_index("Maturity").unwrap_err();
        assert!(matches!(err, PhaseError::PhaseNotFound { suggestion: None, .. }));
    }

    #[test]
    fn test_stage_indices() {
        let lookup = PhaseLookup::new(&phases());
        assert_eq!(lookup.start_index("Emergence").unwrap(), 2);
        assert_eq!(lookup.end_index("Emergence").unwrap(), 1);
        assert!(matches!(
            lookup.start_index("Flowering"),
            Err(PhaseError::StageNotFound { bound: "starts", .. })
        ));
        // Stage names are case-sensitive.
        assert!(lookup.end_index("emergence").is_err());
    }

    #[test]
    fn test_period() {
        let lookup = PhaseLookup::new(&phases());
        assert_eq!(lookup.period("Germination", "EndJuvenile").unwrap(), (1, 2));
        assert!(matches!(
            lookup.period("EndJuvenile", "Germination"),
            Err(PhaseError::StageOrder { .. })
        ));
    }
}
