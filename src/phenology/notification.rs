//! Notifications published by the orchestrator
//!
//! Every mutating operation returns the notifications it published, in
//! order. Consumers (cohort bookkeeping, reporting, the event emitter)
//! dispatch on them after the call returns, so they always observe a fully
//! resolved phase state.

use serde::Serialize;

/// A completed phase change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseChange {
    /// Phase that was current before the change
    pub old_phase: String,
    /// Phase that is current after the change
    pub new_phase: String,
    /// Stage reached at the moment of change
    pub stage: String,
}

/// Something downstream logic may react to.
///
/// A growth-stage change is published as [`Notification::PhaseChanged`]
/// when a phase boundary is crossed, and as [`Notification::StageReset`]
/// when the stage number is set explicitly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// The current phase changed
    PhaseChanged(PhaseChange),
    /// The plant entered its first emerged phase
    PlantEmerged,
    /// The stage number was set explicitly
    StageReset {
        /// New stage number
        stage: f64,
    },
    /// Progress was removed after biomass loss
    PhaseRewound {
        /// Phase current before the rewind
        from: String,
        /// Phase current after the rewind
        to: String,
        /// Thermal time removed
        thermal_time_removed: f64,
    },
    /// The day's phenology step finished for an emerged plant
    PostPhenology,
}

impl Notification {
    /// The phase change carried by this notification, if any.
    #[must_use]
    pub const fn as_phase_change(&self) -> Option<&PhaseChange> {
        match self {
            Self::PhaseChanged(change) => Some(change),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_tagged() {
        let n = Notification::PhaseChanged(PhaseChange {
            old_phase: "Emerging".into(),
            new_phase: "Juvenile".into(),
            stage: "Emergence".into(),
        });
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], "phase_changed");
        assert_eq!(json["new_phase"], "Juvenile");

        let json = serde_json::to_value(Notification::PostPhenology).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "post_phenology"}));
    }

    #[test]
    fn test_as_phase_change() {
        assert!(Notification::PlantEmerged.as_phase_change().is_none());
    }
}
