//! Completion criteria
//!
//! A closed set of ways a phase can decide it is complete. Thermal-time
//! criteria compare accumulated progress against a target; counter criteria
//! compare an external counter (leaf number, node number, a named signal)
//! against a goal and never let their reported fraction move backwards.

use phenology_core::config::CriterionConfig;

use super::drivers::Counter;

/// Runtime completion criterion of a phase.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Completes when progress exceeds `target`.
    Generic {
        /// Thermal-time target
        target: Option<f64>,
    },
    /// Never completes.
    Terminal,
    /// Resolved at selection time; never stepped.
    Redirect {
        /// Destination phase name
        goto: String,
    },
    /// Completes when leaf number reaches final leaf number.
    LeafCount(CounterState),
    /// Completes after `nodes` further nodes.
    NodeCount {
        /// Nodes to appear within the phase
        nodes: f64,
        /// Counter bookkeeping
        state: CounterState,
    },
    /// Completes when `signal` reaches `target`.
    Expression {
        /// Signal name
        signal: String,
        /// Signal value at completion
        target: f64,
        /// Counter bookkeeping
        state: CounterState,
    },
}

/// Bookkeeping shared by the counter criteria.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CounterState {
    /// Counter value when the phase was entered
    pub at_entry: Option<f64>,
    /// Fraction reported at the end of the previous step
    pub yesterday: f64,
    /// Fraction reported now
    pub fraction: f64,
}

impl CounterState {
    /// Records a raw fraction for today and returns the reported one,
    /// the larger of yesterday's and today's, clamped to `[0, 1]`.
    pub fn observe(&mut self, raw: f64) -> f64 {
        self.fraction = raw.max(self.yesterday).clamp(0.0, 1.0);
        self.fraction
    }

    /// Share of today's counter advance that lay beyond completion.
    ///
    /// Returns `0.0` when the counter did not overshoot.
    #[must_use]
    pub fn overshoot_share(&self, raw: f64) -> f64 {
        let advance = raw - self.yesterday;
        if raw <= 1.0 || advance <= 0.0 {
            return 0.0;
        }
        ((raw - 1.0) / advance).clamp(0.0, 1.0)
    }

    /// Carries today's fraction into tomorrow.
    pub const fn roll(&mut self) {
        self.yesterday = self.fraction;
    }

    /// Forces both fractions to `fraction`.
    pub const fn set(&mut self, fraction: f64) {
        self.yesterday = fraction;
        self.fraction = fraction;
    }

    /// Forgets the retained fractions but keeps the entry value.
    pub const fn clear_fraction(&mut self) {
        self.yesterday = 0.0;
        self.fraction = 0.0;
    }
}

/// Which counters a criterion reads, and how it turns them into a fraction.
pub(super) enum CounterGoal<'a> {
    /// `(value - at_entry) / (final - at_entry)`
    Leaves,
    /// `(value - at_entry) / nodes`
    Nodes(f64),
    /// `value / target`
    Signal(&'a str, f64),
}

impl CounterGoal<'_> {
    /// The counter whose value is tracked.
    pub(super) fn counter(&self) -> Counter<'_> {
        match self {
            Self::Leaves => Counter::LeafNumber,
            Self::Nodes(_) => Counter::NodeNumber,
            Self::Signal(name, _) => Counter::Signal(name),
        }
    }

    /// Raw (unclamped) fraction complete.
    ///
    /// `final_leaves` is only consulted for [`CounterGoal::Leaves`].
    pub(super) fn raw_fraction(&self, value: f64, at_entry: f64, final_leaves: f64) -> f64 {
        match *self {
            Self::Leaves => {
                let span = final_leaves - at_entry;
                if span <= 0.0 {
                    1.0
                } else {
                    (value - at_entry) / span
                }
            }
            Self::Nodes(nodes) => {
                if nodes <= 0.0 {
                    1.0
                } else {
                    (value - at_entry) / nodes
                }
            }
            Self::Signal(_, target) => {
                if target <= 0.0 {
                    1.0
                } else {
                    value / target
                }
            }
        }
    }
}

impl Criterion {
    /// Thermal-time target, for criteria that have one.
    #[must_use]
    pub const fn target(&self) -> Option<f64> {
        match self {
            Self::Generic { target } => *target,
            _ => None,
        }
    }

    /// Counter bookkeeping, for the counter criteria.
    #[must_use]
    pub const fn counter_state(&self) -> Option<&CounterState> {
        match self {
            Self::LeafCount(state)
            | Self::NodeCount { state, .. }
            | Self::Expression { state, .. } => Some(state),
            _ => None,
        }
    }

    pub(super) fn counter_state_mut(&mut self) -> Option<&mut CounterState> {
        match self {
            Self::LeafCount(state)
            | Self::NodeCount { state, .. }
            | Self::Expression { state, .. } => Some(state),
            _ => None,
        }
    }

    pub(super) fn goal(&self) -> Option<CounterGoal<'_>> {
        match self {
            Self::LeafCount(_) => Some(CounterGoal::Leaves),
            Self::NodeCount { nodes, .. } => Some(CounterGoal::Nodes(*nodes)),
            Self::Expression { signal, target, .. } => {
                Some(CounterGoal::Signal(signal.as_str(), *target))
            }
            _ => None,
        }
    }

    /// Clears per-entry bookkeeping.
    pub fn reset(&mut self) {
        if let Some(state) = self.counter_state_mut() {
            *state = CounterState::default();
        }
    }
}

impl From<&CriterionConfig> for Criterion {
    fn from(config: &CriterionConfig) -> Self {
        match config {
            CriterionConfig::Generic { target } => Self::Generic { target: *target },
            CriterionConfig::Terminal => Self::Terminal,
            CriterionConfig::Redirect { goto } => Self::Redirect { goto: goto.clone() },
            CriterionConfig::LeafCount => Self::LeafCount(CounterState::default()),
            CriterionConfig::NodeCount { nodes } => Self::NodeCount {
                nodes: *nodes,
                state: CounterState::default(),
            },
            CriterionConfig::Expression { signal, target } => Self::Expression {
                signal: signal.clone(),
                target: *target,
                state: CounterState::default(),
            },
        }
    }
}
