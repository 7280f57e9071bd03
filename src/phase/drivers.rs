//! Rate-of-progress drivers
//!
//! Phases never compute thermal time or leaf numbers themselves; they read
//! them through [`Drivers`], which the surrounding crop model (or a
//! schedule file) implements.

use std::fmt;

use phenology_core::config::DayDrivers;

/// An external counter read by the counter-driven criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter<'a> {
    /// Main-stem leaf number
    LeafNumber,
    /// Final main-stem leaf number
    FinalLeafNumber,
    /// Node number
    NodeNumber,
    /// A named signal
    Signal(&'a str),
}

impl fmt::Display for Counter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeafNumber => f.write_str("leaf_number"),
            Self::FinalLeafNumber => f.write_str("final_leaf_number"),
            Self::NodeNumber => f.write_str("node_number"),
            Self::Signal(name) => write!(f, "signals.{name}"),
        }
    }
}

/// Today's driver values.
pub trait Drivers {
    /// Today's rate of progress (thermal time).
    fn thermal_time(&self) -> f64;

    /// Multiplier applied to phases flagged `stressed`.
    fn stress_multiplier(&self) -> Option<f64> {
        None
    }

    /// Current value of an external counter.
    fn counter(&self, _counter: Counter<'_>) -> Option<f64> {
        None
    }
}

impl Drivers for DayDrivers {
    fn thermal_time(&self) -> f64 {
        self.thermal_time
    }

    fn stress_multiplier(&self) -> Option<f64> {
        self.stress
    }

    fn counter(&self, counter: Counter<'_>) -> Option<f64> {
        match counter {
            Counter::LeafNumber => self.leaf_number,
            Counter::FinalLeafNumber => self.final_leaf_number,
            Counter::NodeNumber => self.node_number,
            Counter::Signal(name) => self.signals.get(name).copied(),
        }
    }
}

impl Drivers for f64 {
    fn thermal_time(&self) -> f64 {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_drivers_counters() {
        let mut drivers = DayDrivers::thermal(12.0);
        drivers.leaf_number = Some(4.0);
        drivers.signals.insert("vrn".to_string(), 0.5);

        assert!((drivers.thermal_time() - 12.0).abs() < f64::EPSILON);
        assert_eq!(drivers.counter(Counter::LeafNumber), Some(4.0));
        assert_eq!(drivers.counter(Counter::FinalLeafNumber), None);
        assert_eq!(drivers.counter(Counter::Signal("vrn")), Some(0.5));
        assert_eq!(drivers.counter(Counter::Signal("ppd")), None);
    }

    #[test]
    fn test_plain_thermal_time() {
        let tt = 7.5_f64;
        assert!((tt.thermal_time() - 7.5).abs() < f64::EPSILON);
        assert_eq!(tt.stress_multiplier(), None);
        assert_eq!(tt.counter(Counter::NodeNumber), None);
    }

    #[test]
    fn test_counter_display() {
        assert_eq!(Counter::FinalLeafNumber.to_string(), "final_leaf_number");
        assert_eq!(Counter::Signal("vrn").to_string(), "signals.vrn");
    }
}
