//! Structured event stream.
//!
//! Typed events emitted while a schedule runs, written as JSONL with a
//! monotonically increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::phenology::Notification;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a simulation run.
///
/// Tagged with `"type"` when serialized. Day-scoped events carry the
/// simulated date; only the run boundaries carry a wall-clock timestamp.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The run started.
    SimulationStarted {
        /// Wall-clock start time.
        timestamp: DateTime<Utc>,
        /// Crop name.
        crop: String,
        /// Number of configured phases.
        phases: usize,
        /// First simulated date.
        start_date: NaiveDate,
        /// Number of scheduled days.
        days: usize,
    },

    /// The current phase changed.
    PhaseChanged {
        /// Zero-based day index.
        day: usize,
        /// Simulated date.
        date: NaiveDate,
        /// Phase left.
        from: String,
        /// Phase entered.
        to: String,
        /// Stage reached.
        stage: String,
    },

    /// The plant emerged.
    PlantEmerged {
        /// Zero-based day index.
        day: usize,
        /// Simulated date.
        date: NaiveDate,
        /// Phase current at emergence.
        phase: String,
    },

    /// The stage number was set by a management action.
    StageReset {
        /// Zero-based day index.
        day: usize,
        /// Simulated date.
        date: NaiveDate,
        /// New stage number.
        stage: f64,
    },

    /// Progress was removed after biomass loss.
    PhaseRewound {
        /// Zero-based day index.
        day: usize,
        /// Simulated date.
        date: NaiveDate,
        /// Phase before the rewind.
        from: String,
        /// Phase after the rewind.
        to: String,
        /// Thermal time removed.
        thermal_time_removed: f64,
    },

    /// A day finished.
    DayCompleted {
        /// Zero-based day index.
        day: usize,
        /// Simulated date.
        date: NaiveDate,
        /// Phase current at the end of the day.
        phase: String,
        /// Fractional stage number.
        stage: f64,
        /// Thermal time since sowing.
        accumulated_thermal_time: f64,
    },

    /// The run finished.
    SimulationFinished {
        /// Wall-clock end time.
        timestamp: DateTime<Utc>,
        /// Days simulated.
        days: usize,
        /// Phase current at the end.
        final_phase: String,
        /// Final stage number.
        stage: f64,
    },
}

impl Event {
    /// Maps an engine notification to an event.
    ///
    /// `phase` is the phase current after the notifying call returned.
    /// [`Notification::PostPhenology`] has no event.
    #[must_use]
    pub fn from_notification(
        day: usize,
        date: NaiveDate,
        phase: &str,
        notification: &Notification,
    ) -> Option<Self> {
        match notification {
            Notification::PhaseChanged(change) => Some(Self::PhaseChanged {
                day,
                date,
                from: change.old_phase.clone(),
                to: change.new_phase.clone(),
                stage: change.stage.clone(),
            }),
            Notification::PlantEmerged => Some(Self::PlantEmerged {
                day,
                date,
                phase: phase.to_string(),
            }),
            Notification::StageReset { stage } => Some(Self::StageReset {
                day,
                date,
                stage: *stage,
            }),
            Notification::PhaseRewound {
                from,
                to,
                thermal_time_removed,
            } => Some(Self::PhaseRewound {
                day,
                date,
                from: from.clone(),
                to: to.clone(),
                thermal_time_removed: *thermal_time_removed,
            }),
            Notification::PostPhenology => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct EventEnvelope<'a> {
    sequence: u64,
    #[serde(flatten)]
    event: &'a Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Buffered JSONL event writer.
///
/// Serialization and I/O failures are dropped: a broken event sink never
/// aborts a simulation.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Discards everything.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates (or truncates) `path` and writes events to it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Writes one event as a single JSON line.
    pub fn emit(&self, event: &Event) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope { sequence, event };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
            }
        }
    }

    /// Flushes buffered events.
    pub fn flush(&self) {
        if let Ok(mut w) = self.writer.lock() {
            let _ = w.flush();
        }
    }

    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

impl Drop for EventEmitter {
    fn drop(&mut self) {
        self.flush();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
