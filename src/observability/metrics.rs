//! Metrics collection.
//!
//! Prometheus-compatible counters and gauges recorded by the simulation
//! driver. The recorder is installed in-process; its rendering is written
//! to a file at the end of a run rather than served over HTTP.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::PhenologyError;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Phase names come from configuration; labels are capped at this length.
const MAX_PHASE_LABEL_LEN: usize = 64;

/// Installs the global Prometheus recorder.
///
/// Repeated calls are no-ops.
///
/// # Errors
///
/// Returns [`PhenologyError::Io`] if another recorder is already installed.
pub fn init_metrics() -> Result<(), PhenologyError> {
    if HANDLE.get().is_some() {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| PhenologyError::Io(std::io::Error::other(e.to_string())))?;
    let _ = HANDLE.set(handle);

    describe_metrics();
    Ok(())
}

/// Renders every recorded metric in the Prometheus text format.
///
/// `None` until [`init_metrics`] has run.
#[must_use]
pub fn render_metrics() -> Option<String> {
    HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!(
        "phenology_phase_transitions_total",
        "Total number of phase transitions"
    );
    describe_gauge!(
        "phenology_current_phase",
        "Currently active phase (1 = active)"
    );
    describe_counter!("phenology_days_simulated_total", "Days simulated");
    describe_counter!("phenology_rewinds_total", "Biomass-removal rewinds applied");
    describe_gauge!(
        "phenology_thermal_time_accumulated",
        "Thermal time accumulated since sowing"
    );
}

/// Records a phase transition.
pub fn record_phase_transition(from: &str, to: &str) {
    counter!(
        "phenology_phase_transitions_total",
        "from" => sanitize_phase_label(from),
        "to" => sanitize_phase_label(to)
    )
    .increment(1);
}

/// Moves the current-phase gauge, zeroing the previous label.
pub fn set_current_phase(phase_name: &str, previous_phase: Option<&str>) {
    if let Some(prev) = previous_phase {
        gauge!("phenology_current_phase", "phase_name" => sanitize_phase_label(prev)).set(0.0);
    }
    gauge!("phenology_current_phase", "phase_name" => sanitize_phase_label(phase_name)).set(1.0);
}

pub fn record_day(accumulated_thermal_time: f64) {
    counter!("phenology_days_simulated_total").increment(1);
    gauge!("phenology_thermal_time_accumulated").set(accumulated_thermal_time);
}

pub fn record_rewind() {
    counter!("phenology_rewinds_total").increment(1);
}

/// Truncates and replaces characters invalid in Prometheus label values
/// with `_`.
fn sanitize_phase_label(name: &str) -> String {
    name.chars()
        .take(MAX_PHASE_LABEL_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
